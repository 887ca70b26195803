pub mod csv_sink;

use std::sync::mpsc::SyncSender;

use thiserror::Error;

use super::reaction_network::solution::Name;
use crate::EngineError;

type ID = usize;

/// Failures while handing snapshots to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write trajectory: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write trajectory: {0}")]
    Io(#[from] std::io::Error),
    #[error("receiver for trial {0} dropped")]
    Disconnected(ID),
}

/// The state of a run at one reporting time
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub time: f64,
    pub quantities: Vec<f64>,
}

/// Receives the output of a run in time order.
///
/// `header` is called exactly once, before any snapshot, with the species in column order.
pub trait TrajectorySink {
    fn header(&mut self, species: &[Name]) -> Result<(), SinkError>;

    fn snapshot(&mut self, time: f64, quantities: &[f64]) -> Result<(), SinkError>;

    /// Called once after the last snapshot of a run that did not fail
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: TrajectorySink + ?Sized> TrajectorySink for &mut S {
    fn header(&mut self, species: &[Name]) -> Result<(), SinkError> {
        (**self).header(species)
    }

    fn snapshot(&mut self, time: f64, quantities: &[f64]) -> Result<(), SinkError> {
        (**self).snapshot(time, quantities)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

/// An in-memory trajectory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    species: Vec<Name>,
    snapshots: Vec<Snapshot>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn species(&self) -> &[Name] {
        &self.species
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn times(&self) -> Vec<f64> {
        self.snapshots.iter().map(|snapshot| snapshot.time).collect()
    }

    /// The values of one species across the trajectory
    pub fn column(&self, species: &str) -> Option<Vec<f64>> {
        let index = self.species.iter().position(|name| name.0 == species)?;
        Some(self.snapshots.iter().map(|snapshot| snapshot.quantities[index]).collect())
    }

    /// Pointwise mean of several trajectories over their common prefix.
    ///
    /// Returns `None` when there is nothing to average.
    pub fn mean(trajectories: &[Trajectory]) -> Option<Trajectory> {
        let mut accumulator = MeanAccumulator::new();
        for trajectory in trajectories {
            accumulator.add(trajectory);
        }
        accumulator.mean()
    }
}

/// Running pointwise sum of trajectories.
///
/// Holds one trajectory's worth of sums no matter how many trajectories are added. The sums cover
/// the common prefix of everything added so far.
#[derive(Debug, Clone, Default)]
pub struct MeanAccumulator {
    species: Vec<Name>,
    sums: Vec<Snapshot>,
    count: usize,
}

impl MeanAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, trajectory: &Trajectory) {
        if self.count == 0 {
            self.species = trajectory.species.clone();
            self.sums = trajectory.snapshots.clone();
        } else {
            self.sums.truncate(trajectory.len());
            for (sum, snapshot) in self.sums.iter_mut().zip(&trajectory.snapshots) {
                for (total, value) in sum.quantities.iter_mut().zip(&snapshot.quantities) {
                    *total += value;
                }
            }
        }
        self.count += 1;
    }

    /// Number of trajectories added
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<Trajectory> {
        if self.count == 0 {
            return None;
        }
        let count = self.count as f64;
        let snapshots = self
            .sums
            .iter()
            .map(|sum| Snapshot {
                time: sum.time,
                quantities: sum.quantities.iter().map(|total| total / count).collect(),
            })
            .collect();

        Some(Trajectory { species: self.species.clone(), snapshots })
    }
}

impl TrajectorySink for Trajectory {
    fn header(&mut self, species: &[Name]) -> Result<(), SinkError> {
        self.species = species.to_vec();
        self.snapshots.clear();
        Ok(())
    }

    fn snapshot(&mut self, time: f64, quantities: &[f64]) -> Result<(), SinkError> {
        self.snapshots.push(Snapshot { time, quantities: quantities.to_vec() });
        Ok(())
    }
}

/// How a run ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Completion {
    /// Every checkpoint or step was produced
    Finished { time: f64, steps: usize, elapsed: chrono::Duration },
    /// The direct method reached a state with zero total propensity
    Absorbed { time: f64, events: usize, elapsed: chrono::Duration },
    /// The cancellation flag was raised before the run finished
    Cancelled { time: f64, steps: usize, elapsed: chrono::Duration },
}

impl Completion {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Completion::Cancelled { .. })
    }

    /// Wall-clock time the run took
    pub fn elapsed(&self) -> chrono::Duration {
        match self {
            Completion::Finished { elapsed, .. }
            | Completion::Absorbed { elapsed, .. }
            | Completion::Cancelled { elapsed, .. } => *elapsed,
        }
    }
}

///The different types of data which may be sent back from a trial
#[derive(Debug)]
pub enum TrialResult {
    IntermediateStep(Snapshot, ID),
    Complete(Trajectory, Completion, ID),
    Failed(EngineError, ID),
}

/// Records a trajectory while forwarding every snapshot to the ensemble runner
pub struct ChannelSink {
    trajectory: Trajectory,
    sender: SyncSender<TrialResult>,
    id: ID,
}

impl ChannelSink {
    pub fn new(sender: SyncSender<TrialResult>, id: ID) -> Self {
        Self { trajectory: Trajectory::new(), sender, id }
    }

    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }
}

impl TrajectorySink for ChannelSink {
    fn header(&mut self, species: &[Name]) -> Result<(), SinkError> {
        self.trajectory.header(species)
    }

    fn snapshot(&mut self, time: f64, quantities: &[f64]) -> Result<(), SinkError> {
        self.trajectory.snapshot(time, quantities)?;
        self.sender
            .send(TrialResult::IntermediateStep(
                Snapshot { time, quantities: quantities.to_vec() },
                self.id,
            ))
            .map_err(|_| SinkError::Disconnected(self.id))
    }
}
