use std::sync::atomic::AtomicBool;
use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use algorithm::Algorithm;
use methods::Run;
use reaction_network::{solution::SimulationState, ReactionNetwork};
use results::{ChannelSink, Completion, Trajectory, TrajectorySink, TrialResult};

use crate::EngineError;

pub mod algorithm;
pub mod methods;
pub mod reaction_network;
pub mod results;

/// Shared flag checked once per iteration; raising it ends every run that holds it
pub type CancelFlag = Arc<AtomicBool>;

/// Object specifying return granularity for a trial
///  - Minimal returns only the finished trajectory
///  - Full also streams every snapshot as it is produced
#[derive(Clone)]
pub enum TrialReturn {
    Minimal(SyncSender<TrialResult>),
    Full(SyncSender<TrialResult>),
}

/// What to simulate and for how long
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub algorithm: Algorithm,
    /// Simulated time span, must be positive
    pub total_time: f64,
    /// Fixed step for the stepped methods, hurdle size for the direct method
    pub step: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Direct,
            total_time: 100.0,
            step: 1.0,
        }
    }
}

impl Settings {
    pub fn new(algorithm: Algorithm, total_time: f64, step: f64) -> Self {
        Self { algorithm, total_time, step }
    }

    /// Rejects configurations no engine can run
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.total_time > 0.0 && self.total_time.is_finite()) {
            return Err(EngineError::NonPositiveTime(self.total_time));
        }
        if self.algorithm == Algorithm::Direct && self.step == 0.0 {
            return Err(EngineError::Unsupported(
                "the direct method needs a positive hurdle; per-event output is not implemented",
            ));
        }
        if !(self.step > 0.0 && self.step.is_finite()) {
            return Err(EngineError::NonPositiveStep {
                algorithm: self.algorithm,
                step: self.step,
            });
        }
        Ok(())
    }
}

/// Mixes the wall clock with the process id. Not reproducible, only used when no seed is given.
fn clock_seed(id: usize) -> u64 {
    let now = Utc::now();
    let nanos = (now.timestamp() as u64)
        .wrapping_mul(1_000_000_000)
        .wrapping_add(now.timestamp_subsec_nanos() as u64);
    nanos ^ (std::process::id() as u64).rotate_left(32) ^ (id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// The runtime environment for a single trial. Once the object has been initialized
/// the simulate method may be called on it in order to simulate a single CRN run.
///
/// A trial owns its state and its PRNG; nothing is shared with other trials except the
/// immutable network and, optionally, a cancellation flag.
pub struct Trial {
    network: Arc<ReactionNetwork>,
    settings: Settings,
    state: SimulationState,
    prng: StdRng,
    seed: u64,
    id: usize,
    cancel: Option<CancelFlag>,
}

impl Trial {
    pub fn from(network: Arc<ReactionNetwork>, settings: Settings, id: usize) -> Self {
        let seed = clock_seed(id);
        let state = SimulationState::new(network.initial_counts());

        Self {
            network,
            settings,
            state,
            prng: StdRng::seed_from_u64(seed),
            seed,
            id,
            cancel: None,
        }
    }

    /// sets prng to some prng based on seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.prng = StdRng::seed_from_u64(seed);
        self
    }

    /// Makes the trial stop at the next iteration once `flag` is raised
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// returns the seed the prng was built from
    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    pub fn get_id(&self) -> usize {
        self.id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns a reference to the current state
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Runs the configured algorithm from the network's initial state, feeding `sink`.
    ///
    /// Configuration errors are reported before anything is written to the sink. A trial may be
    /// simulated again; every call restarts from the initial counts but continues the PRNG stream.
    pub fn simulate<S: TrajectorySink + ?Sized>(&mut self, sink: &mut S) -> Result<Completion, EngineError> {
        self.settings.validate()?;
        self.state = SimulationState::new(self.network.initial_counts());

        info!(
            trial = self.id,
            seed = self.seed,
            algorithm = %self.settings.algorithm,
            total_time = self.settings.total_time,
            step = self.settings.step,
            "starting trial"
        );

        let mut run = Run {
            network: &self.network,
            state: &mut self.state,
            prng: &mut self.prng,
            cancel: self.cancel.as_deref(),
            total_time: self.settings.total_time,
            step: self.settings.step,
            started: Utc::now(),
        };

        let completion = match self.settings.algorithm {
            Algorithm::Direct => methods::direct::simulate(&mut run, sink)?,
            Algorithm::TauLeap => methods::tau_leap::simulate(&mut run, sink)?,
            Algorithm::RungeKutta(order, profile) => {
                let coefficients = methods::runge_kutta::tableau(order, profile);
                methods::runge_kutta::simulate(&mut run, sink, coefficients)?
            }
            Algorithm::Heun => methods::heun::simulate(&mut run, sink)?,
        };
        sink.finish()?;

        info!(
            trial = self.id,
            completion = ?completion,
            elapsed_ms = completion.elapsed().num_milliseconds(),
            "trial finished"
        );
        Ok(completion)
    }

    /// Simulates into an in-memory trajectory
    pub fn run(&mut self) -> Result<(Trajectory, Completion), EngineError> {
        let mut trajectory = Trajectory::new();
        let completion = self.simulate(&mut trajectory)?;
        Ok((trajectory, completion))
    }

    /// Simulates and reports through `trial_return`. Used by the ensemble runner's worker threads.
    pub fn execute(mut self, trial_return: TrialReturn) {
        let (sender, outcome) = match trial_return {
            TrialReturn::Minimal(sender) => {
                let outcome = self.run();
                (sender, outcome)
            }
            TrialReturn::Full(sender) => {
                let mut sink = ChannelSink::new(sender.clone(), self.id);
                let outcome = self
                    .simulate(&mut sink)
                    .map(|completion| (sink.into_trajectory(), completion));
                (sender, outcome)
            }
        };

        let message = match outcome {
            Ok((trajectory, completion)) => TrialResult::Complete(trajectory, completion, self.id),
            Err(error) => TrialResult::Failed(error, self.id),
        };
        // the runner only drops its receiver after every trial has reported
        let _ = sender.send(message);
    }
}
