use std::fmt::Display;

/// Tuple struct wrapper around name data for a chemical species
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug)]
pub struct Name(pub String);

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Name(name.to_string())
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tuple struct wrapper around a non-negative molecule count or stoichiometric coefficient
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct Count(pub u64);

/// The mutable state of a single simulation run.
///
/// Quantities are stored as `f64` because the leaping and integrating methods move them through
/// real values, but semantically each entry is a copy number. The exact method only ever applies
/// integer stoichiometry so its quantities stay integral.
#[derive(PartialEq, Clone, Debug)]
pub struct SimulationState {
    time: f64,
    quantities: Vec<f64>,
    step: usize,
}

impl SimulationState {
    /// Builds a state at time zero from initial copy numbers
    pub fn new(initial: &[u64]) -> Self {
        Self {
            time: 0.0,
            quantities: initial.iter().map(|&count| count as f64).collect(),
            step: 0,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn quantities(&self) -> &[f64] {
        &self.quantities
    }

    pub(crate) fn quantities_mut(&mut self) -> &mut [f64] {
        &mut self.quantities
    }

    /// Number of events fired (direct method) or macro-steps taken (stepped methods)
    pub fn step(&self) -> usize {
        self.step
    }

    pub(crate) fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub(crate) fn advance_step(&mut self) {
        self.step += 1;
    }

    /// Adds `coefficient * change` to every species
    pub(crate) fn apply(&mut self, change: &[i64], coefficient: f64) {
        for (quantity, &delta) in self.quantities.iter_mut().zip(change) {
            *quantity += coefficient * delta as f64;
        }
    }

    /// Sum of all species quantities
    pub fn total(&self) -> f64 {
        self.quantities.iter().sum()
    }
}

impl Display for SimulationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.time)?;
        for quantity in &self.quantities {
            write!(f, " {}", quantity)?;
        }
        Ok(())
    }
}
