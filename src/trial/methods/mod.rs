//! The simulation engines.
//!
//! Every engine receives a [`Run`] whose settings have already been validated, writes the header
//! and the initial state to the sink, and then mutates the run's state in place until it reaches
//! its own termination condition.

pub mod direct;
pub mod heun;
pub mod runge_kutta;
pub mod tau_leap;

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Poisson};

use super::reaction_network::solution::SimulationState;
use super::reaction_network::ReactionNetwork;
use super::results::{Completion, SinkError, TrajectorySink};

/// Everything one engine invocation works on. Owned by a single trial for the run's lifetime.
pub(crate) struct Run<'a> {
    pub network: &'a ReactionNetwork,
    pub state: &'a mut SimulationState,
    pub prng: &'a mut StdRng,
    pub cancel: Option<&'a AtomicBool>,
    pub total_time: f64,
    /// Step size, or hurdle size for the direct method
    pub step: f64,
    pub started: DateTime<Utc>,
}

impl<'a> Run<'a> {
    /// Writes the column header and the state at time zero
    pub fn begin<S: TrajectorySink + ?Sized>(&self, sink: &mut S) -> Result<(), SinkError> {
        sink.header(self.network.species_names())?;
        sink.snapshot(self.state.time(), self.state.quantities())
    }

    pub fn cancelled(&self) -> bool {
        self.cancel.map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started
    }

    /// Number of fixed steps needed to cover the total time
    pub fn step_count(&self) -> usize {
        (self.total_time / self.step).ceil() as usize
    }

    pub fn finished(&self) -> Completion {
        Completion::Finished {
            time: self.state.time(),
            steps: self.state.step(),
            elapsed: self.elapsed(),
        }
    }

    pub fn interrupted(&self) -> Completion {
        Completion::Cancelled {
            time: self.state.time(),
            steps: self.state.step(),
            elapsed: self.elapsed(),
        }
    }
}

/// Draws a Poisson count with the given mean.
///
/// A mean that is not a positive finite number yields zero; this only happens when a state has
/// left the domain of its rate laws (for example a negative count under tau-leaping).
pub(crate) fn poisson<R: Rng + ?Sized>(prng: &mut R, mean: f64) -> f64 {
    if !(mean > 0.0 && mean.is_finite()) {
        return 0.0;
    }
    match Poisson::new(mean) {
        Ok(distribution) => distribution.sample(prng),
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn poisson_degenerate_means_are_zero() {
        let mut prng = StdRng::seed_from_u64(1);
        assert_eq!(poisson(&mut prng, 0.0), 0.0);
        assert_eq!(poisson(&mut prng, -3.0), 0.0);
        assert_eq!(poisson(&mut prng, f64::NAN), 0.0);
        assert_eq!(poisson(&mut prng, f64::INFINITY), 0.0);
    }

    #[test]
    fn poisson_mean_is_close() {
        let mut prng = StdRng::seed_from_u64(2);
        let draws = 20_000;
        let sum: f64 = (0..draws).map(|_| poisson(&mut prng, 4.0)).sum();
        let mean = sum / draws as f64;
        // standard error is sqrt(4 / 20000) ~ 0.014
        assert!((mean - 4.0).abs() < 0.1, "mean {}", mean);
    }
}
