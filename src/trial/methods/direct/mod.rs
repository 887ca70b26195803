//! Exact stochastic simulation by the direct method.
//!
//! Each iteration draws the waiting time to the next event from an exponential distribution
//! with the total propensity as its rate, then picks the firing reaction with probability
//! proportional to its propensity. Output is only produced at hurdle checkpoints: the process
//! is piecewise constant between events, so the state reported for every hurdle an event jumps
//! over is the state just before that event.

use rand::distributions::Open01;
use rand::Rng;
use tracing::debug;

use super::Run;
use crate::trial::reaction_network::ReactionNetwork;
use crate::trial::results::{Completion, TrajectorySink};
use crate::EngineError;

/// A single firing drawn by the direct method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub waiting_time: f64,
    pub reaction: usize,
}

/// Draws the next event from `state`, leaving the propensities in `rates`.
///
/// Returns `None` when the total propensity is zero, i.e. the state is absorbing. A negative or
/// non-finite propensity is an error rather than an absorbing state.
pub fn next_event<R: Rng + ?Sized>(
    network: &ReactionNetwork,
    state: &[f64],
    rates: &mut [f64],
    prng: &mut R,
) -> Result<Option<Event>, EngineError> {
    network.evaluate_propensities(state, rates);
    if let Some((reaction, &rate)) = rates
        .iter()
        .enumerate()
        .find(|(_, rate)| !(**rate >= 0.0 && rate.is_finite()))
    {
        return Err(EngineError::InvalidPropensity { reaction, rate });
    }
    let total: f64 = rates.iter().sum();
    if total == 0.0 {
        return Ok(None);
    }

    let r1: f64 = prng.sample(Open01);
    let r2: f64 = prng.sample(Open01);
    let waiting_time = -r1.ln() / total;

    // first reaction, in declaration order, whose running sum exceeds the threshold
    let threshold = r2 * total;
    let mut running_sum = 0.0;
    let mut reaction = rates.iter().rposition(|&rate| rate > 0.0).unwrap_or(0);
    for (index, rate) in rates.iter().enumerate() {
        running_sum += rate;
        if running_sum > threshold {
            reaction = index;
            break;
        }
    }

    Ok(Some(Event { waiting_time, reaction }))
}

/// Runs the direct method with `run.step` as the hurdle size
pub(crate) fn simulate<S: TrajectorySink + ?Sized>(
    run: &mut Run<'_>,
    sink: &mut S,
) -> Result<Completion, EngineError> {
    let hurdle = run.step;
    let checkpoints = run.step_count();
    let mut rates = vec![0.0; run.network.reaction_count()];
    let mut reported = 0;

    run.begin(sink)?;

    while reported < checkpoints {
        if run.cancelled() {
            return Ok(run.interrupted());
        }

        let event = match next_event(run.network, run.state.quantities(), &mut rates, run.prng)? {
            Some(event) => event,
            None => {
                debug!(time = run.state.time(), events = run.state.step(), "absorbing state reached");
                // nothing changes from here on, so the remaining checkpoints see the same state
                while reported < checkpoints {
                    reported += 1;
                    sink.snapshot(reported as f64 * hurdle, run.state.quantities())?;
                }
                return Ok(Completion::Absorbed {
                    time: run.state.time(),
                    events: run.state.step(),
                    elapsed: run.elapsed(),
                });
            }
        };

        let time = run.state.time() + event.waiting_time;
        while reported < checkpoints && time > (reported + 1) as f64 * hurdle {
            reported += 1;
            sink.snapshot(reported as f64 * hurdle, run.state.quantities())?;
        }

        if reported == checkpoints {
            // the event falls past the last checkpoint
            run.state.set_time(checkpoints as f64 * hurdle);
            break;
        }

        run.state.apply(run.network.stoichiometry().net().row(event.reaction), 1.0);
        run.state.set_time(time);
        run.state.advance_step();
    }

    Ok(run.finished())
}
