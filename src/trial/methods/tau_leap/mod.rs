//! Fixed-step tau-leaping.
//!
//! Every reaction fires a Poisson distributed number of times per step, with mean
//! `tau * propensity` evaluated at the start of the step. Populations are not corrected: a step
//! that is too large can leave a species below zero.

use super::{poisson, Run};
use crate::trial::results::{Completion, TrajectorySink};
use crate::EngineError;

pub(crate) fn simulate<S: TrajectorySink + ?Sized>(
    run: &mut Run<'_>,
    sink: &mut S,
) -> Result<Completion, EngineError> {
    let tau = run.step;
    let steps = run.step_count();
    let network = run.network;
    let net = network.stoichiometry().net();
    let mut rates = vec![0.0; network.reaction_count()];
    let mut firings = vec![0.0; network.reaction_count()];

    run.begin(sink)?;

    for step in 0..steps {
        if run.cancelled() {
            return Ok(run.interrupted());
        }

        network.evaluate_propensities(run.state.quantities(), &mut rates);
        for (count, rate) in firings.iter_mut().zip(&rates) {
            *count = poisson(run.prng, tau * rate);
        }
        for (reaction, &count) in firings.iter().enumerate() {
            if count > 0.0 {
                run.state.apply(net.row(reaction), count);
            }
        }

        run.state.set_time(tau * (step + 1) as f64);
        run.state.advance_step();
        sink.snapshot(run.state.time(), run.state.quantities())?;
    }

    Ok(run.finished())
}
