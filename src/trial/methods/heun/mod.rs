//! Deterministic Heun integration of the mean-field equation `dx/dt = net^T a(x)`.
//!
//! An Euler predictor is followed by a trapezoidal corrector; no random numbers are drawn.

use super::Run;
use crate::trial::results::{Completion, TrajectorySink};
use crate::EngineError;

pub(crate) fn simulate<S: TrajectorySink + ?Sized>(
    run: &mut Run<'_>,
    sink: &mut S,
) -> Result<Completion, EngineError> {
    let tau = run.step;
    let steps = run.step_count();
    let network = run.network;
    let stoichiometry = network.stoichiometry();
    let species_count = network.species_count();

    let mut rates = vec![0.0; network.reaction_count()];
    let mut drift = vec![0.0; species_count];
    let mut corrected = vec![0.0; species_count];
    let mut predicted = vec![0.0; species_count];

    run.begin(sink)?;

    for step in 0..steps {
        if run.cancelled() {
            return Ok(run.interrupted());
        }

        network.evaluate_propensities(run.state.quantities(), &mut rates);
        stoichiometry.combine(&rates, &mut drift);
        for ((estimate, quantity), slope) in predicted.iter_mut().zip(run.state.quantities()).zip(&drift) {
            *estimate = quantity + tau * slope;
        }

        network.evaluate_propensities(&predicted, &mut rates);
        stoichiometry.combine(&rates, &mut corrected);
        for ((quantity, first), second) in run.state.quantities_mut().iter_mut().zip(&drift).zip(&corrected) {
            *quantity += 0.5 * tau * (first + second);
        }

        run.state.set_time(tau * (step + 1) as f64);
        run.state.advance_step();
        sink.snapshot(run.state.time(), run.state.quantities())?;
    }

    Ok(run.finished())
}
