//! Stochastic Runge-Kutta leaping.
//!
//! Stage 0 evaluates the propensities, draws one Poisson count per reaction and keeps the noise
//! residual `d = net^T (K - tau * a(x))` fixed for the whole step. Every further stage re-evaluates
//! the drift `f = net^T a(Y)` at the previous stage estimate and forms
//!
//! ```text
//! Y_k = x + A_k * (tau * f(Y_{k-1}) + d)
//! ```
//!
//! The step ends with `x + tau * f(Y_last) + d`, after which negative quantities are clamped to
//! zero.

use tracing::debug;

use super::{poisson, Run};
use crate::trial::algorithm::{Order, Profile};
use crate::trial::results::{Completion, TrajectorySink};
use crate::EngineError;

// Only the order 5 high tableau is a published one. The other five are derived from damped
// Chebyshev stability polynomials with `A_k = b_k / b_(k-1)`, damping 0.05 (low), 2.0 (mid) and
// 10.0 (high).

/// Derived, not published: damping 0.05
const NRK3_LOW: [f64; 2] = [3.812137022469127e-02, 1.519274412957031e-01];
/// Derived, not published: damping 2.0
const NRK3_MID: [f64; 2] = [6.644609870416322e-02, 2.394038097231887e-01];
/// Derived, not published: damping 10.0
const NRK3_HIGH: [f64; 2] = [9.790494823510229e-02, 3.111696520575666e-01];

/// Derived, not published: damping 0.05
const NRK5_LOW: [f64; 4] = [
    8.253819484020640e-03,
    2.356891372859127e-02,
    5.767165504298920e-02,
    1.641615028225609e-01,
];
/// Derived, not published: damping 2.0
const NRK5_MID: [f64; 4] = [
    1.568721559077003e-02,
    4.392540874081565e-02,
    1.032137118791251e-01,
    2.641551833692473e-01,
];
/// Published order 5 high profile stage coefficients `A21, A32, A43, A54`
const NRK5_HIGH: [f64; 4] = [
    3.512099547699939e-02,
    9.333225239662185e-02,
    1.940500426863389e-01,
    3.552631979151575e-01,
];

/// Whether the tableau is one of the derived substitutes rather than a published tableau
pub fn is_derived(order: Order, profile: Profile) -> bool {
    !matches!((order, profile), (Order::Five, Profile::High))
}

/// Stage coefficients `[A21, A32, ...]` of the given tableau
pub fn tableau(order: Order, profile: Profile) -> &'static [f64] {
    if is_derived(order, profile) {
        debug!(?order, ?profile, "using derived Runge-Kutta coefficients, not a published tableau");
    }
    match (order, profile) {
        (Order::Three, Profile::Low) => &NRK3_LOW,
        (Order::Three, Profile::Mid) => &NRK3_MID,
        (Order::Three, Profile::High) => &NRK3_HIGH,
        (Order::Five, Profile::Low) => &NRK5_LOW,
        (Order::Five, Profile::Mid) => &NRK5_MID,
        (Order::Five, Profile::High) => &NRK5_HIGH,
    }
}

pub(crate) fn simulate<S: TrajectorySink + ?Sized>(
    run: &mut Run<'_>,
    sink: &mut S,
    coefficients: &[f64],
) -> Result<Completion, EngineError> {
    let tau = run.step;
    let steps = run.step_count();
    let network = run.network;
    let stoichiometry = network.stoichiometry();
    let species_count = network.species_count();

    let mut rates = vec![0.0; network.reaction_count()];
    let mut leaps = vec![0.0; network.reaction_count()];
    let mut noise = vec![0.0; species_count];
    let mut drift = vec![0.0; species_count];
    let mut stage = vec![0.0; species_count];

    run.begin(sink)?;

    for step in 0..steps {
        if run.cancelled() {
            return Ok(run.interrupted());
        }

        network.evaluate_propensities(run.state.quantities(), &mut rates);
        for (leap, &rate) in leaps.iter_mut().zip(&rates) {
            *leap = poisson(run.prng, tau * rate) - tau * rate;
        }
        stoichiometry.combine(&leaps, &mut noise);
        stoichiometry.combine(&rates, &mut drift);

        for (index, &coefficient) in coefficients.iter().enumerate() {
            if index > 0 {
                network.evaluate_propensities(&stage, &mut rates);
                stoichiometry.combine(&rates, &mut drift);
            }
            for (species, estimate) in stage.iter_mut().enumerate() {
                *estimate = run.state.quantities()[species]
                    + coefficient * (tau * drift[species] + noise[species]);
            }
        }

        network.evaluate_propensities(&stage, &mut rates);
        stoichiometry.combine(&rates, &mut drift);
        for (species, quantity) in run.state.quantities_mut().iter_mut().enumerate() {
            *quantity += tau * drift[species] + noise[species];
            if *quantity < 0.0 {
                *quantity = 0.0;
            }
        }

        run.state.set_time(tau * (step + 1) as f64);
        run.state.advance_step();
        sink.snapshot(run.state.time(), run.state.quantities())?;
    }

    Ok(run.finished())
}
