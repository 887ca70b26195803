//! Propensity functions.
//!
//! Every function reads the current state, the reactant row of the reaction, its parameter vector
//! and its acting-species indices, and returns the instantaneous rate. They are pure, so they may
//! be called from any thread without synchronisation.
//!
//! Parameters and acting species are positional. The layout for each kind is documented on the
//! matching [`PropensityKind`] variant. Only the arity is checked, when the network is built;
//! parameters given in another order yield wrong dynamics.
//!
//! Species quantities are read as copy numbers: a real quantity is truncated toward zero first.

use std::fmt::Display;
use std::str::FromStr;

use crate::trial::reaction_network::NetworkError;

/// The closed set of rate laws a reaction may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropensityKind {
    /// `MA`. params `[k]`, no acting species.
    /// `k * prod choose(x_i, c_i)` over the reactants.
    MassAction,
    /// `HA`. params `[rate, K, n]`, acting `[activator]`.
    /// `rate / (1 + (K / y)^n)`
    HillActivation,
    /// `HI`. params `[rate, K, n]`, acting `[inhibitor]`.
    /// `rate / (1 + (y / K)^n)`
    HillInhibition,
    /// `MAHI`. params `[rate, Ki, ni]`, acting `[mass action species, inhibitor]`.
    /// `rate * ym / (1 + (yi / Ki)^ni)`
    MassActionHillInhibition,
    /// `HIHA`. params `[rate, Ki, ni, Ka, na]`, acting `[inhibitor, activator]`.
    /// `rate / (1 + (yi / Ki)^ni) / (1 + (Ka / ya)^na)`, zero when the activator is absent.
    HillInhibitionHillActivation,
    /// `CI`. params `[rate, Ka, na, gamma, ni]`, acting `[activator, inhibitor]`.
    /// `rate * ya^na / (Ka^na + ya^na + (gamma * yi)^ni)`, zero when the activator is absent.
    CompetitiveInhibition,
    /// `HAHAC`. params `[rate1, K1, n1, rate2, K2, n2]`, acting `[activator1, activator2]`.
    /// `(rate1 * h1 + rate2 * h2) / (1 + h1 + h2)` with `hi = (yi / Ki)^ni`.
    CompetitiveActivation,
    /// `HAHAHIC`. params `[rate1, K1, n1, rate2, K2, n2, Ki, ni]`,
    /// acting `[activator1, activator2, inhibitor]`.
    /// `(rate1 * h1 + rate2 * h2) / (1 + h1 + h2 + hi)`.
    CompetitiveActivationInhibition,
}

impl PropensityKind {
    pub const ALL: [PropensityKind; 8] = [
        PropensityKind::MassAction,
        PropensityKind::HillActivation,
        PropensityKind::HillInhibition,
        PropensityKind::MassActionHillInhibition,
        PropensityKind::HillInhibitionHillActivation,
        PropensityKind::CompetitiveInhibition,
        PropensityKind::CompetitiveActivation,
        PropensityKind::CompetitiveActivationInhibition,
    ];

    /// Short name used by the network text format
    pub fn code(&self) -> &'static str {
        match self {
            PropensityKind::MassAction => "MA",
            PropensityKind::HillActivation => "HA",
            PropensityKind::HillInhibition => "HI",
            PropensityKind::MassActionHillInhibition => "MAHI",
            PropensityKind::HillInhibitionHillActivation => "HIHA",
            PropensityKind::CompetitiveInhibition => "CI",
            PropensityKind::CompetitiveActivation => "HAHAC",
            PropensityKind::CompetitiveActivationInhibition => "HAHAHIC",
        }
    }

    /// Number of entries the parameter vector must hold
    pub fn parameter_count(&self) -> usize {
        match self {
            PropensityKind::MassAction => 1,
            PropensityKind::HillActivation
            | PropensityKind::HillInhibition
            | PropensityKind::MassActionHillInhibition => 3,
            PropensityKind::HillInhibitionHillActivation
            | PropensityKind::CompetitiveInhibition => 5,
            PropensityKind::CompetitiveActivation => 6,
            PropensityKind::CompetitiveActivationInhibition => 8,
        }
    }

    /// Number of acting species the rate law reads
    pub fn acting_species_count(&self) -> usize {
        match self {
            PropensityKind::MassAction => 0,
            PropensityKind::HillActivation | PropensityKind::HillInhibition => 1,
            PropensityKind::MassActionHillInhibition
            | PropensityKind::HillInhibitionHillActivation
            | PropensityKind::CompetitiveInhibition
            | PropensityKind::CompetitiveActivation => 2,
            PropensityKind::CompetitiveActivationInhibition => 3,
        }
    }

    /// Evaluates the rate law
    pub fn evaluate(&self, state: &[f64], reactants: &[u32], params: &[f64], acting: &[usize]) -> f64 {
        match self {
            PropensityKind::MassAction => mass_action(state, reactants, params, acting),
            PropensityKind::HillActivation => hill_activation(state, reactants, params, acting),
            PropensityKind::HillInhibition => hill_inhibition(state, reactants, params, acting),
            PropensityKind::MassActionHillInhibition => {
                mass_action_hill_inhibition(state, reactants, params, acting)
            }
            PropensityKind::HillInhibitionHillActivation => {
                hill_inhibition_hill_activation(state, reactants, params, acting)
            }
            PropensityKind::CompetitiveInhibition => {
                competitive_inhibition(state, reactants, params, acting)
            }
            PropensityKind::CompetitiveActivation => {
                competitive_activation(state, reactants, params, acting)
            }
            PropensityKind::CompetitiveActivationInhibition => {
                competitive_activation_inhibition(state, reactants, params, acting)
            }
        }
    }
}

impl FromStr for PropensityKind {
    type Err = NetworkError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        PropensityKind::ALL
            .iter()
            .find(|kind| kind.code() == code.trim())
            .copied()
            .ok_or_else(|| NetworkError::UnknownPropensity(code.trim().to_string()))
    }
}

impl Display for PropensityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A rate law bound to its parameters and acting-species indices
#[derive(Debug, Clone, PartialEq)]
pub struct Propensity {
    kind: PropensityKind,
    params: Vec<f64>,
    acting_species: Vec<usize>,
}

impl Propensity {
    pub(crate) fn new(kind: PropensityKind, params: Vec<f64>, acting_species: Vec<usize>) -> Self {
        Self { kind, params, acting_species }
    }

    pub fn kind(&self) -> PropensityKind {
        self.kind
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn acting_species(&self) -> &[usize] {
        &self.acting_species
    }

    #[inline]
    pub fn rate(&self, state: &[f64], reactants: &[u32]) -> f64 {
        self.kind.evaluate(state, reactants, &self.params, &self.acting_species)
    }
}

/// Reads a species quantity as a copy number
#[inline]
fn copy_number(state: &[f64], species: usize) -> f64 {
    state[species].trunc()
}

/// Binomial coefficient over real-valued arithmetic; zero when `k > n`
pub fn choose(n: i64, k: i64) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = if k > n / 2 { n - k } else { k };
    let mut accumulator = 1.0;
    for i in 1..=k {
        accumulator = accumulator * (n - k + i) as f64 / i as f64;
    }
    accumulator
}

pub fn mass_action(state: &[f64], reactants: &[u32], params: &[f64], _acting: &[usize]) -> f64 {
    let mut propensity = params[0];
    for (species, &coefficient) in reactants.iter().enumerate() {
        if coefficient > 0 {
            propensity *= choose(copy_number(state, species) as i64, coefficient as i64);
        }
    }
    propensity
}

pub fn hill_activation(state: &[f64], _reactants: &[u32], params: &[f64], acting: &[usize]) -> f64 {
    let (rate, k, n) = (params[0], params[1], params[2]);
    let y = copy_number(state, acting[0]);
    rate / (1.0 + (k / y).powf(n))
}

pub fn hill_inhibition(state: &[f64], _reactants: &[u32], params: &[f64], acting: &[usize]) -> f64 {
    let (rate, k, n) = (params[0], params[1], params[2]);
    let y = copy_number(state, acting[0]);
    rate / (1.0 + (y / k).powf(n))
}

pub fn mass_action_hill_inhibition(
    state: &[f64],
    _reactants: &[u32],
    params: &[f64],
    acting: &[usize],
) -> f64 {
    let (rate, ki, ni) = (params[0], params[1], params[2]);
    let ym = copy_number(state, acting[0]);
    let yi = copy_number(state, acting[1]);
    rate * ym / (1.0 + (yi / ki).powf(ni))
}

pub fn hill_inhibition_hill_activation(
    state: &[f64],
    _reactants: &[u32],
    params: &[f64],
    acting: &[usize],
) -> f64 {
    let (rate, ki, ni, ka, na) = (params[0], params[1], params[2], params[3], params[4]);
    let yi = copy_number(state, acting[0]);
    let ya = copy_number(state, acting[1]);
    if ya == 0.0 {
        return 0.0;
    }
    rate / (1.0 + (yi / ki).powf(ni)) / (1.0 + (ka / ya).powf(na))
}

pub fn competitive_inhibition(
    state: &[f64],
    _reactants: &[u32],
    params: &[f64],
    acting: &[usize],
) -> f64 {
    let (rate, ka, na, gamma, ni) = (params[0], params[1], params[2], params[3], params[4]);
    let ya = copy_number(state, acting[0]);
    let yi = copy_number(state, acting[1]);
    // 0^na over a possibly zero denominator
    if ya == 0.0 {
        return 0.0;
    }
    rate * ya.powf(na) / (ka.powf(na) + ya.powf(na) + (gamma * yi).powf(ni))
}

pub fn competitive_activation(
    state: &[f64],
    _reactants: &[u32],
    params: &[f64],
    acting: &[usize],
) -> f64 {
    let (rate1, k1, n1) = (params[0], params[1], params[2]);
    let (rate2, k2, n2) = (params[3], params[4], params[5]);
    let h1 = (copy_number(state, acting[0]) / k1).powf(n1);
    let h2 = (copy_number(state, acting[1]) / k2).powf(n2);
    (rate1 * h1 + rate2 * h2) / (1.0 + h1 + h2)
}

pub fn competitive_activation_inhibition(
    state: &[f64],
    _reactants: &[u32],
    params: &[f64],
    acting: &[usize],
) -> f64 {
    let (rate1, k1, n1) = (params[0], params[1], params[2]);
    let (rate2, k2, n2) = (params[3], params[4], params[5]);
    let (ki, ni) = (params[6], params[7]);
    let h1 = (copy_number(state, acting[0]) / k1).powf(n1);
    let h2 = (copy_number(state, acting[1]) / k2).powf(n2);
    let hi = (copy_number(state, acting[2]) / ki).powf(ni);
    (rate1 * h1 + rate2 * h2) / (1.0 + h1 + h2 + hi)
}
