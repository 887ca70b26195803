pub mod propensity;
pub mod term;

use std::fmt::Display;

use propensity::PropensityKind;
use term::Term;

use super::solution::Name;
use super::NetworkError;

/// A single reaction as handed over by a network producer: named reactants and products, the
/// rate law it follows, that rate law's positional parameters and the species it reads besides
/// its reactants.
#[derive(Debug, PartialEq, Clone)]
pub struct Reaction {
    reactants: Vec<Term>,
    products: Vec<Term>,
    kind: PropensityKind,
    params: Vec<f64>,
    acting_species: Vec<Name>,
}

impl Reaction {
    pub fn new(
        reactants: Vec<Term>,
        products: Vec<Term>,
        kind: PropensityKind,
        params: Vec<f64>,
        acting_species: Vec<Name>,
    ) -> Self {
        Self { reactants, products, kind, params, acting_species }
    }

    /// Builds a reaction from the short name of its rate law (`MA`, `HA`, ...). Names outside
    /// the closed set of [`PropensityKind`]s are rejected rather than given a placeholder rate.
    pub fn from_code(
        reactants: Vec<Term>,
        products: Vec<Term>,
        code: &str,
        params: Vec<f64>,
        acting_species: Vec<Name>,
    ) -> Result<Self, NetworkError> {
        Ok(Self::new(reactants, products, code.parse()?, params, acting_species))
    }

    /// A mass action reaction with rate constant `rate`
    pub fn mass_action(reactants: Vec<Term>, products: Vec<Term>, rate: f64) -> Self {
        Self::new(reactants, products, PropensityKind::MassAction, vec![rate], Vec::new())
    }

    /// Returns a reference to the list of reactants for a reaction
    pub fn get_reactants(&self) -> &Vec<Term> {
        &self.reactants
    }

    /// Returns a reference to the list of products for a reaction
    pub fn get_products(&self) -> &Vec<Term> {
        &self.products
    }

    pub fn get_kind(&self) -> PropensityKind {
        self.kind
    }

    pub fn get_params(&self) -> &[f64] {
        &self.params
    }

    pub fn get_acting_species(&self) -> &[Name] {
        &self.acting_species
    }
}

fn write_side(f: &mut std::fmt::Formatter<'_>, terms: &[Term]) -> std::fmt::Result {
    if terms.is_empty() {
        return write!(f, "0");
    }
    for (index, term) in terms.iter().enumerate() {
        if index > 0 {
            write!(f, " + ")?;
        }
        write!(f, "{}", term)?;
    }
    Ok(())
}

impl Display for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_side(f, &self.reactants)?;
        write!(f, " -> ")?;
        write_side(f, &self.products)?;
        write!(f, " | {} |", self.kind)?;
        for name in &self.acting_species {
            write!(f, " {}", name)?;
        }
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        Ok(())
    }
}
