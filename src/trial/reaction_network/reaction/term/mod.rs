use std::fmt::Display;

use super::super::solution::{Count, Name};

/// A species together with its stoichiometric coefficient on one side of a reaction
#[derive(Debug, Hash, Eq, PartialEq, Clone, Ord, PartialOrd)]
pub struct Term {
    species_name: Name,
    coefficient: Count,
}

impl Term {
    pub fn new(species_name: Name, coefficient: Count) -> Self {
        Term { species_name, coefficient }
    }

    /// Shorthand for `Term::new(Name(species), Count(coefficient))`
    pub fn of(species: &str, coefficient: u64) -> Self {
        Term::new(Name::from(species), Count(coefficient))
    }

    pub fn get_coefficient(&self) -> Count {
        self.coefficient
    }

    pub fn get_species_name(&self) -> &Name {
        &self.species_name
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.coefficient.0 {
            1 => write!(f, "{}", self.species_name),
            coefficient => write!(f, "{}*{}", coefficient, self.species_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_omits_unit_coefficient() {
        assert_eq!(Term::of("A", 1).to_string(), "A");
        assert_eq!(Term::of("B", 3).to_string(), "3*B");
    }
}
