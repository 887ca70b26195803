use std::collections::HashMap;
use std::fmt::Display;

use thiserror::Error;

use reaction::propensity::{Propensity, PropensityKind};
use reaction::Reaction;
use solution::{Count, Name};
use stoichiometry::{Matrix, Stoichiometry};

pub mod reaction;
pub mod solution;
pub mod stoichiometry;

/// Violations of the contract a network producer must honour
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetworkError {
    #[error("species '{0}' is declared more than once")]
    DuplicateSpecies(Name),
    #[error("reaction {reaction} refers to undeclared species '{species}'")]
    UndeclaredSpecies { reaction: usize, species: Name },
    #[error("reaction {reaction} ({kind}) expects {expected} parameters, found {found}")]
    ParameterCount {
        reaction: usize,
        kind: PropensityKind,
        expected: usize,
        found: usize,
    },
    #[error("reaction {reaction} ({kind}) expects {expected} acting species, found {found}")]
    ActingSpeciesCount {
        reaction: usize,
        kind: PropensityKind,
        expected: usize,
        found: usize,
    },
    #[error("propensity type '{0}' not recognised")]
    UnknownPropensity(String),
    #[error("reaction {reaction} gives species '{species}' a stoichiometric coefficient above {}", u32::MAX)]
    CoefficientOverflow { reaction: usize, species: Name },
}

/// An immutable, validated chemical reaction network.
///
/// Construction resolves every species name to an index once, so the simulation loops only ever
/// touch dense matrices and index lists:
/// - stoichiometry
///     - reactant, product and net-change matrices indexed by `[reaction][species]`
/// - propensities
///     - one bound rate law per reaction, in declaration order
/// - initial counts
///     - copy numbers every run starts from
#[derive(Clone, Debug)]
pub struct ReactionNetwork {
    species: Vec<Name>,
    initial_counts: Vec<u64>,
    reactions: Vec<Reaction>,
    propensities: Vec<Propensity>,
    stoichiometry: Stoichiometry,
}

impl ReactionNetwork {
    /// Validates and compiles a network.
    ///
    /// Species keep the order they are given in; that order is the column order of every
    /// trajectory produced from this network.
    pub fn new(species: Vec<(Name, Count)>, reactions: Vec<Reaction>) -> Result<Self, NetworkError> {
        let mut index_of = HashMap::with_capacity(species.len());
        for (index, (name, _)) in species.iter().enumerate() {
            if index_of.insert(name.clone(), index).is_some() {
                return Err(NetworkError::DuplicateSpecies(name.clone()));
            }
        }

        let resolve = |reaction: usize, name: &Name| -> Result<usize, NetworkError> {
            index_of
                .get(name)
                .copied()
                .ok_or_else(|| NetworkError::UndeclaredSpecies { reaction, species: name.clone() })
        };

        let mut reactants: Matrix<u32> = Matrix::zeros(reactions.len(), species.len());
        let mut products = Matrix::zeros(reactions.len(), species.len());
        let mut propensities = Vec::with_capacity(reactions.len());

        for (index, reaction) in reactions.iter().enumerate() {
            for (terms, matrix) in [
                (reaction.get_reactants(), &mut reactants),
                (reaction.get_products(), &mut products),
            ] {
                for term in terms {
                    let column = resolve(index, term.get_species_name())?;
                    // repeated terms accumulate
                    let coefficient = u32::try_from(term.get_coefficient().0)
                        .ok()
                        .and_then(|coefficient| matrix[(index, column)].checked_add(coefficient))
                        .ok_or_else(|| NetworkError::CoefficientOverflow {
                            reaction: index,
                            species: term.get_species_name().clone(),
                        })?;
                    matrix.set(index, column, coefficient);
                }
            }

            let kind = reaction.get_kind();
            if reaction.get_params().len() != kind.parameter_count() {
                return Err(NetworkError::ParameterCount {
                    reaction: index,
                    kind,
                    expected: kind.parameter_count(),
                    found: reaction.get_params().len(),
                });
            }
            if reaction.get_acting_species().len() != kind.acting_species_count() {
                return Err(NetworkError::ActingSpeciesCount {
                    reaction: index,
                    kind,
                    expected: kind.acting_species_count(),
                    found: reaction.get_acting_species().len(),
                });
            }
            let acting = reaction
                .get_acting_species()
                .iter()
                .map(|name| resolve(index, name))
                .collect::<Result<Vec<_>, _>>()?;

            propensities.push(Propensity::new(kind, reaction.get_params().to_vec(), acting));
        }

        let (names, initial_counts): (Vec<Name>, Vec<u64>) = species.into_iter().map(|(name, count)| (name, count.0)).unzip();

        Ok(Self {
            species: names,
            initial_counts,
            reactions,
            propensities,
            stoichiometry: Stoichiometry::new(reactants, products),
        })
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    pub fn reaction_count(&self) -> usize {
        self.reactions.len()
    }

    /// Species names in column order
    pub fn species_names(&self) -> &[Name] {
        &self.species
    }

    pub fn species_index(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|species| species.0 == name)
    }

    pub fn initial_counts(&self) -> &[u64] {
        &self.initial_counts
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn propensities(&self) -> &[Propensity] {
        &self.propensities
    }

    pub fn stoichiometry(&self) -> &Stoichiometry {
        &self.stoichiometry
    }

    /// Evaluates every reaction's propensity at `state` into `rates`
    pub fn evaluate_propensities(&self, state: &[f64], rates: &mut [f64]) {
        let reactants = self.stoichiometry.reactants();
        for (reaction, (rate, propensity)) in rates.iter_mut().zip(&self.propensities).enumerate() {
            *rate = propensity.rate(state, reactants.row(reaction));
        }
    }
}

impl Display for ReactionNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# [Species] # {} species", self.species_count())?;
        for (name, count) in self.species.iter().zip(&self.initial_counts) {
            writeln!(f, "{} = {}", name, count)?;
        }
        writeln!(f, "# [Reactions] # {} reactions", self.reaction_count())?;
        for reaction in &self.reactions {
            writeln!(f, "# {}", reaction)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::reaction::term::Term;
    use super::*;

    fn species(pairs: &[(&str, u64)]) -> Vec<(Name, Count)> {
        pairs.iter().map(|(name, count)| (Name::from(*name), Count(*count))).collect()
    }

    fn dimerisation() -> ReactionNetwork {
        ReactionNetwork::new(
            species(&[("A", 10), ("A2", 0), ("R", 5)]),
            vec![
                Reaction::mass_action(vec![Term::of("A", 2)], vec![Term::of("A2", 1)], 0.1),
                Reaction::new(
                    vec![Term::of("A2", 1)],
                    vec![Term::of("A", 2)],
                    PropensityKind::HillInhibition,
                    vec![1.0, 5.0, 2.0],
                    vec![Name::from("R")],
                ),
            ],
        )
        .expect("valid network")
    }

    #[test]
    fn compiles_matrices_and_propensities() {
        let network = dimerisation();
        assert_eq!(network.species_count(), 3);
        assert_eq!(network.reaction_count(), 2);
        assert_eq!(network.stoichiometry().reactants().row(0), &[2, 0, 0]);
        assert_eq!(network.stoichiometry().net().row(0), &[-2, 1, 0]);
        assert_eq!(network.stoichiometry().net().row(1), &[2, -1, 0]);
        assert_eq!(network.propensities()[1].acting_species(), &[2]);
        assert_eq!(network.initial_counts(), &[10, 0, 5]);
        assert_eq!(network.species_index("A2"), Some(1));
    }

    #[test]
    fn evaluates_propensities_in_declaration_order() {
        let network = dimerisation();
        let mut rates = vec![0.0; 2];
        network.evaluate_propensities(&[10.0, 1.0, 5.0], &mut rates);
        assert!((rates[0] - 4.5).abs() < 1e-12);
        assert!((rates[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn repeated_terms_accumulate() {
        let network = ReactionNetwork::new(
            species(&[("A", 1)]),
            vec![Reaction::mass_action(vec![Term::of("A", 1), Term::of("A", 1)], vec![], 1.0)],
        )
        .expect("valid network");
        assert_eq!(network.stoichiometry().reactants().row(0), &[2]);
    }

    #[test]
    fn rejects_coefficients_beyond_u32() {
        let oversized = ReactionNetwork::new(
            species(&[("A", 1)]),
            vec![Reaction::mass_action(vec![Term::of("A", u32::MAX as u64 + 1)], vec![], 1.0)],
        );
        assert_eq!(
            oversized.err(),
            Some(NetworkError::CoefficientOverflow { reaction: 0, species: Name::from("A") })
        );

        let accumulated = ReactionNetwork::new(
            species(&[("A", 1)]),
            vec![Reaction::mass_action(
                vec![],
                vec![Term::of("A", u32::MAX as u64), Term::of("A", 1)],
                1.0,
            )],
        );
        assert!(matches!(accumulated, Err(NetworkError::CoefficientOverflow { .. })));
    }

    #[test]
    fn rejects_duplicate_species() {
        let result = ReactionNetwork::new(species(&[("A", 1), ("A", 2)]), vec![]);
        assert_eq!(result.err(), Some(NetworkError::DuplicateSpecies(Name::from("A"))));
    }

    #[test]
    fn rejects_undeclared_species() {
        let result = ReactionNetwork::new(
            species(&[("A", 1)]),
            vec![Reaction::mass_action(vec![Term::of("A", 1)], vec![Term::of("B", 1)], 1.0)],
        );
        assert_eq!(
            result.err(),
            Some(NetworkError::UndeclaredSpecies { reaction: 0, species: Name::from("B") })
        );
    }

    #[test]
    fn rejects_undeclared_acting_species() {
        let result = ReactionNetwork::new(
            species(&[("A", 1)]),
            vec![Reaction::new(
                vec![],
                vec![Term::of("A", 1)],
                PropensityKind::HillActivation,
                vec![1.0, 1.0, 1.0],
                vec![Name::from("X")],
            )],
        );
        assert!(matches!(result, Err(NetworkError::UndeclaredSpecies { .. })));
    }

    #[test]
    fn rejects_arity_mismatch() {
        let params = ReactionNetwork::new(
            species(&[("A", 1)]),
            vec![Reaction::new(vec![], vec![], PropensityKind::MassAction, vec![1.0, 2.0], vec![])],
        );
        assert!(matches!(
            params,
            Err(NetworkError::ParameterCount { expected: 1, found: 2, .. })
        ));

        let acting = ReactionNetwork::new(
            species(&[("A", 1)]),
            vec![Reaction::new(
                vec![],
                vec![],
                PropensityKind::CompetitiveInhibition,
                vec![1.0; 5],
                vec![Name::from("A")],
            )],
        );
        assert!(matches!(
            acting,
            Err(NetworkError::ActingSpeciesCount { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn display_summarises_model() {
        let network = dimerisation();
        let text = network.to_string();
        assert!(text.starts_with("# [Species] # 3 species\nA = 10\nA2 = 0\nR = 5\n"));
        assert!(text.contains("# [Reactions] # 2 reactions\n# 2*A -> A2 | MA | 0.1\n"));
        assert!(text.contains("# A2 -> 2*A | HI | R 1 5 2\n"));
    }
}
