use std::ops::Index;

/// A dense, row-major rectangular matrix indexed by `[reaction][species]`.
///
/// Indexing out of bounds panics the same way slice indexing does; every index handed to a
/// matrix comes from a validated network.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    columns: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Matrix<T> {
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            data: vec![T::default(); rows * columns],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Returns the entries of a single reaction
    pub fn row(&self, row: usize) -> &[T] {
        assert!(row < self.rows, "row {} out of bounds for {} rows", row, self.rows);
        &self.data[row * self.columns..(row + 1) * self.columns]
    }

    pub fn get(&self, row: usize, column: usize) -> Option<T> {
        if row < self.rows && column < self.columns {
            Some(self.data[row * self.columns + column])
        } else {
            None
        }
    }

    pub(crate) fn set(&mut self, row: usize, column: usize, value: T) {
        assert!(
            row < self.rows && column < self.columns,
            "index ({}, {}) out of bounds for {}x{} matrix",
            row,
            column,
            self.rows,
            self.columns
        );
        self.data[row * self.columns + column] = value;
    }
}

impl<T: Copy + Default> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (row, column): (usize, usize)) -> &T {
        assert!(
            row < self.rows && column < self.columns,
            "index ({}, {}) out of bounds for {}x{} matrix",
            row,
            column,
            self.rows,
            self.columns
        );
        &self.data[row * self.columns + column]
    }
}

/// Reactant, product and cached net-change matrices of a network
#[derive(Clone, Debug, PartialEq)]
pub struct Stoichiometry {
    reactants: Matrix<u32>,
    products: Matrix<u32>,
    net: Matrix<i64>,
}

impl Stoichiometry {
    /// Builds the stoichiometry and precomputes `net = products - reactants`
    pub fn new(reactants: Matrix<u32>, products: Matrix<u32>) -> Self {
        debug_assert_eq!(reactants.rows(), products.rows());
        debug_assert_eq!(reactants.columns(), products.columns());

        let mut net = Matrix::zeros(reactants.rows(), reactants.columns());
        for reaction in 0..reactants.rows() {
            for species in 0..reactants.columns() {
                net.set(
                    reaction,
                    species,
                    products[(reaction, species)] as i64 - reactants[(reaction, species)] as i64,
                );
            }
        }

        Self { reactants, products, net }
    }

    pub fn reactants(&self) -> &Matrix<u32> {
        &self.reactants
    }

    pub fn products(&self) -> &Matrix<u32> {
        &self.products
    }

    pub fn net(&self) -> &Matrix<i64> {
        &self.net
    }

    /// Computes `out[species] = sum_reaction net[reaction][species] * weights[reaction]`.
    ///
    /// With propensities as weights this is the mean-field drift; with leap residuals it is the
    /// per-species noise increment.
    pub fn combine(&self, weights: &[f64], out: &mut [f64]) {
        out.iter_mut().for_each(|value| *value = 0.0);
        for (reaction, &weight) in weights.iter().enumerate() {
            if weight == 0.0 {
                continue;
            }
            for (value, &delta) in out.iter_mut().zip(self.net.row(reaction)) {
                *value += delta as f64 * weight;
            }
        }
    }
}
