use std::fmt;

use indexmap::IndexSet;

use crate::cancel::CancellationToken;
use crate::linear::eliminator::{self, EliminationError};

/// A homogeneous system `Σ a_i · x_i = 0` over a fixed number of variables.
#[derive(Clone, Default)]
pub struct EquationSystem {
    variables: usize,
    equations: IndexSet<Vec<i64>>,
}

impl EquationSystem {
    pub fn new(variables: usize) -> Self {
        Self {
            variables,
            equations: IndexSet::new(),
        }
    }

    pub fn variables(&self) -> usize {
        self.variables
    }

    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    pub fn add_equation(&mut self, coefficients: Vec<i64>) {
        assert_eq!(
            coefficients.len(),
            self.variables,
            "equation length does not match the variable count"
        );
        self.equations.insert(coefficients);
    }

    pub fn equations(&self) -> impl Iterator<Item = &[i64]> {
        self.equations.iter().map(Vec::as_slice)
    }

    pub fn is_solution(&self, vector: &[i64]) -> bool {
        self.equations.iter().all(|equation| {
            equation
                .iter()
                .zip(vector)
                .map(|(a, x)| a * x)
                .sum::<i64>()
                == 0
        })
    }

    /// Nonzero vectors spanning every integer solution of the system.
    pub fn find_basis(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<i64>>, EliminationError> {
        let basis = eliminator::find_basis(self.variables, self.equations.iter().cloned(), cancel)?;
        let basis: Vec<_> = basis
            .into_iter()
            .filter(|vector| vector.iter().any(|value| *value != 0))
            .collect();
        log::debug!(
            "basis of {} equations over {} variables has {} vectors",
            self.len(),
            self.variables,
            basis.len()
        );
        Ok(basis)
    }
}

impl fmt::Debug for EquationSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EquationSystem")
            .field("variables", &self.variables)
            .field("equations", &self.equations)
            .finish()
    }
}

impl fmt::Display for EquationSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for equation in &self.equations {
            let terms: Vec<String> = equation
                .iter()
                .enumerate()
                .filter(|(_, a)| **a != 0)
                .map(|(idx, a)| format!("{}*x[{}]", a, idx))
                .collect();
            if terms.is_empty() {
                writeln!(f, "0 = 0")?;
            } else {
                writeln!(f, "{} = 0", terms.join(" + "))?;
            }
        }
        Ok(())
    }
}
