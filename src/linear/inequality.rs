//! 不等式 `lhs ⋈ Σ a_i·x_i` 及其合取系统.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::solver::{ConstraintSolver, SolverConfig, SolverError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
}

impl Comparator {
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Comparator::Less => lhs < rhs,
            Comparator::LessEqual => lhs <= rhs,
            Comparator::Equal => lhs == rhs,
            Comparator::GreaterEqual => lhs >= rhs,
            Comparator::Greater => lhs > rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Less => "<",
            Comparator::LessEqual => "<=",
            Comparator::Equal => "=",
            Comparator::GreaterEqual => ">=",
            Comparator::Greater => ">",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inequality {
    pub lhs: i64,
    pub comparator: Comparator,
    pub coefficients: Vec<i64>,
    /// Diagnostic text, never part of the semantics.
    #[serde(default)]
    pub comment: String,
}

impl Inequality {
    pub fn new(
        lhs: i64,
        comparator: Comparator,
        coefficients: Vec<i64>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            lhs,
            comparator,
            coefficients,
            comment: comment.into(),
        }
    }

    pub fn variables(&self) -> usize {
        self.coefficients.len()
    }

    pub fn evaluate(&self, assignment: &[i64]) -> i64 {
        assert!(
            assignment.len() >= self.coefficients.len(),
            "assignment of length {} is too short for {} coefficients",
            assignment.len(),
            self.coefficients.len()
        );
        self.coefficients
            .iter()
            .zip(assignment)
            .map(|(a, x)| a * x)
            .sum()
    }

    pub fn fulfilled_by(&self, assignment: &[i64]) -> bool {
        self.comparator.holds(self.lhs, self.evaluate(assignment))
    }
}

impl fmt::Debug for Inequality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Inequality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.lhs, self.comparator)?;
        let mut empty = true;
        for (idx, a) in self.coefficients.iter().enumerate() {
            if *a == 0 {
                continue;
            }
            if empty {
                write!(f, " {}*x[{}]", a, idx)?;
            } else {
                write!(f, " + {}*x[{}]", a, idx)?;
            }
            empty = false;
        }
        if empty {
            write!(f, " 0")?;
        }
        if !self.comment.is_empty() {
            write!(f, "\t# {}", self.comment)?;
        }
        Ok(())
    }
}

/// An ordered conjunction of inequalities.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InequalitySystem {
    inequalities: Vec<Inequality>,
}

impl InequalitySystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_inequality(
        &mut self,
        lhs: i64,
        comparator: Comparator,
        coefficients: Vec<i64>,
        comment: impl Into<String>,
    ) {
        self.inequalities
            .push(Inequality::new(lhs, comparator, coefficients, comment));
    }

    pub fn push(&mut self, inequality: Inequality) {
        self.inequalities.push(inequality);
    }

    pub fn extend(&mut self, other: &InequalitySystem) {
        self.inequalities.extend(other.inequalities.iter().cloned());
    }

    pub fn inequalities(&self) -> &[Inequality] {
        &self.inequalities
    }

    pub fn len(&self) -> usize {
        self.inequalities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inequalities.is_empty()
    }

    pub fn variables(&self) -> usize {
        self.inequalities
            .iter()
            .map(Inequality::variables)
            .max()
            .unwrap_or(0)
    }

    pub fn fulfilled_by(&self, assignment: &[i64]) -> bool {
        self.inequalities
            .iter()
            .all(|inequality| inequality.fulfilled_by(assignment))
    }

    pub fn find_solution(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<i64>>, SolverError> {
        self.find_solution_with(cancel, SolverConfig::default())
    }

    /// Solves the system in a fresh solver session.
    pub fn find_solution_with(
        &self,
        cancel: &CancellationToken,
        config: SolverConfig,
    ) -> Result<Option<Vec<i64>>, SolverError> {
        let mut solver = ConstraintSolver::with_config(cancel.clone(), config);
        solver.assert_conjunction(self.clone());
        solver.find_solution()
    }
}

impl fmt::Debug for InequalitySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inequalities.iter()).finish()
    }
}

impl fmt::Display for InequalitySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inequality in &self.inequalities {
            writeln!(f, "{}", inequality)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fulfilled_by_checks_every_comparator() {
        let assignment = [2, 3];
        let cases = [
            (Comparator::Less, 7, true),
            (Comparator::LessEqual, 8, true),
            (Comparator::Equal, 8, true),
            (Comparator::GreaterEqual, 8, true),
            (Comparator::Greater, 8, false),
        ];
        for (comparator, lhs, expected) in cases {
            let inequality = Inequality::new(lhs, comparator, vec![1, 2], "");
            assert_eq!(inequality.fulfilled_by(&assignment), expected, "{}", inequality);
        }
    }

    #[test]
    fn obviously_infeasible_system_has_no_solution() {
        let mut system = InequalitySystem::new();
        system.add_inequality(0, Comparator::Greater, vec![0, 0], "0 > 0");
        let solution = system.find_solution(&CancellationToken::new()).unwrap();
        assert!(solution.is_none());
    }

    #[test]
    fn solutions_fulfil_every_inequality() {
        let mut system = InequalitySystem::new();
        system.add_inequality(3, Comparator::Less, vec![2, 1, 0], "");
        system.add_inequality(10, Comparator::GreaterEqual, vec![1, 1, 1], "");
        system.add_inequality(-1, Comparator::Equal, vec![1, 0, -1], "");
        system.add_inequality(0, Comparator::LessEqual, vec![0, 0, 1], "");
        let solution = system
            .find_solution(&CancellationToken::new())
            .unwrap()
            .expect("system is satisfiable");
        assert_eq!(solution.len(), 3);
        assert!(system.fulfilled_by(&solution), "{:?}\n{}", solution, system);
    }

    #[test]
    fn strict_inequalities_are_integral() {
        // 2x > 1 且 2x < 3 只有整数解 x = 1.
        let mut system = InequalitySystem::new();
        system.add_inequality(1, Comparator::Less, vec![2], "");
        system.add_inequality(3, Comparator::Greater, vec![2], "");
        let solution = system.find_solution(&CancellationToken::new()).unwrap();
        assert_eq!(solution, Some(vec![1]));
    }

    #[test]
    fn parity_conflict_is_unsatisfiable() {
        let mut system = InequalitySystem::new();
        system.add_inequality(1, Comparator::Equal, vec![2], "2x = 1");
        let solution = system.find_solution(&CancellationToken::new()).unwrap();
        assert!(solution.is_none());
    }
}
