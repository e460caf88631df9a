//! 增量式整数线性算术约束求解器.
//!
//! 断言以析取为单位追加到日志中 (多次断言之间为合取); `push` 记录日志长度,
//! `pop` 截断回该检查点, 从而精确恢复已断言的系统与已声明的变量数.
//! 实际的可满足性判定委托给 [`DecisionProcedure`], 默认实现为
//! [`BranchAndBound`] (精确单纯形 + 分支定界).
pub mod search;
pub mod simplex;

use thiserror::Error;

use crate::cancel::{CancellationToken, Cancelled};
use crate::linear::InequalitySystem;

pub use search::BranchAndBound;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("decision procedure was cancelled")]
    Cancelled,
    #[error("decision procedure gave up after {0} search nodes")]
    NodeLimit(usize),
    #[error("model value does not fit into a 64-bit integer")]
    Overflow,
}

impl From<Cancelled> for SolverError {
    fn from(_: Cancelled) -> Self {
        SolverError::Cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// 搜索节点上限, 超出即返回 [`SolverError::NodeLimit`].
    pub node_limit: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self { node_limit: 50_000 }
    }
}

/// The backend answering satisfiability of a conjunction of disjunctions.
pub trait DecisionProcedure {
    /// Returns a value for each of the `variables` variables, or `None` if
    /// no integer assignment satisfies every disjunction.
    fn solve(
        &self,
        variables: usize,
        disjunctions: &[Vec<InequalitySystem>],
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<i64>>, SolverError>;
}

#[derive(Debug, Clone)]
struct Assertion {
    alternatives: Vec<InequalitySystem>,
    /// Declared variable count after this assertion.
    variables: usize,
}

#[derive(Debug, Clone)]
pub struct ConstraintSolver<P = BranchAndBound> {
    procedure: P,
    log: Vec<Assertion>,
    checkpoints: Vec<usize>,
    cancel: CancellationToken,
}

impl ConstraintSolver<BranchAndBound> {
    pub fn new(cancel: CancellationToken) -> Self {
        Self::with_config(cancel, SolverConfig::default())
    }

    pub fn with_config(cancel: CancellationToken, config: SolverConfig) -> Self {
        Self::with_procedure(BranchAndBound::new(config), cancel)
    }
}

impl<P> ConstraintSolver<P>
where
    P: DecisionProcedure,
{
    pub fn with_procedure(procedure: P, cancel: CancellationToken) -> Self {
        Self {
            procedure,
            log: Vec::new(),
            checkpoints: Vec::new(),
            cancel,
        }
    }

    /// Number of variables referenced by the assertions currently in scope.
    pub fn variables(&self) -> usize {
        self.log.last().map_or(0, |assertion| assertion.variables)
    }

    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }

    /// Asserts that at least one of `systems` holds.
    pub fn assert_disjunction(&mut self, systems: impl IntoIterator<Item = InequalitySystem>) {
        let alternatives: Vec<InequalitySystem> = systems.into_iter().collect();
        let referenced = alternatives
            .iter()
            .map(InequalitySystem::variables)
            .max()
            .unwrap_or(0);
        let variables = self.variables().max(referenced);
        log::trace!(
            "assert disjunction of {} systems, {} variables declared",
            alternatives.len(),
            variables
        );
        self.log.push(Assertion {
            alternatives,
            variables,
        });
    }

    pub fn assert_conjunction(&mut self, system: InequalitySystem) {
        self.assert_disjunction([system]);
    }

    pub fn push(&mut self) {
        self.checkpoints.push(self.log.len());
    }

    pub fn pop(&mut self) {
        let checkpoint = self
            .checkpoints
            .pop()
            .unwrap_or_else(|| panic!("pop without matching push"));
        self.log.truncate(checkpoint);
    }

    pub fn find_solution(&self) -> Result<Option<Vec<i64>>, SolverError> {
        self.cancel.check()?;
        let disjunctions: Vec<Vec<InequalitySystem>> = self
            .log
            .iter()
            .map(|assertion| assertion.alternatives.clone())
            .collect();
        let model = self
            .procedure
            .solve(self.variables(), &disjunctions, &self.cancel)?;
        self.cancel.check()?;

        if let Some(model) = model.as_ref() {
            debug_assert!(
                self.log.iter().all(|assertion| assertion
                    .alternatives
                    .iter()
                    .any(|system| system.fulfilled_by(model))),
                "model {:?} violates an asserted system",
                model
            );
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::Comparator;

    fn single(lhs: i64, comparator: Comparator, coefficients: Vec<i64>) -> InequalitySystem {
        let mut system = InequalitySystem::new();
        system.add_inequality(lhs, comparator, coefficients, "");
        system
    }

    #[test]
    fn variables_are_declared_on_demand() {
        let mut solver = ConstraintSolver::new(CancellationToken::new());
        solver.assert_conjunction(single(1, Comparator::LessEqual, vec![1]));
        solver.assert_conjunction(single(0, Comparator::Less, vec![0, 0, 1]));
        assert_eq!(solver.variables(), 3);
        let model = solver.find_solution().unwrap().unwrap();
        assert_eq!(model.len(), 3);
        assert!(model[0] >= 1 && model[2] >= 1);
    }

    #[test]
    fn push_then_pop_restores_results() {
        let mut solver = ConstraintSolver::new(CancellationToken::new());
        solver.assert_conjunction(single(2, Comparator::LessEqual, vec![1, 1]));
        let before = solver.find_solution().unwrap();
        solver.push();
        solver.pop();
        assert_eq!(solver.find_solution().unwrap(), before);
    }

    #[test]
    fn pop_discards_scoped_assertions() {
        let mut solver = ConstraintSolver::new(CancellationToken::new());
        solver.assert_conjunction(single(0, Comparator::LessEqual, vec![1]));
        solver.push();
        solver.assert_conjunction(single(0, Comparator::Less, vec![0, 1]));
        solver.assert_conjunction(single(-1, Comparator::GreaterEqual, vec![1]));
        assert_eq!(solver.variables(), 2);
        assert_eq!(solver.find_solution().unwrap(), None);
        solver.pop();
        assert_eq!(solver.variables(), 1);
        assert!(solver.find_solution().unwrap().is_some());
    }

    #[test]
    fn solution_is_repeatable() {
        let mut solver = ConstraintSolver::new(CancellationToken::new());
        solver.assert_disjunction([
            single(5, Comparator::Equal, vec![1]),
            single(7, Comparator::Equal, vec![1]),
        ]);
        let first = solver.find_solution().unwrap();
        assert_eq!(first, solver.find_solution().unwrap());
        assert!(matches!(first.as_deref(), Some([5]) | Some([7])));
    }

    #[test]
    fn cancellation_is_not_unsat() {
        let cancel = CancellationToken::new();
        let mut solver = ConstraintSolver::new(cancel.clone());
        solver.assert_conjunction(single(0, Comparator::LessEqual, vec![1]));
        cancel.cancel();
        assert_eq!(solver.find_solution(), Err(SolverError::Cancelled));
    }

    #[test]
    #[should_panic(expected = "pop without matching push")]
    fn unbalanced_pop_panics() {
        let mut solver = ConstraintSolver::new(CancellationToken::new());
        solver.pop();
    }
}
