//! 内置判定过程: 析取回溯 + 分支定界.
use num::bigint::BigInt;
use num::traits::One;

use crate::cancel::CancellationToken;
use crate::linear::{Comparator, Inequality, InequalitySystem};
use crate::solver::simplex::{LinearConstraint, Tableau};
use crate::solver::{DecisionProcedure, SolverConfig, SolverError};

/// Integer bounds of `lhs ⋈ Σ a·x`, rewritten as bounds on `Σ a·x`.
/// Strict comparisons are tightened by one since every term is integral.
/// Bounds are widened so tightening `i64::MAX`/`i64::MIN` cannot overflow.
pub fn normalize(inequality: &Inequality) -> LinearConstraint {
    let lhs = i128::from(inequality.lhs);
    let (lower, upper) = match inequality.comparator {
        Comparator::Less => (Some(lhs + 1), None),
        Comparator::LessEqual => (Some(lhs), None),
        Comparator::Equal => (Some(lhs), Some(lhs)),
        Comparator::GreaterEqual => (None, Some(lhs)),
        Comparator::Greater => (None, Some(lhs - 1)),
    };
    LinearConstraint {
        coefficients: inequality.coefficients.clone(),
        lower,
        upper,
    }
}

fn normalize_system(system: &InequalitySystem) -> Vec<LinearConstraint> {
    system.inequalities().iter().map(normalize).collect()
}

#[derive(Debug, Clone, Default)]
pub struct BranchAndBound {
    config: SolverConfig,
}

struct Search<'a> {
    variables: usize,
    cancel: &'a CancellationToken,
    node_limit: usize,
    nodes: usize,
}

impl BranchAndBound {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl DecisionProcedure for BranchAndBound {
    fn solve(
        &self,
        variables: usize,
        disjunctions: &[Vec<InequalitySystem>],
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<i64>>, SolverError> {
        let mut base = Vec::new();
        let mut choices = Vec::new();
        for disjunction in disjunctions {
            match disjunction.as_slice() {
                [] => return Ok(None),
                [single] => base.extend(normalize_system(single)),
                alternatives => {
                    // 含空系统的析取恒真.
                    if alternatives.iter().any(InequalitySystem::is_empty) {
                        continue;
                    }
                    choices.push(alternatives.iter().map(normalize_system).collect::<Vec<_>>());
                }
            }
        }

        let mut search = Search {
            variables,
            cancel,
            node_limit: self.config.node_limit,
            nodes: 0,
        };
        let model = search.choose(&mut base, &choices)?;
        log::trace!(
            "decision procedure explored {} nodes over {} variables",
            search.nodes,
            variables
        );
        Ok(model)
    }
}

impl Search<'_> {
    fn visit(&mut self) -> Result<(), SolverError> {
        self.cancel.check()?;
        self.nodes += 1;
        if self.nodes > self.node_limit {
            return Err(SolverError::NodeLimit(self.node_limit));
        }
        Ok(())
    }

    /// Picks one alternative per remaining disjunction, pruning by LP relaxation.
    fn choose(
        &mut self,
        constraints: &mut Vec<LinearConstraint>,
        choices: &[Vec<Vec<LinearConstraint>>],
    ) -> Result<Option<Vec<i64>>, SolverError> {
        let Some((first, rest)) = choices.split_first() else {
            return self.branch_and_bound(Tableau::new(self.variables, constraints));
        };
        for alternative in first {
            self.visit()?;
            let depth = constraints.len();
            constraints.extend(alternative.iter().cloned());
            let mut relaxation = Tableau::new(self.variables, constraints);
            let model = if relaxation.check() {
                self.choose(constraints, rest)?
            } else {
                None
            };
            constraints.truncate(depth);
            if model.is_some() {
                return Ok(model);
            }
        }
        Ok(None)
    }

    fn branch_and_bound(&mut self, root: Tableau) -> Result<Option<Vec<i64>>, SolverError> {
        let mut stack = vec![root];
        while let Some(mut tableau) = stack.pop() {
            self.visit()?;
            if !tableau.check() {
                continue;
            }
            let Some((var, value)) = tableau.first_fractional() else {
                return tableau
                    .integer_model()
                    .map(Some)
                    .ok_or(SolverError::Overflow);
            };
            let floor = value.floor().to_integer();
            let ceil = &floor + BigInt::one();

            let mut down = tableau.clone();
            let mut up = tableau;
            let down_ok = down.tighten_upper(var, floor);
            let up_ok = up.tighten_lower(var, ceil);
            // 靠近零的分支先搜索 (栈顶后进先出).
            let prefer_down = value.numer() > &BigInt::from(0);
            let (first, second) = if prefer_down {
                ((down, down_ok), (up, up_ok))
            } else {
                ((up, up_ok), (down, down_ok))
            };
            if second.1 {
                stack.push(second.0);
            }
            if first.1 {
                stack.push(first.0);
            }
        }
        Ok(None)
    }
}
