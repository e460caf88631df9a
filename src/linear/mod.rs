//! 精确整数线性代数: 齐次方程组消元与不等式系统.

pub mod eliminator;
pub mod equation;
pub mod inequality;

pub use eliminator::{EliminationError, EliminationState, find_basis};
pub use equation::EquationSystem;
pub use inequality::{Comparator, Inequality, InequalitySystem};
