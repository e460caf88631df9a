//! 齐次整数线性方程组的消元 (Farkas 风格), 计算解格的一组基.
//!
//! 维护两个列数相同的整数矩阵:
//! * `transform`: 初始为单位阵, 列向量最终即为基向量;
//! * `residual`: 初始为输入方程, 始终等于 `equations · transform`.
//!
//! 每轮取一行剩余方程, 以绝对值最小的系数为主元, 把其余列按欧几里得步骤
//! 约化, 直到该行至多一个非零系数. 若剩下 `k·y_i = 0`, 则第 `i` 个方向被
//! 强制为零并删除. 每消去一行, 对 `transform` 的非零列做两两尺寸约化
//! (`c_i -= round(<c_i,c_j>/<c_j,c_j>)·c_j`), 抑制系数增长.
//! `residual` 为空时, `transform` 的每一列都满足全部方程.
//!
//! 中间结果使用任意精度整数; 只有最终的基向量需要落在 `i64` 范围内.
use num::Integer;
use num::bigint::BigInt;
use num::traits::{Signed, ToPrimitive, Zero};
use thiserror::Error;

use crate::cancel::{CancellationToken, Cancelled};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EliminationError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("basis vector has a coefficient outside the 64-bit range")]
    Overflow,
}

/// Owned elimination state, created fresh for every basis computation.
#[derive(Debug, Clone)]
pub struct EliminationState {
    transform: Vec<Vec<BigInt>>,
    residual: Vec<Vec<BigInt>>,
}

impl EliminationState {
    pub fn new(variables: usize, equations: impl IntoIterator<Item = Vec<i64>>) -> Self {
        let transform = (0..variables)
            .map(|row| {
                (0..variables)
                    .map(|column| BigInt::from(i64::from(row == column)))
                    .collect()
            })
            .collect();
        let residual = equations
            .into_iter()
            .inspect(|equation| {
                assert_eq!(
                    equation.len(),
                    variables,
                    "equation has {} coefficients, expected {}",
                    equation.len(),
                    variables
                )
            })
            .map(|equation| equation.into_iter().map(BigInt::from).collect())
            .collect();
        let mut state = Self {
            transform,
            residual,
        };
        state.drop_trivial_rows();
        state
    }

    pub fn variables(&self) -> usize {
        self.transform.len()
    }

    pub fn is_done(&self) -> bool {
        self.residual.is_empty()
    }

    fn rows_mut(&mut self) -> impl Iterator<Item = &mut Vec<BigInt>> {
        self.transform.iter_mut().chain(self.residual.iter_mut())
    }

    /// `column(target) -= factor * column(source)` in both matrices.
    fn subtract_column(&mut self, target: usize, source: usize, factor: &BigInt) {
        for row in self.rows_mut() {
            let delta = factor * &row[source];
            row[target] -= delta;
        }
    }

    fn clear_column(&mut self, column: usize) {
        for row in self.rows_mut() {
            row[column] = BigInt::zero();
        }
    }

    fn drop_trivial_rows(&mut self) {
        self.residual.retain(|row| row.iter().any(|value| !value.is_zero()));
    }

    /// `<column(left), column(right)>` over `transform`.
    fn column_dot(&self, left: usize, right: usize) -> BigInt {
        self.transform
            .iter()
            .map(|row| &row[left] * &row[right])
            .sum()
    }

    /// Pairwise size reduction of the `transform` columns. Every step is a
    /// unimodular column operation that strictly shrinks one column.
    fn reduce_columns(&mut self) {
        let columns = self.variables();
        let mut changed = true;
        while changed {
            changed = false;
            for target in 0..columns {
                for source in 0..columns {
                    if target == source {
                        continue;
                    }
                    let norm = self.column_dot(source, source);
                    if norm.is_zero() {
                        continue;
                    }
                    let dot = self.column_dot(target, source);
                    // round(dot / norm)
                    let factor =
                        (BigInt::from(2) * &dot + &norm).div_floor(&(BigInt::from(2) * &norm));
                    if factor.is_zero() {
                        continue;
                    }
                    // |t - f·s|² - |t|² = f·(f·norm - 2·dot)
                    let growth = &factor * (&factor * &norm - BigInt::from(2) * &dot);
                    if growth.is_negative() {
                        self.subtract_column(target, source, &factor);
                        changed = true;
                    }
                }
            }
        }
    }

    /// Reduces the first residual equation until it has at most one nonzero
    /// coefficient, then removes it.
    pub fn eliminate_row(&mut self) {
        if self.residual.is_empty() {
            return;
        }
        loop {
            let nonzero: Vec<(usize, BigInt)> = self.residual[0]
                .iter()
                .enumerate()
                .filter(|(_, value)| !value.is_zero())
                .map(|(column, value)| (column, value.clone()))
                .collect();
            let Some((pivot, divisor)) = nonzero
                .iter()
                .min_by(|(_, left), (_, right)| left.abs().cmp(&right.abs()))
                .cloned()
            else {
                break;
            };
            if nonzero.len() == 1 {
                log::trace!("direction {} forced to zero", pivot);
                self.clear_column(pivot);
                break;
            }
            for (target, value) in nonzero.iter().filter(|(column, _)| *column != pivot) {
                // 截断除法: 余数绝对值小于主元, 每轮最小系数严格下降.
                let factor = value / &divisor;
                if !factor.is_zero() {
                    log::trace!("column {} -= {} * column {}", target, factor, pivot);
                    self.subtract_column(*target, pivot, &factor);
                }
            }
        }

        self.drop_trivial_rows();
        self.reduce_columns();
    }

    /// The columns of `transform`, one per variable direction.
    pub fn into_basis(self) -> Result<Vec<Vec<i64>>, EliminationError> {
        let variables = self.variables();
        (0..variables)
            .map(|column| {
                self.transform
                    .iter()
                    .map(|row| row[column].to_i64().ok_or(EliminationError::Overflow))
                    .collect()
            })
            .collect()
    }
}

/// Computes `variables` integer vectors spanning the solution lattice of the
/// homogeneous system. Vectors of eliminated directions are all-zero.
pub fn find_basis(
    variables: usize,
    equations: impl IntoIterator<Item = Vec<i64>>,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<i64>>, EliminationError> {
    let mut state = EliminationState::new(variables, equations);
    while !state.is_done() {
        cancel.check()?;
        state.eliminate_row();
    }
    state.into_basis()
}
