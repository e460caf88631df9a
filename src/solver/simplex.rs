//! 有界变量一般单纯形 (Dutertre & de Moura), 精确有理数运算.
//!
//! 每个约束引入一个松弛变量 `s_k = Σ a_kj·x_j` 并把上下界放在 `s_k` 上,
//! 原始变量初始无界. `check` 采用 Bland 规则选择主元, 保证终止.
use num::bigint::BigInt;
use num::rational::BigRational;
use num::traits::{Signed, ToPrimitive, Zero};

/// A linear constraint `lower <= Σ a_j·x_j <= upper` over the original variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    pub coefficients: Vec<i64>,
    pub lower: Option<i128>,
    pub upper: Option<i128>,
}

#[derive(Debug, Clone)]
pub struct Tableau {
    /// `rows[r]` 表示 `basic[r] = Σ_j rows[r][j]·x_j`, 其中 `j` 为非基变量.
    rows: Vec<Vec<BigRational>>,
    basic: Vec<usize>,
    row_of: Vec<Option<usize>>,
    value: Vec<BigRational>,
    lower: Vec<Option<BigRational>>,
    upper: Vec<Option<BigRational>>,
    originals: usize,
}

fn rational(value: impl Into<BigInt>) -> BigRational {
    BigRational::from_integer(value.into())
}

impl Tableau {
    pub fn new(originals: usize, constraints: &[LinearConstraint]) -> Self {
        let total = originals + constraints.len();
        let mut rows = Vec::with_capacity(constraints.len());
        let mut basic = Vec::with_capacity(constraints.len());
        let mut row_of = vec![None; total];
        let mut lower = vec![None; total];
        let mut upper = vec![None; total];

        for (k, constraint) in constraints.iter().enumerate() {
            assert!(
                constraint.coefficients.len() <= originals,
                "constraint mentions {} variables, only {} declared",
                constraint.coefficients.len(),
                originals
            );
            let mut row = vec![BigRational::zero(); total];
            for (j, a) in constraint.coefficients.iter().enumerate() {
                row[j] = rational(*a);
            }
            let slack = originals + k;
            rows.push(row);
            basic.push(slack);
            row_of[slack] = Some(k);
            lower[slack] = constraint.lower.map(rational);
            upper[slack] = constraint.upper.map(rational);
        }

        Self {
            rows,
            basic,
            row_of,
            value: vec![BigRational::zero(); total],
            lower,
            upper,
            originals,
        }
    }

    fn variables(&self) -> usize {
        self.value.len()
    }

    fn below_lower(&self, var: usize) -> bool {
        self.lower[var]
            .as_ref()
            .is_some_and(|bound| self.value[var] < *bound)
    }

    fn above_upper(&self, var: usize) -> bool {
        self.upper[var]
            .as_ref()
            .is_some_and(|bound| self.value[var] > *bound)
    }

    fn can_increase(&self, var: usize) -> bool {
        self.upper[var]
            .as_ref()
            .is_none_or(|bound| self.value[var] < *bound)
    }

    fn can_decrease(&self, var: usize) -> bool {
        self.lower[var]
            .as_ref()
            .is_none_or(|bound| self.value[var] > *bound)
    }

    /// Sets a nonbasic variable and propagates the change to every basic one.
    fn update(&mut self, var: usize, target: BigRational) {
        debug_assert!(self.row_of[var].is_none());
        let delta = &target - &self.value[var];
        if delta.is_zero() {
            return;
        }
        for (r, row) in self.rows.iter().enumerate() {
            if !row[var].is_zero() {
                let basic = self.basic[r];
                self.value[basic] += &row[var] * &delta;
            }
        }
        self.value[var] = target;
    }

    fn pivot(&mut self, r: usize, entering: usize) {
        let leaving = self.basic[r];
        let pivot = self.rows[r][entering].clone();
        debug_assert!(!pivot.is_zero());

        let mut solved = vec![BigRational::zero(); self.variables()];
        for (k, a) in self.rows[r].iter().enumerate() {
            if k != entering && !a.is_zero() {
                solved[k] = -(a / &pivot);
            }
        }
        solved[leaving] = BigRational::from_integer(BigInt::from(1)) / &pivot;

        for (other, row) in self.rows.iter_mut().enumerate() {
            if other == r {
                continue;
            }
            let factor = std::mem::replace(&mut row[entering], BigRational::zero());
            if factor.is_zero() {
                continue;
            }
            for (k, a) in solved.iter().enumerate() {
                if !a.is_zero() {
                    row[k] += &factor * a;
                }
            }
        }

        self.rows[r] = solved;
        self.basic[r] = entering;
        self.row_of[entering] = Some(r);
        self.row_of[leaving] = None;
    }

    fn pivot_and_update(&mut self, r: usize, entering: usize, target: BigRational) {
        let leaving = self.basic[r];
        let theta = (&target - &self.value[leaving]) / &self.rows[r][entering];
        for (other, row) in self.rows.iter().enumerate() {
            if other != r && !row[entering].is_zero() {
                let basic = self.basic[other];
                self.value[basic] += &row[entering] * &theta;
            }
        }
        self.value[entering] += &theta;
        self.value[leaving] = target;
        self.pivot(r, entering);
    }

    /// Restores bound consistency. `false` means the relaxation is infeasible.
    pub fn check(&mut self) -> bool {
        loop {
            let violated = (0..self.variables())
                .filter(|var| self.row_of[*var].is_some())
                .find(|var| self.below_lower(*var) || self.above_upper(*var));
            let Some(var) = violated else {
                return true;
            };
            let Some(r) = self.row_of[var] else {
                return true;
            };

            let increase = self.below_lower(var);
            let entering = (0..self.variables())
                .filter(|j| self.row_of[*j].is_none())
                .find(|j| {
                    let a = &self.rows[r][*j];
                    if a.is_zero() {
                        return false;
                    }
                    if increase == a.is_positive() {
                        self.can_increase(*j)
                    } else {
                        self.can_decrease(*j)
                    }
                });
            let Some(entering) = entering else {
                return false;
            };

            let target = if increase {
                self.lower[var].clone()
            } else {
                self.upper[var].clone()
            };
            let Some(target) = target else {
                return false;
            };
            self.pivot_and_update(r, entering, target);
        }
    }

    /// Tightens `var >= bound`; `false` if the bounds became contradictory.
    pub fn tighten_lower(&mut self, var: usize, bound: BigInt) -> bool {
        let bound = BigRational::from_integer(bound);
        if self.lower[var].as_ref().is_some_and(|old| *old >= bound) {
            return true;
        }
        if self.upper[var].as_ref().is_some_and(|upper| *upper < bound) {
            return false;
        }
        if self.row_of[var].is_none() && self.value[var] < bound {
            self.update(var, bound.clone());
        }
        self.lower[var] = Some(bound);
        true
    }

    /// Tightens `var <= bound`; `false` if the bounds became contradictory.
    pub fn tighten_upper(&mut self, var: usize, bound: BigInt) -> bool {
        let bound = BigRational::from_integer(bound);
        if self.upper[var].as_ref().is_some_and(|old| *old <= bound) {
            return true;
        }
        if self.lower[var].as_ref().is_some_and(|lower| *lower > bound) {
            return false;
        }
        if self.row_of[var].is_none() && self.value[var] > bound {
            self.update(var, bound.clone());
        }
        self.upper[var] = Some(bound);
        true
    }

    /// First original variable with a non-integral value.
    pub fn first_fractional(&self) -> Option<(usize, BigRational)> {
        self.value[..self.originals]
            .iter()
            .enumerate()
            .find(|(_, value)| !value.is_integer())
            .map(|(var, value)| (var, value.clone()))
    }

    pub fn value(&self, var: usize) -> &BigRational {
        &self.value[var]
    }

    /// Values of the original variables; `None` if one exceeds `i64`.
    pub fn integer_model(&self) -> Option<Vec<i64>> {
        self.value[..self.originals]
            .iter()
            .map(|value| value.to_integer().to_i64())
            .collect()
    }
}
