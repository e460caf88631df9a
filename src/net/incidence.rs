//! 输入/输出弧权重的稠密矩阵, 行为库所, 列为迁移.
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};

type SmallRow<T> = SmallVec<[T; 4]>;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Incidence<T> {
    rows: IndexVec<PlaceId, SmallRow<T>>,
    cols: usize,
}

impl<T> Incidence<T>
where
    T: Clone,
{
    pub fn new(places: usize, transitions: usize, default: T) -> Self {
        let rows = (0..places)
            .map(|_| SmallRow::from_elem(default.clone(), transitions))
            .collect();
        Self {
            rows,
            cols: transitions,
        }
    }

    pub fn places(&self) -> usize {
        self.rows.len()
    }

    pub fn transitions(&self) -> usize {
        self.cols
    }

    pub fn push_place_with_default(&mut self, default: T) -> PlaceId {
        self.rows.push(SmallRow::from_elem(default, self.cols))
    }

    pub fn push_transition_with_default(&mut self, default: T) -> TransitionId {
        let next = self.cols;
        for row in self.rows.iter_mut() {
            row.push(default.clone());
        }
        self.cols += 1;
        TransitionId::from_usize(next)
    }

    pub fn set(&mut self, place: PlaceId, transition: TransitionId, value: T) {
        self.rows[place][transition.index()] = value;
    }

    pub fn get(&self, place: PlaceId, transition: TransitionId) -> &T {
        &self.rows[place][transition.index()]
    }

    pub fn get_mut(&mut self, place: PlaceId, transition: TransitionId) -> &mut T {
        &mut self.rows[place][transition.index()]
    }

    /// Entries of one transition column, keyed by place.
    pub fn column(&self, transition: TransitionId) -> impl Iterator<Item = (PlaceId, &T)> {
        self.rows
            .iter_enumerated()
            .map(move |(place, row)| (place, &row[transition.index()]))
    }

    pub fn rows(&self) -> &IndexVec<PlaceId, SmallRow<T>> {
        &self.rows
    }
}

impl<T> fmt::Debug for Incidence<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Incidence")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

impl Incidence<u64> {
    /// `self - other`, e.g. `post - pre` for the effect matrix.
    pub fn difference(&self, other: &Self) -> Incidence<i64> {
        assert_eq!(self.places(), other.places());
        assert_eq!(self.transitions(), other.transitions());
        let rows = self
            .rows
            .iter()
            .zip(other.rows.iter())
            .map(|(left, right)| {
                left.iter()
                    .zip(right.iter())
                    .map(|(l, r)| *l as i64 - *r as i64)
                    .collect::<SmallRow<_>>()
            })
            .collect();
        Incidence {
            rows,
            cols: self.cols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growing_keeps_the_matrix_rectangular() {
        let mut matrix = Incidence::new(1, 0, 0u64);
        let t0 = matrix.push_transition_with_default(0);
        let p1 = matrix.push_place_with_default(0);
        matrix.set(p1, t0, 2);
        assert_eq!(matrix.places(), 2);
        assert_eq!(matrix.transitions(), 1);
        assert_eq!(
            matrix.column(t0).map(|(_, w)| *w).collect::<Vec<_>>(),
            vec![0, 2]
        );
    }

    #[test]
    fn difference_is_signed() {
        let mut post = Incidence::new(1, 1, 0u64);
        let pre = {
            let mut pre = Incidence::new(1, 1, 0u64);
            pre.set(PlaceId::new(0), TransitionId::new(0), 3);
            pre
        };
        post.set(PlaceId::new(0), TransitionId::new(0), 1);
        assert_eq!(*post.difference(&pre).get(PlaceId::new(0), TransitionId::new(0)), -2);
    }
}
