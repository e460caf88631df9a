//! 区域: 候选库所, 以每个事件的前向/后向权重和初始标识表示.
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::ids::StateId;
use crate::region::RegionUtility;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("state {0} is not reachable from the initial state")]
pub struct UnreachableError(pub StateId);

/// `weight(e) = forward(e) - backward(e)`; both vectors are non-negative.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    forward: Vec<i64>,
    backward: Vec<i64>,
    initial_marking: i64,
}

impl Region {
    pub fn new(forward: Vec<i64>, backward: Vec<i64>, initial_marking: i64) -> Self {
        assert_eq!(
            forward.len(),
            backward.len(),
            "forward and backward weights differ in length"
        );
        assert!(
            forward.iter().chain(backward.iter()).all(|w| *w >= 0),
            "arc weights must be non-negative"
        );
        Self {
            forward,
            backward,
            initial_marking,
        }
    }

    /// Splits signed weights into a pure forward/backward pair.
    pub fn from_weights(weights: &[i64], initial_marking: i64) -> Self {
        let forward = weights.iter().map(|w| (*w).max(0)).collect();
        let backward = weights.iter().map(|w| (-*w).max(0)).collect();
        Self::new(forward, backward, initial_marking)
    }

    pub fn create_trivial_region(events: usize) -> Self {
        Self::new(vec![0; events], vec![0; events], 0)
    }

    pub fn create_unit_region(events: usize, event: usize) -> Self {
        let mut forward = vec![0; events];
        forward[event] = 1;
        Self::new(forward, vec![0; events], 0)
    }

    pub fn number_of_events(&self) -> usize {
        self.forward.len()
    }

    pub fn forward_weight(&self, event: usize) -> i64 {
        self.forward[event]
    }

    pub fn backward_weight(&self, event: usize) -> i64 {
        self.backward[event]
    }

    pub fn weight(&self, event: usize) -> i64 {
        self.forward[event] - self.backward[event]
    }

    pub fn weights(&self) -> Vec<i64> {
        (0..self.number_of_events()).map(|e| self.weight(e)).collect()
    }

    pub fn initial_marking(&self) -> i64 {
        self.initial_marking
    }

    /// Marking change along a path with the given Parikh vector.
    pub fn evaluate_parikh_vector(&self, parikh: &[i64]) -> i64 {
        assert_eq!(parikh.len(), self.number_of_events());
        parikh
            .iter()
            .enumerate()
            .map(|(event, count)| self.weight(event) * count)
            .sum()
    }

    pub fn marking_for_state(
        &self,
        utility: &RegionUtility<'_>,
        state: StateId,
    ) -> Result<i64, UnreachableError> {
        let parikh = utility
            .parikh_vector(state)
            .ok_or(UnreachableError(state))?;
        Ok(self.initial_marking + self.evaluate_parikh_vector(parikh))
    }

    /// `self + factor * other`. A negative factor adds the mirrored region so
    /// the result keeps non-negative arc weights.
    pub fn add_region_with_factor(&self, other: &Region, factor: i64) -> Region {
        assert_eq!(self.number_of_events(), other.number_of_events());
        let (other_forward, other_backward) = if factor >= 0 {
            (&other.forward, &other.backward)
        } else {
            (&other.backward, &other.forward)
        };
        let scale = factor.abs();
        let forward = self
            .forward
            .iter()
            .zip(other_forward)
            .map(|(a, b)| a + scale * b)
            .collect();
        let backward = self
            .backward
            .iter()
            .zip(other_backward)
            .map(|(a, b)| a + scale * b)
            .collect();
        Region::new(
            forward,
            backward,
            self.initial_marking + factor * other.initial_marking,
        )
    }

    pub fn add_region(&self, other: &Region) -> Region {
        self.add_region_with_factor(other, 1)
    }

    /// Removes every side condition; idempotent.
    pub fn make_pure(&self) -> Region {
        Region::from_weights(&self.weights(), self.initial_marking)
    }

    pub fn is_pure(&self) -> bool {
        self.forward
            .iter()
            .zip(&self.backward)
            .all(|(f, b)| (*f).min(*b) == 0)
    }

    pub fn with_initial_marking(&self, initial_marking: i64) -> Region {
        Region {
            initial_marking,
            ..self.clone()
        }
    }

    /// Adds `amount` to both weights of `event` (a self-loop).
    pub fn with_self_loop(&self, event: usize, amount: i64) -> Region {
        let mut region = self.clone();
        region.forward[event] += amount;
        region.backward[event] += amount;
        Region::new(region.forward, region.backward, region.initial_marking)
    }

    /// Smallest initial marking for which every reachable marking is
    /// non-negative and every reachable arc stays enabled.
    pub fn normal_region_marking(&self, utility: &RegionUtility<'_>) -> i64 {
        let mut required = 0;
        for state in utility.reachable_states() {
            let Some(parikh) = utility.parikh_vector(*state) else {
                continue;
            };
            let change = self.evaluate_parikh_vector(parikh);
            required = required.max(-change);
            for arc in utility.lts().outgoing(*state) {
                if let Some(event) = utility.event_index(arc.label) {
                    required = required.max(self.backward[event] - change);
                }
            }
        }
        required
    }

    pub fn with_normal_region_marking(&self, utility: &RegionUtility<'_>) -> Region {
        self.with_initial_marking(self.normal_region_marking(utility))
    }

    /// Whether the region is a valid place for the LTS.
    pub fn is_valid_for(&self, utility: &RegionUtility<'_>) -> bool {
        utility.reachable_states().iter().all(|state| {
            let Ok(marking) = self.marking_for_state(utility, *state) else {
                return false;
            };
            marking >= 0
                && utility.lts().outgoing(*state).all(|arc| {
                    utility
                        .event_index(arc.label)
                        .is_none_or(|event| self.backward[event] <= marking)
                })
        })
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ init={}", self.initial_marking)?;
        for event in 0..self.number_of_events() {
            if self.forward[event] != 0 || self.backward[event] != 0 {
                write!(
                    f,
                    ", {}:e{}:{}",
                    self.backward[event], event, self.forward[event]
                )?;
            }
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::lts::Lts;

    fn chain() -> Lts {
        let mut lts = Lts::new("chain", "s0");
        let s0 = lts.initial();
        let s1 = lts.add_state("s1");
        let s2 = lts.add_state("s2");
        lts.add_arc(s0, "a", s1);
        lts.add_arc(s1, "a", s2);
        lts
    }

    #[test]
    fn make_pure_is_idempotent() {
        let region = Region::new(vec![3, 0, 2], vec![1, 4, 2], 5);
        let pure = region.make_pure();
        assert!(pure.is_pure());
        assert_eq!(pure.weights(), region.weights());
        assert_eq!(pure.make_pure(), pure);
        for event in 0..pure.number_of_events() {
            assert_eq!(pure.forward_weight(event).min(pure.backward_weight(event)), 0);
        }
    }

    #[test]
    fn negative_factor_mirrors_weights() {
        let base = Region::create_trivial_region(2);
        let unit = Region::create_unit_region(2, 1);
        let sum = base.add_region_with_factor(&unit, -3);
        assert_eq!(sum.backward_weight(1), 3);
        assert_eq!(sum.forward_weight(1), 0);
        assert_eq!(sum.weight(1), -3);
    }

    #[test]
    fn normal_marking_shifts_to_zero_minimum() {
        let lts = chain();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let consumer = Region::from_weights(&[-1], 0);
        assert_eq!(consumer.normal_region_marking(&utility), 2);
        let normal = consumer.with_normal_region_marking(&utility);
        assert!(normal.is_valid_for(&utility));
        let last = lts.state_by_name("s2").unwrap();
        assert_eq!(normal.marking_for_state(&utility, last), Ok(0));

        let producer = Region::from_weights(&[1], 0);
        assert_eq!(producer.normal_region_marking(&utility), 0);
    }

    #[test]
    fn self_loops_raise_the_normal_marking() {
        let lts = chain();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let region = Region::from_weights(&[1], 0).with_self_loop(0, 2);
        assert_eq!(region.normal_region_marking(&utility), 2);
    }

    #[test]
    fn unreachable_state_cannot_be_evaluated() {
        let mut lts = chain();
        let island = lts.add_state("island");
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let region = Region::create_unit_region(1, 0);
        assert_eq!(
            region.marking_for_state(&utility, island),
            Err(UnreachableError(island))
        );
    }
}
