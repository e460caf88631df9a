//! 每个 LTS 只计算一次的区域空间: 生成树、Parikh 向量、事件编号与区域基.
//!
//! 设生成树上到状态 `s` 的路径的 Parikh 向量为 `Ψ(s)`. 对每条弦
//! `s --e--> t` (不在生成树中的弧), 区域权重 `w` 必须满足
//! `w · (Ψ(s) + 1_e - Ψ(t)) = 0`, 即沿任意回路的标识变化为零.
//! 这些齐次方程的整数解格的基即为区域基.
use std::collections::{HashMap, HashSet, VecDeque};

use crate::cancel::CancellationToken;
use crate::linear::{EliminationError, EquationSystem};
use crate::lts::Lts;
use crate::net::ids::StateId;
use crate::net::index_vec::Idx;
use crate::region::Region;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeArc {
    pub source: StateId,
    pub event: usize,
    pub target: StateId,
}

#[derive(Debug)]
pub struct RegionUtility<'a> {
    lts: &'a Lts,
    events: Vec<String>,
    event_indices: HashMap<String, usize>,
    parikh: Vec<Option<Vec<i64>>>,
    reachable: Vec<StateId>,
    spanning_tree: Vec<TreeArc>,
    equations: EquationSystem,
    basis: Vec<Region>,
}

impl<'a> RegionUtility<'a> {
    pub fn new(lts: &'a Lts, cancel: &CancellationToken) -> Result<Self, EliminationError> {
        let events: Vec<String> = lts.alphabet().into_iter().map(str::to_string).collect();
        let event_indices: HashMap<String, usize> = events
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.clone(), idx))
            .collect();

        let mut parikh: Vec<Option<Vec<i64>>> = vec![None; lts.state_count()];
        let mut reachable = Vec::new();
        let mut spanning_tree = Vec::new();
        let mut tree_arcs = HashSet::new();
        let mut queue = VecDeque::new();

        parikh[lts.initial().index()] = Some(vec![0; events.len()]);
        queue.push_back(lts.initial());
        while let Some(state) = queue.pop_front() {
            reachable.push(state);
            for (position, arc) in lts.outgoing(state).enumerate() {
                if parikh[arc.target.index()].is_some() {
                    continue;
                }
                let event = event_indices[arc.label];
                let mut vector = parikh[state.index()].clone().unwrap_or_default();
                vector[event] += 1;
                parikh[arc.target.index()] = Some(vector);
                spanning_tree.push(TreeArc {
                    source: state,
                    event,
                    target: arc.target,
                });
                tree_arcs.insert((state, position));
                queue.push_back(arc.target);
            }
        }

        let mut equations = EquationSystem::new(events.len());
        for state in &reachable {
            for (position, arc) in lts.outgoing(*state).enumerate() {
                if tree_arcs.contains(&(*state, position)) {
                    continue;
                }
                let (Some(source), Some(target)) = (
                    parikh[state.index()].as_ref(),
                    parikh[arc.target.index()].as_ref(),
                ) else {
                    continue;
                };
                let mut equation: Vec<i64> = source
                    .iter()
                    .zip(target)
                    .map(|(s, t)| s - t)
                    .collect();
                equation[event_indices[arc.label]] += 1;
                if equation.iter().any(|value| *value != 0) {
                    equations.add_equation(equation);
                }
            }
        }

        let basis = equations
            .find_basis(cancel)?
            .into_iter()
            .map(|vector| Region::from_weights(&vector, 0))
            .collect::<Vec<_>>();

        log::debug!(
            "region space of `{}`: {} events, {} reachable states, {} chords, basis size {}",
            lts.name(),
            events.len(),
            reachable.len(),
            equations.len(),
            basis.len()
        );

        Ok(Self {
            lts,
            events,
            event_indices,
            parikh,
            reachable,
            spanning_tree,
            equations,
            basis,
        })
    }

    pub fn lts(&self) -> &'a Lts {
        self.lts
    }

    pub fn number_of_events(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn event_index(&self, label: &str) -> Option<usize> {
        self.event_indices.get(label).copied()
    }

    pub fn event_label(&self, event: usize) -> &str {
        &self.events[event]
    }

    pub fn parikh_vector(&self, state: StateId) -> Option<&[i64]> {
        self.parikh
            .get(state.index())
            .and_then(|vector| vector.as_deref())
    }

    pub fn is_reachable(&self, state: StateId) -> bool {
        self.parikh_vector(state).is_some()
    }

    /// Reachable states in breadth-first order.
    pub fn reachable_states(&self) -> &[StateId] {
        &self.reachable
    }

    pub fn spanning_tree(&self) -> &[TreeArc] {
        &self.spanning_tree
    }

    pub fn equations(&self) -> &EquationSystem {
        &self.equations
    }

    pub fn region_basis(&self) -> &[Region] {
        &self.basis
    }

    /// Reachable states at which `event` is enabled.
    pub fn states_enabling(&self, event: usize) -> Vec<StateId> {
        let label = self.event_label(event);
        self.reachable
            .iter()
            .copied()
            .filter(|state| self.lts.is_enabled(*state, label))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle() -> Lts {
        let mut lts = Lts::new("cycle", "s0");
        let s0 = lts.initial();
        let s1 = lts.add_state("s1");
        let s2 = lts.add_state("s2");
        lts.add_arc(s0, "a", s1);
        lts.add_arc(s1, "b", s2);
        lts.add_arc(s2, "c", s0);
        lts
    }

    #[test]
    fn parikh_vectors_follow_the_spanning_tree() {
        let lts = cycle();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        assert_eq!(utility.events(), ["a", "b", "c"]);
        assert_eq!(utility.spanning_tree().len(), 2);
        let s2 = lts.state_by_name("s2").unwrap();
        assert_eq!(utility.parikh_vector(s2), Some(&[1, 1, 0][..]));
    }

    #[test]
    fn basis_regions_are_cycle_neutral() {
        let lts = cycle();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        assert_eq!(utility.equations().len(), 1);
        assert_eq!(utility.region_basis().len(), 2);
        for region in utility.region_basis() {
            assert_eq!(region.evaluate_parikh_vector(&[1, 1, 1]), 0);
            assert_eq!(region.initial_marking(), 0);
        }
    }

    #[test]
    fn unreachable_part_is_ignored() {
        let mut lts = cycle();
        let island = lts.add_state("island");
        lts.add_arc(island, "d", island);
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        assert_eq!(utility.number_of_events(), 4);
        assert!(!utility.is_reachable(island));
        assert_eq!(utility.reachable_states().len(), 3);
        // `d` 只出现在不可达部分, 其方向不受约束.
        let d = utility.event_index("d").unwrap();
        assert!(utility.region_basis().iter().any(|r| r.weight(d) != 0));
    }

    #[test]
    fn cancelled_construction_fails() {
        let lts = cycle();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(RegionUtility::new(&lts, &cancel).is_err());
    }
}
