//! 可达图构造: 从初始标识出发广度优先发射迁移, 结果表示为 LTS,
//! 状态名为标识本身, 弧标签为迁移名.
use std::collections::VecDeque;

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::lts::Lts;
use crate::net::ids::StateId;
use crate::net::{Marking, Net};

#[derive(Debug, Clone, Default)]
pub struct ReachabilityConfig {
    /// 最多探索的状态数量. None 表示不设上限.
    pub state_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachabilityStats {
    pub state_count: usize,
    pub edge_count: usize,
    pub deadlock_count: usize,
    pub truncated: bool,
}

#[derive(Debug)]
pub struct ReachabilityGraph {
    pub lts: Lts,
    pub markings: IndexMap<Marking, StateId>,
    pub deadlocks: Vec<StateId>,
    pub truncated: bool,
}

impl ReachabilityGraph {
    pub fn stats(&self) -> ReachabilityStats {
        ReachabilityStats {
            state_count: self.lts.state_count(),
            edge_count: self.lts.arc_count(),
            deadlock_count: self.deadlocks.len(),
            truncated: self.truncated,
        }
    }

    pub fn state_of(&self, marking: &Marking) -> Option<StateId> {
        self.markings.get(marking).copied()
    }

    pub fn marking(&self, state: StateId) -> Option<&Marking> {
        self.markings
            .iter()
            .find(|(_, id)| **id == state)
            .map(|(marking, _)| marking)
    }
}

pub fn reachability_lts(net: &Net, config: &ReachabilityConfig) -> ReachabilityGraph {
    let initial_marking = net.initial_marking();
    let mut lts = Lts::new(net.name.clone(), initial_marking.to_string());
    let mut markings = IndexMap::new();
    let mut queue = VecDeque::new();
    let mut deadlocks = Vec::new();
    let mut truncated = false;

    markings.insert(initial_marking.clone(), lts.initial());
    queue.push_back((lts.initial(), initial_marking));

    while let Some((state, current)) = queue.pop_front() {
        let enabled = net.enabled_transitions(&current);
        if enabled.is_empty() {
            deadlocks.push(state);
            continue;
        }
        for transition in enabled {
            let next = match net.fire_transition(&current, transition) {
                Ok(next) => next,
                Err(err) => {
                    log::warn!("skipping {} at {}: {}", transition, current, err);
                    continue;
                }
            };
            let target = match markings.entry(next.clone()) {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(entry) => {
                    if config
                        .state_limit
                        .is_some_and(|limit| lts.state_count() >= limit)
                    {
                        truncated = true;
                        continue;
                    }
                    let target = lts.add_state(next.to_string());
                    entry.insert(target);
                    queue.push_back((target, next));
                    target
                }
            };
            lts.add_arc(state, net.transitions[transition].name.clone(), target);
        }
    }

    if truncated {
        log::warn!(
            "reachability graph of `{}` truncated at {} states",
            net.name,
            lts.state_count()
        );
    }
    ReachabilityGraph {
        lts,
        markings,
        deadlocks,
        truncated,
    }
}
