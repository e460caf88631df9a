//! 有限带标签迁移系统 (LTS): 综合的输入, 构造后只读.
//!
//! 状态以 [`StateId`] 访问, 内部存储为 `petgraph` 有向图, 节点下标与
//! `StateId` 一一对应. 同一事件标签可以出现在多条弧上.
pub mod description;

use std::collections::{BTreeSet, VecDeque};

use indexmap::IndexMap;
use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::net::ids::StateId;
use crate::net::index_vec::Idx;

pub use description::{ArcDescription, LtsDescription, LtsError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateData {
    pub name: String,
}

/// One labelled arc `source --label--> target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LtsArc<'a> {
    pub source: StateId,
    pub label: &'a str,
    pub target: StateId,
}

#[derive(Debug, Clone)]
pub struct Lts {
    name: String,
    graph: DiGraph<StateData, String>,
    names: IndexMap<String, StateId>,
    initial: StateId,
}

fn node(state: StateId) -> NodeIndex {
    NodeIndex::new(state.index())
}

fn state_of(index: NodeIndex) -> StateId {
    StateId::from_usize(index.index())
}

impl Lts {
    /// Creates an LTS containing only its initial state.
    pub fn new(name: impl Into<String>, initial: impl Into<String>) -> Self {
        let mut lts = Self {
            name: name.into(),
            graph: DiGraph::new(),
            names: IndexMap::new(),
            initial: StateId::new(0),
        };
        lts.initial = lts.add_state(initial);
        lts
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a state, or returns the existing one with that name.
    pub fn add_state(&mut self, name: impl Into<String>) -> StateId {
        let name = name.into();
        if let Some(existing) = self.names.get(&name) {
            return *existing;
        }
        let state = state_of(self.graph.add_node(StateData { name: name.clone() }));
        self.names.insert(name, state);
        state
    }

    pub fn add_arc(&mut self, source: StateId, label: impl Into<String>, target: StateId) {
        assert!(source.index() < self.state_count(), "unknown state {:?}", source);
        assert!(target.index() < self.state_count(), "unknown state {:?}", target);
        self.graph.add_edge(node(source), node(target), label.into());
    }

    pub fn initial(&self) -> StateId {
        self.initial
    }

    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn arc_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.graph.node_indices().map(state_of)
    }

    pub fn state_name(&self, state: StateId) -> &str {
        &self.graph[node(state)].name
    }

    pub fn state_by_name(&self, name: &str) -> Option<StateId> {
        self.names.get(name).copied()
    }

    pub fn arcs(&self) -> impl Iterator<Item = LtsArc<'_>> + '_ {
        self.graph.edge_references().map(|edge| LtsArc {
            source: state_of(edge.source()),
            label: edge.weight().as_str(),
            target: state_of(edge.target()),
        })
    }

    /// Outgoing arcs of `state` in insertion order.
    pub fn outgoing(&self, state: StateId) -> impl Iterator<Item = LtsArc<'_>> + '_ {
        let mut arcs: Vec<_> = self
            .graph
            .edges_directed(node(state), Direction::Outgoing)
            .map(|edge| {
                (
                    edge.id(),
                    LtsArc {
                        source: state,
                        label: edge.weight().as_str(),
                        target: state_of(edge.target()),
                    },
                )
            })
            .collect();
        arcs.sort_by_key(|(id, _)| *id);
        arcs.into_iter().map(|(_, arc)| arc)
    }

    pub fn successor(&self, state: StateId, label: &str) -> Option<StateId> {
        self.outgoing(state)
            .find(|arc| arc.label == label)
            .map(|arc| arc.target)
    }

    pub fn is_enabled(&self, state: StateId, label: &str) -> bool {
        self.successor(state, label).is_some()
    }

    pub fn enabled_events(&self, state: StateId) -> BTreeSet<&str> {
        self.outgoing(state).map(|arc| arc.label).collect()
    }

    /// Sorted set of distinct arc labels.
    pub fn alphabet(&self) -> BTreeSet<&str> {
        self.graph.edge_weights().map(String::as_str).collect()
    }

    /// States reachable from the initial state, in breadth-first order.
    pub fn reachable_states(&self) -> Vec<StateId> {
        let mut seen = vec![false; self.state_count()];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([self.initial]);
        seen[self.initial.index()] = true;
        while let Some(state) = queue.pop_front() {
            order.push(state);
            for arc in self.outgoing(state) {
                if !seen[arc.target.index()] {
                    seen[arc.target.index()] = true;
                    queue.push_back(arc.target);
                }
            }
        }
        order
    }

    /// Path search from the initial state that stops at `state`.
    pub fn is_reachable(&self, state: StateId) -> bool {
        state.index() < self.state_count()
            && has_path_connecting(&self.graph, node(self.initial), node(state), None)
    }
}
