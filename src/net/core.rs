//! 运行时: 可发生集与发生语义, 以及 Graphviz 导出.
use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::incidence::Incidence;
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::{Marking, Place, Transition, Weight};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FireError {
    #[error("transition {0:?} is out of bounds")]
    OutOfBounds(TransitionId),
    #[error("transition {0:?} is not enabled under the supplied marking")]
    NotEnabled(TransitionId),
    #[error("token count overflows at place {0:?}")]
    Overflow(PlaceId),
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Net {
    #[serde(default)]
    pub name: String,
    pub places: IndexVec<PlaceId, Place>,
    pub transitions: IndexVec<TransitionId, Transition>,
    pub pre: Incidence<Weight>,
    pub post: Incidence<Weight>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("name", &self.name)
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("pre", &self.pre)
            .field("post", &self.post)
            .finish()
    }
}

impl Net {
    pub fn empty() -> Self {
        Self::named("")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            places: IndexVec::new(),
            transitions: IndexVec::new(),
            pre: Incidence::new(0, 0, 0),
            post: Incidence::new(0, 0, 0),
        }
    }

    pub fn add_place(&mut self, place: Place) -> PlaceId {
        let place_id = self.places.push(place);
        self.pre.push_place_with_default(0);
        self.post.push_place_with_default(0);
        place_id
    }

    pub fn add_transition(&mut self, transition: Transition) -> TransitionId {
        let transition_id = self.transitions.push(transition);
        self.pre.push_transition_with_default(0);
        self.post.push_transition_with_default(0);
        transition_id
    }

    /// 输入弧: place -> transition
    pub fn set_input_weight(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        self.pre.set(place, transition, weight);
    }

    /// 输出弧: transition -> place
    pub fn set_output_weight(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        self.post.set(place, transition, weight);
    }

    pub fn get_place(&self, place: PlaceId) -> Option<&Place> {
        self.places.get(place)
    }

    pub fn get_transition(&self, transition: TransitionId) -> Option<&Transition> {
        self.transitions.get(transition)
    }

    pub fn transition_by_name(&self, name: &str) -> Option<TransitionId> {
        self.transitions
            .iter_enumerated()
            .find(|(_, transition)| transition.name == name)
            .map(|(id, _)| id)
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn initial_marking(&self) -> Marking {
        Marking::new(self.places.iter().map(|p| p.tokens).collect())
    }

    /// Effect matrix `post - pre`.
    pub fn c_matrix(&self) -> Incidence<i64> {
        self.post.difference(&self.pre)
    }

    /// No place is both input and output of the same transition.
    pub fn is_pure(&self) -> bool {
        self.transitions.indices().all(|transition| {
            self.pre
                .column(transition)
                .zip(self.post.column(transition))
                .all(|((_, pre), (_, post))| *pre == 0 || *post == 0)
        })
    }

    /// Every arc has weight one.
    pub fn is_plain(&self) -> bool {
        self.pre
            .rows()
            .iter()
            .chain(self.post.rows().iter())
            .all(|row| row.iter().all(|weight| *weight <= 1))
    }

    pub fn enabled_transitions(&self, marking: &Marking) -> Vec<TransitionId> {
        self.transitions
            .indices()
            .filter(|transition| self.is_transition_enabled(*transition, marking))
            .collect()
    }

    pub fn fire_transition(
        &self,
        marking: &Marking,
        transition: TransitionId,
    ) -> Result<Marking, FireError> {
        if transition.index() >= self.transitions_len() {
            return Err(FireError::OutOfBounds(transition));
        }
        if !self.is_transition_enabled(transition, marking) {
            return Err(FireError::NotEnabled(transition));
        }

        let mut next = marking.clone();
        for (place, weight) in self.pre.column(transition) {
            // Enabledness guarantees enough tokens.
            *next.tokens_mut(place) -= *weight;
        }
        for (place, weight) in self.post.column(transition) {
            let tokens = next.tokens_mut(place);
            *tokens = tokens
                .checked_add(*weight)
                .ok_or(FireError::Overflow(place))?;
        }
        Ok(next)
    }

    fn is_transition_enabled(&self, transition: TransitionId, marking: &Marking) -> bool {
        transition.index() < self.transitions_len()
            && self
                .pre
                .column(transition)
                .all(|(place, weight)| marking.tokens(place) >= *weight)
    }

    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph \"{}\" {{", escape_label(&self.name));
        let _ = writeln!(&mut dot, "    rankdir=LR;");
        let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");

        for (place_id, place) in self.places.iter_enumerated() {
            let _ = writeln!(
                &mut dot,
                "    place_{} [label=\"{}\\n{}\", shape=circle, style=filled, fillcolor=\"#e3f2fd\"];",
                place_id.index(),
                escape_label(&place.name),
                place.tokens
            );
        }

        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let _ = writeln!(
                &mut dot,
                "    trans_{} [label=\"{}\", shape=box, style=filled, fillcolor=\"#ffe0b2\"];",
                transition_id.index(),
                escape_label(&transition.name)
            );
        }

        for (place_id, row) in self.pre.rows().iter_enumerated() {
            for (idx, weight) in row.iter().enumerate() {
                write_arc(
                    &mut dot,
                    &format!("place_{}", place_id.index()),
                    &format!("trans_{}", idx),
                    *weight,
                );
            }
        }
        for (place_id, row) in self.post.rows().iter_enumerated() {
            for (idx, weight) in row.iter().enumerate() {
                write_arc(
                    &mut dot,
                    &format!("trans_{}", idx),
                    &format!("place_{}", place_id.index()),
                    *weight,
                );
            }
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot())
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::empty()
    }
}

fn write_arc(dot: &mut String, from: &str, to: &str, weight: Weight) {
    match weight {
        0 => {}
        1 => {
            let _ = writeln!(dot, "    {} -> {};", from, to);
        }
        _ => {
            let _ = writeln!(dot, "    {} -> {} [label=\"{}\"];", from, to, weight);
        }
    }
}

pub(crate) fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
