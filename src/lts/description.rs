//! LTS 的可序列化描述 (JSON/RON), 状态与事件均以名称引用.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lts::Lts;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LtsError {
    #[error("arc or initial marker references unknown state `{0}`")]
    UnknownState(String),
    #[error("state `{0}` is declared twice")]
    DuplicateState(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcDescription {
    pub source: String,
    pub label: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LtsDescription {
    #[serde(default)]
    pub name: String,
    pub initial: String,
    pub states: Vec<String>,
    #[serde(default)]
    pub arcs: Vec<ArcDescription>,
}

impl Lts {
    pub fn from_description(description: &LtsDescription) -> Result<Self, LtsError> {
        let mut seen = BTreeSet::new();
        for state in &description.states {
            if !seen.insert(state.as_str()) {
                return Err(LtsError::DuplicateState(state.clone()));
            }
        }
        if !seen.contains(description.initial.as_str()) {
            return Err(LtsError::UnknownState(description.initial.clone()));
        }

        let mut lts = Lts::new(description.name.clone(), description.initial.clone());
        for state in &description.states {
            lts.add_state(state.clone());
        }
        for arc in &description.arcs {
            let source = lts
                .state_by_name(&arc.source)
                .ok_or_else(|| LtsError::UnknownState(arc.source.clone()))?;
            let target = lts
                .state_by_name(&arc.target)
                .ok_or_else(|| LtsError::UnknownState(arc.target.clone()))?;
            lts.add_arc(source, arc.label.clone(), target);
        }
        Ok(lts)
    }

    pub fn to_description(&self) -> LtsDescription {
        LtsDescription {
            name: self.name().to_string(),
            initial: self.state_name(self.initial()).to_string(),
            states: self
                .states()
                .map(|state| self.state_name(state).to_string())
                .collect(),
            arcs: self
                .arcs()
                .map(|arc| ArcDescription {
                    source: self.state_name(arc.source).to_string(),
                    label: arc.label.to_string(),
                    target: self.state_name(arc.target).to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description() -> LtsDescription {
        LtsDescription {
            name: "mutex".into(),
            initial: "idle".into(),
            states: vec!["busy".into(), "idle".into()],
            arcs: vec![
                ArcDescription {
                    source: "idle".into(),
                    label: "enter".into(),
                    target: "busy".into(),
                },
                ArcDescription {
                    source: "busy".into(),
                    label: "leave".into(),
                    target: "idle".into(),
                },
            ],
        }
    }

    #[test]
    fn builds_lts_with_named_initial_state() {
        let lts = Lts::from_description(&description()).unwrap();
        assert_eq!(lts.state_name(lts.initial()), "idle");
        assert_eq!(lts.state_count(), 2);
        assert_eq!(lts.arc_count(), 2);
        let back = lts.to_description();
        assert_eq!(back.initial, "idle");
        assert_eq!(back.arcs.len(), 2);
    }

    #[test]
    fn rejects_unknown_and_duplicate_states() {
        let mut unknown = description();
        unknown.arcs[0].target = "nowhere".into();
        assert_eq!(
            Lts::from_description(&unknown).unwrap_err(),
            LtsError::UnknownState("nowhere".into())
        );

        let mut duplicate = description();
        duplicate.states.push("busy".into());
        assert_eq!(
            Lts::from_description(&duplicate).unwrap_err(),
            LtsError::DuplicateState("busy".into())
        );
    }

    #[test]
    fn parses_json() {
        let json = r#"{
            "initial": "s0",
            "states": ["s0", "s1"],
            "arcs": [{"source": "s0", "label": "a", "target": "s1"}]
        }"#;
        let description: LtsDescription = serde_json::from_str(json).unwrap();
        let lts = Lts::from_description(&description).unwrap();
        assert_eq!(lts.arc_count(), 1);
        assert_eq!(lts.name(), "");
    }
}
