//! 目标网类的性质集合: 纯、简单、k-有界、T-网、输出无分支、无冲突、可分布.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PnFlags: u8 {
        const PURE = 1 << 0;
        const PLAIN = 1 << 1;
        const TNET = 1 << 2;
        const OUTPUT_NONBRANCHING = 1 << 3;
        const CONFLICT_FREE = 1 << 4;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertyParseError {
    #[error("unknown net property `{0}`")]
    Unknown(String),
    #[error("invalid bound in `{0}`")]
    InvalidBound(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PnProperties {
    flags: PnFlags,
    k_bounded: Option<u64>,
    /// Event label to location; only present for distributable nets.
    locations: Option<BTreeMap<String, String>>,
}

impl PnProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `flags`. T-nets are output-nonbranching by definition.
    pub fn require(mut self, flags: PnFlags) -> Self {
        self.flags |= flags;
        if self.flags.contains(PnFlags::TNET) {
            self.flags |= PnFlags::OUTPUT_NONBRANCHING;
        }
        self
    }

    pub fn with_k_bounded(mut self, k: u64) -> Self {
        self.k_bounded = Some(self.k_bounded.map_or(k, |old| old.min(k)));
        self
    }

    pub fn with_locations(mut self, locations: BTreeMap<String, String>) -> Self {
        self.locations = Some(locations);
        self
    }

    pub fn flags(&self) -> PnFlags {
        self.flags
    }

    pub fn is_pure(&self) -> bool {
        self.flags.contains(PnFlags::PURE)
    }

    pub fn is_plain(&self) -> bool {
        self.flags.contains(PnFlags::PLAIN)
    }

    pub fn is_t_net(&self) -> bool {
        self.flags.contains(PnFlags::TNET)
    }

    pub fn is_output_nonbranching(&self) -> bool {
        self.flags.contains(PnFlags::OUTPUT_NONBRANCHING)
    }

    pub fn is_conflict_free(&self) -> bool {
        self.flags.contains(PnFlags::CONFLICT_FREE)
    }

    pub fn k_bounded(&self) -> Option<u64> {
        self.k_bounded
    }

    pub fn is_distributable(&self) -> bool {
        self.locations.is_some()
    }

    pub fn locations(&self) -> Option<&BTreeMap<String, String>> {
        self.locations.as_ref()
    }

    pub fn location_of(&self, event: &str) -> Option<&str> {
        self.locations
            .as_ref()
            .and_then(|locations| locations.get(event))
            .map(String::as_str)
    }

    /// Only flags, no bound and no location map.
    pub fn has_only_flags(&self) -> bool {
        self.k_bounded.is_none() && self.locations.is_none()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.flags.is_empty() && self.has_only_flags()
    }
}

impl FromStr for PnProperties {
    type Err = PropertyParseError;

    /// Parses a comma separated list such as `pure,plain,3-bounded`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut properties = PnProperties::new();
        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let lower = item.to_ascii_lowercase();
            properties = match lower.as_str() {
                "none" => properties,
                "pure" => properties.require(PnFlags::PURE),
                "plain" => properties.require(PnFlags::PLAIN),
                "tnet" | "t-net" => properties.require(PnFlags::TNET),
                "on" | "output-nonbranching" | "output_nonbranching" => {
                    properties.require(PnFlags::OUTPUT_NONBRANCHING)
                }
                "cf" | "conflict-free" | "conflict_free" => {
                    properties.require(PnFlags::CONFLICT_FREE)
                }
                "safe" => properties.with_k_bounded(1),
                other => {
                    let Some(bound) = other
                        .strip_suffix("-bounded")
                        .or_else(|| other.strip_suffix("bounded"))
                    else {
                        return Err(PropertyParseError::Unknown(item.to_string()));
                    };
                    let k = bound
                        .trim_end_matches('-')
                        .parse::<u64>()
                        .map_err(|_| PropertyParseError::InvalidBound(item.to_string()))?;
                    properties.with_k_bounded(k)
                }
            };
        }
        Ok(properties)
    }
}

impl fmt::Display for PnProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.is_pure() {
            parts.push("pure".to_string());
        }
        if self.is_plain() {
            parts.push("plain".to_string());
        }
        if let Some(k) = self.k_bounded {
            parts.push(format!("{}-bounded", k));
        }
        if self.is_t_net() {
            parts.push("tnet".to_string());
        } else if self.is_output_nonbranching() {
            parts.push("output-nonbranching".to_string());
        }
        if self.is_conflict_free() {
            parts.push("conflict-free".to_string());
        }
        if self.is_distributable() {
            parts.push("distributable".to_string());
        }
        if parts.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", parts.join(","))
        }
    }
}
