use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::separation::{PnFlags, PnProperties};
use crate::solver::SolverConfig;
use crate::synthesize::SynthesisConfig;

/// `[properties]` table: the net class to synthesize.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct PropertiesSection {
    #[serde(default)]
    pub pure: bool,
    #[serde(default)]
    pub plain: bool,
    #[serde(default)]
    pub tnet: bool,
    #[serde(default)]
    pub output_nonbranching: bool,
    #[serde(default)]
    pub conflict_free: bool,
    #[serde(default)]
    pub k_bounded: Option<u64>,
    /// Event label to location; present only for distributable nets.
    #[serde(default)]
    pub locations: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct SynthesisSection {
    #[serde(default)]
    pub quick_fail: bool,
    #[serde(default)]
    pub minimize: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct SynthConfig {
    #[serde(default)]
    pub properties: PropertiesSection,
    #[serde(default)]
    pub synthesis: SynthesisSection,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl SynthConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: SynthConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    pub fn properties(&self) -> PnProperties {
        let section = &self.properties;
        let flags = [
            (section.pure, PnFlags::PURE),
            (section.plain, PnFlags::PLAIN),
            (section.tnet, PnFlags::TNET),
            (section.output_nonbranching, PnFlags::OUTPUT_NONBRANCHING),
            (section.conflict_free, PnFlags::CONFLICT_FREE),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .fold(PnFlags::empty(), |acc, (_, flag)| acc | flag);

        let mut properties = PnProperties::new().require(flags);
        if let Some(k) = section.k_bounded {
            properties = properties.with_k_bounded(k);
        }
        if let Some(locations) = &section.locations {
            properties = properties.with_locations(locations.clone());
        }
        properties
    }

    pub fn synthesis(&self) -> SynthesisConfig {
        SynthesisConfig {
            quick_fail: self.synthesis.quick_fail,
            minimize: self.synthesis.minimize,
            solver: self.solver,
        }
    }
}
