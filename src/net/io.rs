//! I/O 支持: JSON 与 RON 序列化接口.
use std::fs;
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron error: {0}")]
    RonSpanned(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported file extension `{0}`")]
    UnsupportedFormat(String),
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(serde_json::from_str(s)?)
}

pub fn to_ron_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    Ok(ron::ser::to_string_pretty(value, PrettyConfig::default())?)
}

pub fn from_ron_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(ron::from_str(s)?)
}

/// Reads JSON or RON, chosen by the file extension.
pub fn read_file<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    match extension(path).as_str() {
        "json" => from_json_str(&content),
        "ron" => from_ron_str(&content),
        other => Err(IoError::UnsupportedFormat(other.to_string())),
    }
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    fs::write(path, to_json_string(value)?)?;
    Ok(())
}

pub fn write_ron<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    fs::write(path, to_ron_string(value)?)?;
    Ok(())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lts::{Lts, LtsDescription};
    use crate::net::{Net, Place, Transition};

    #[test]
    fn nets_survive_json_and_ron() {
        let mut net = Net::named("n");
        let p = net.add_place(Place::new("p0", 2));
        let t = net.add_transition(Transition::new("a"));
        net.set_input_weight(p, t, 1);

        let json: Net = from_json_str(&to_json_string(&net).unwrap()).unwrap();
        let ron: Net = from_ron_str(&to_ron_string(&net).unwrap()).unwrap();
        for copy in [json, ron] {
            assert_eq!(copy.name, "n");
            assert_eq!(copy.places, net.places);
            assert_eq!(copy.pre, net.pre);
        }
    }

    #[test]
    fn reads_lts_descriptions_by_extension() {
        let dir = std::env::temp_dir().join(format!("pn-synth-io-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let description = {
            let mut lts = Lts::new("step", "s0");
            let s1 = lts.add_state("s1");
            lts.add_arc(lts.initial(), "a", s1);
            lts.to_description()
        };
        write_ron(dir.join("step.ron"), &description).unwrap();
        write_json(dir.join("step.json"), &description).unwrap();
        let from_ron: LtsDescription = read_file(dir.join("step.ron")).unwrap();
        let from_json: LtsDescription = read_file(dir.join("step.json")).unwrap();
        assert_eq!(from_ron, description);
        assert_eq!(from_json, description);

        fs::write(dir.join("step.txt"), "").unwrap();
        let unsupported = read_file::<_, LtsDescription>(dir.join("step.txt"));
        assert!(matches!(unsupported, Err(IoError::UnsupportedFormat(ext)) if ext == "txt"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
