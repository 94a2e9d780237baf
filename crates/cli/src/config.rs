//! Probe configuration file.

use std::path::Path;

use anyhow::Context;
use json_client::JsonConfig;
use receive::ReceiveConfig;
use serde::Deserialize;

/// Contents of the `--config` JSON file. Both sections are optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub receive: ReceiveConfig,
    pub json: JsonConfig,
}

impl ProbeConfig {
    /// Loads the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}
