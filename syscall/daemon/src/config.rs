//! Per-process tracing config file
//!
//! ```json
//! {"processes": [{"tgid": 100, "enabled": true, "listen_port": 8080}]}
//! ```
//!
//! Omitted flags take their defaults (everything off, port unset).

use anyhow::{bail, Context, Result};
use hijack_common::TracingConfig;
use hijack_probe::maps::ConfigMap;
use log::{debug, info};
use serde::Deserialize;
use std::{collections::HashSet, fs, path::Path};

/// One entry of the config file
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfig {
    pub tgid: u32,
    #[serde(flatten)]
    pub config: TracingConfig,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub processes: Vec<ProcessConfig>,
}

impl ConfigFile {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&data).with_context(|| format!("Invalid config file: {:?}", path))
    }

    pub fn parse(data: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(data).context("Failed to parse config JSON")?;

        let mut seen = HashSet::new();
        for process in &file.processes {
            if !seen.insert(process.tgid) {
                bail!("tgid {} is configured more than once", process.tgid);
            }
        }

        Ok(file)
    }

    /// Install every entry into the probe's config store
    pub fn apply(&self, configs: &ConfigMap) {
        for process in &self.processes {
            debug!("Config for tgid {}: {:?}", process.tgid, process.config);
            configs.insert(process.tgid, process.config);
        }
        info!("Loaded tracing config for {} processes", self.processes.len());
    }
}
