//! Lab configuration file parsing for `lab.json`

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::{eyre::Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Default configuration file name within the working directory
pub const CONFIG_FILE: &str = "lab.json";

/// Lab configuration loaded from `lab.json`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LabConfig {
    /// Verbose logging (widens the default filter to debug)
    #[serde(default)]
    pub debug: bool,

    /// Number of web server VMs to build
    #[serde(default)]
    pub number_of_servers: u32,

    /// Directory holding the base image and domain template, copied into
    /// the working directory on `create` when they are absent
    #[serde(default)]
    pub assets_dir: Option<Utf8PathBuf>,

    /// Optional host preparation script run before `create`
    #[serde(default)]
    pub prepare_script: Option<Utf8PathBuf>,
}

impl LabConfig {
    /// Load the lab configuration
    ///
    /// Returns `None` if the config file doesn't exist; the caller decides
    /// whether that is fatal for its operation.
    pub fn load(path: &Utf8Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: LabConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(Some(config))
    }
}
