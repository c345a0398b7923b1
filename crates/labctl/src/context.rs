//! Shared context for lifecycle operations

use camino::Utf8PathBuf;
use color_eyre::{eyre::Context as _, Result};

use crate::libvirt::LibvirtOptions;
use crate::state;

/// Explicit container for everything a lifecycle operation needs
///
/// Passed to each operation instead of living in ambient globals; the
/// state snapshot on disk carries the VM set between invocations.
#[derive(Debug)]
pub struct LabContext {
    /// Absolute working directory all artifacts are generated into
    pub workdir: Utf8PathBuf,
    /// Path to the lab configuration file
    pub config_path: Utf8PathBuf,
    /// Path to the state snapshot
    pub state_path: Utf8PathBuf,
    /// Hypervisor connection options
    pub libvirt: LibvirtOptions,
}

impl LabContext {
    /// Build a context rooted at the current working directory
    pub fn new(config: Utf8PathBuf, connect: Option<String>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get working directory")?;
        let workdir = Utf8PathBuf::from_path_buf(cwd).map_err(|p| {
            color_eyre::eyre::eyre!("Working directory is not valid UTF-8: {}", p.display())
        })?;
        let config_path = if config.is_absolute() {
            config
        } else {
            workdir.join(config)
        };
        let state_path = workdir.join(state::STATE_FILE);
        Ok(Self {
            workdir,
            config_path,
            state_path,
            libvirt: LibvirtOptions { connect },
        })
    }
}

/// Hold the run until the operator has reviewed the scenario state
pub fn pause() {
    let _ = dialoguer::Input::<String>::new()
        .with_prompt("-- Press <ENTER> to continue")
        .allow_empty(true)
        .interact_text();
}
