//! `labctl destroy` - tear down VMs, networks, and generated artifacts
//!
//! Force-stops and unregisters every known VM, deletes both OVS bridges,
//! sweeps the working directory of generated files, and removes the state
//! snapshot. Every step is best-effort; failures are logged and the
//! teardown continues.

use camino::Utf8Path;
use color_eyre::{eyre::Context as _, Result};
use std::fs;
use tracing::{error, info, warn};

use crate::context::{pause, LabContext};
use crate::state::LabState;
use crate::{network, provision};

/// Run the destroy command
pub fn run(ctx: &LabContext) -> Result<()> {
    let Some(state) = LabState::load(&ctx.state_path)? else {
        warn!(
            "no lab state found at {}; nothing to destroy",
            ctx.state_path
        );
        return Ok(());
    };

    info!("destroying {} lab VMs", state.len());
    for name in state.ordered_names() {
        if let Err(e) = ctx.libvirt.destroy_domain(name) {
            error!("failed to force-stop VM {name}: {e:#}");
        }
        match ctx.libvirt.undefine(name) {
            Ok(()) => info!("VM {name} unregistered"),
            Err(e) => error!("failed to unregister VM {name}: {e:#}"),
        }
    }

    for net in network::LAB_NETWORKS {
        if let Err(e) = net.destroy() {
            error!("failed to delete network {}: {e:#}", net.name);
        }
    }

    if let Err(e) = sweep_artifacts(&ctx.workdir) {
        error!("artifact cleanup failed: {e:#}");
    }

    LabState::clear(&ctx.state_path)?;
    info!("lab scenario released");

    pause();
    Ok(())
}

/// Remove every generated artifact from the working directory
///
/// Artifacts are `*.qcow2` (including the base image), `*.xml` (including
/// the template), and the `tmp_configs` staging tree. Anything else is
/// left alone. Individual removal failures are logged and the sweep
/// continues.
pub fn sweep_artifacts(dir: &Utf8Path) -> Result<()> {
    for entry in dir
        .read_dir_utf8()
        .with_context(|| format!("Failed to read working directory {}", dir))?
    {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", dir))?;
        let name = entry.file_name();
        let is_artifact = name.ends_with(".qcow2")
            || name.ends_with(".xml")
            || name.starts_with(provision::CONFIG_DIR);
        if !is_artifact {
            continue;
        }

        let path = entry.path();
        let removed = if entry
            .file_type()
            .with_context(|| format!("Failed to stat {}", path))?
            .is_dir()
        {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };

        match removed {
            Ok(()) => info!("removed {path}"),
            Err(e) => error!("could not remove {path}: {e}"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn test_sweep_removes_only_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        for file in ["s1.qcow2", "lab-base.qcow2", "s1.xml", "vm-template.xml"] {
            fs::write(root.join(file), "x").unwrap();
        }
        fs::create_dir_all(root.join("tmp_configs/s1")).unwrap();
        fs::write(root.join("tmp_configs/s1/hostname"), "s1").unwrap();
        fs::write(root.join("lab.json"), "{}").unwrap();
        fs::write(root.join("lab-state.json"), "{}").unwrap();
        fs::write(root.join("notes.txt"), "keep me").unwrap();

        sweep_artifacts(&root).unwrap();

        let mut remaining: Vec<String> = root
            .read_dir_utf8()
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string())
            .collect();
        remaining.sort();
        assert_eq!(remaining, vec!["lab-state.json", "lab.json", "notes.txt"]);
    }

    #[test]
    fn test_sweep_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        sweep_artifacts(&root).unwrap();
    }
}
