//! Helper functions for interacting with qemu-img

use camino::Utf8Path;
use color_eyre::{eyre::Context, Result};
use std::process::Command;

/// Base disk image every lab VM overlays
pub const BASE_IMAGE: &str = "lab-base.qcow2";

/// Create a copy-on-write overlay image backed by `base`
///
/// The overlay stores only the per-VM diffs; the backing file stays
/// read-only and shared by every VM in the lab.
pub fn create_overlay(base: &Utf8Path, output: &Utf8Path) -> Result<()> {
    let result = Command::new("qemu-img")
        .args([
            "create",
            "-F",
            "qcow2",
            "-f",
            "qcow2",
            "-b",
            base.as_str(),
            output.as_str(),
        ])
        .output()
        .with_context(|| format!("Failed to run qemu-img create for {:?}", output))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(color_eyre::eyre::eyre!(
            "qemu-img create failed for {:?}: {}",
            output,
            stderr
        ));
    }

    tracing::debug!("created overlay {output} backed by {base}");
    Ok(())
}
