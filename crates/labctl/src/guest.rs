//! Wrappers around the libguestfs file-injection tools
//!
//! Guest images are configured offline: files are copied into the image
//! with `virt-copy-in`, edited in place with `virt-edit`, and read back
//! with `virt-cat`. Each call blocks until the external tool exits.

use camino::Utf8Path;
use color_eyre::{eyre::Context, Result};
use std::process::Command;

/// Copy a local file into a directory inside the guest image
pub fn copy_in(image: &Utf8Path, local: &Utf8Path, guest_dir: &str) -> Result<()> {
    let output = Command::new("virt-copy-in")
        .args(["-a", image.as_str(), local.as_str(), guest_dir])
        .output()
        .with_context(|| format!("Failed to run virt-copy-in for {:?}", image))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(color_eyre::eyre::eyre!(
            "virt-copy-in of {} into {}:{} failed: {}",
            local,
            image,
            guest_dir,
            stderr
        ));
    }

    Ok(())
}

/// Apply an in-place sed-style expression to a file inside the guest image
pub fn edit(image: &Utf8Path, guest_path: &str, expr: &str) -> Result<()> {
    let output = Command::new("virt-edit")
        .args(["-a", image.as_str(), guest_path, "-e", expr])
        .output()
        .with_context(|| format!("Failed to run virt-edit for {:?}", image))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(color_eyre::eyre::eyre!(
            "virt-edit of {}:{} failed: {}",
            image,
            guest_path,
            stderr
        ));
    }

    Ok(())
}

/// Read a file out of the guest image
pub fn cat(image: &Utf8Path, guest_path: &str) -> Result<String> {
    let output = Command::new("virt-cat")
        .args(["-a", image.as_str(), guest_path])
        .output()
        .with_context(|| format!("Failed to run virt-cat for {:?}", image))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(color_eyre::eyre::eyre!(
            "virt-cat of {}:{} failed: {}",
            image,
            guest_path,
            stderr
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
