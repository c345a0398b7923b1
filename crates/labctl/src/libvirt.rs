//! virsh plumbing for domain lifecycle operations
//!
//! All hypervisor interaction goes through the `virsh` CLI; the registered
//! domain store is the source of truth for what exists across invocations.

use camino::Utf8Path;
use color_eyre::{eyre::Context, Result};
use std::process::{Command, Stdio};

/// Global options for libvirt operations
#[derive(Debug, Clone, Default)]
pub struct LibvirtOptions {
    /// Hypervisor connection URI (e.g., qemu:///system, qemu+ssh://host/system)
    pub connect: Option<String>,
}

impl LibvirtOptions {
    /// Create a virsh Command with the appropriate connection URI
    pub fn virsh_command(&self) -> Command {
        let mut cmd = Command::new("virsh");
        if let Some(ref uri) = self.connect {
            cmd.arg("-c").arg(uri);
        }
        cmd
    }

    fn run_virsh(&self, args: &[&str]) -> Result<()> {
        let output = self
            .virsh_command()
            .args(args)
            .output()
            .with_context(|| format!("Failed to run virsh {}", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(color_eyre::eyre::eyre!(
                "virsh {} failed: {}",
                args.join(" "),
                stderr.trim()
            ));
        }

        Ok(())
    }

    /// Register a domain definition from an XML file
    pub fn define(&self, xml_path: &Utf8Path) -> Result<()> {
        self.run_virsh(&["define", xml_path.as_str()])
    }

    /// Unregister a domain definition
    pub fn undefine(&self, name: &str) -> Result<()> {
        self.run_virsh(&["undefine", name])
    }

    /// Boot a defined domain
    pub fn start(&self, name: &str) -> Result<()> {
        self.run_virsh(&["start", name])
    }

    /// Request a graceful guest shutdown
    pub fn shutdown(&self, name: &str) -> Result<()> {
        self.run_virsh(&["shutdown", name])
    }

    /// Force-stop a running domain
    pub fn destroy_domain(&self, name: &str) -> Result<()> {
        self.run_virsh(&["destroy", name])
    }

    /// Open an interactive console for a domain in a new terminal window
    ///
    /// The terminal is spawned detached; its lifetime is the operator's
    /// business, not ours.
    pub fn open_console(&self, name: &str) -> Result<()> {
        let console_cmd = match self.connect {
            Some(ref uri) => format!("virsh -c {uri} console {name}"),
            None => format!("virsh console {name}"),
        };

        Command::new("xterm")
            .args(["-e", &console_cmd])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to open console terminal for '{}'", name))?;

        tracing::debug!("console for {name} opened in a new terminal");
        Ok(())
    }
}
