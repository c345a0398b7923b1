//! `labctl create` - build the lab scenario
//!
//! Provisions overlay images and domain definitions for every VM, creates
//! the two OVS networks, and writes the state snapshot the later lifecycle
//! operations read. Per-VM failures are logged and the batch continues;
//! there is no rollback.

use camino::Utf8Path;
use color_eyre::{eyre::Context as _, Result};
use std::fs;
use tracing::{debug, error, info, warn};

use crate::cmdext::CommandRunExt;
use crate::config::LabConfig;
use crate::context::{pause, LabContext};
use crate::state::LabState;
use crate::{domain, network, qemu_img, topology};

/// Run the create command
pub fn run(ctx: &LabContext) -> Result<()> {
    let Some(config) = LabConfig::load(&ctx.config_path)? else {
        error!(
            "config file {} not found; cannot build the lab",
            ctx.config_path
        );
        return Ok(());
    };

    if let Err(e) = preflight(ctx, &config) {
        error!("environment preparation failed: {e:#}");
    }

    LabState::clear(&ctx.state_path)?;

    let base_image = ctx.workdir.join(qemu_img::BASE_IMAGE);
    let template = ctx.workdir.join(domain::DOMAIN_TEMPLATE);

    info!("creating {} web servers", config.number_of_servers);
    let mut state = LabState::default();

    for index in 1..=config.number_of_servers {
        let name = topology::server_name(index);
        state.insert(&name);
        build_vm(ctx, &name, &base_image, &template);
    }

    for name in [topology::BALANCER, topology::CLIENT] {
        state.insert(name);
        build_vm(ctx, name, &base_image, &template);
    }

    for net in network::LAB_NETWORKS {
        if let Err(e) = net.create() {
            error!("failed to create network {}: {e:#}", net.name);
        }
    }

    state.save(&ctx.state_path)?;
    info!("lab state saved to {}", ctx.state_path);

    pause();
    Ok(())
}

/// Clone the overlay image and register the domain definition for one VM
///
/// A failed clone aborts this VM before the definition step; either
/// failure leaves the partial artifacts in place for inspection.
fn build_vm(ctx: &LabContext, name: &str, base_image: &Utf8Path, template: &Utf8Path) {
    let image_path = ctx.workdir.join(format!("{name}.qcow2"));

    if let Err(e) = qemu_img::create_overlay(base_image, &image_path) {
        error!("failed to clone image for VM {name}: {e:#}");
        return;
    }

    if let Err(e) = domain::define_domain(name, template, &ctx.workdir, &ctx.libvirt) {
        error!("failed to define VM {name}: {e:#}");
        return;
    }

    info!("VM {name} created");
}

/// Copy the base image and template into the working directory when absent,
/// and run the optional host preparation script.
fn preflight(ctx: &LabContext, config: &LabConfig) -> Result<()> {
    if let Some(ref assets) = config.assets_dir {
        for file in [qemu_img::BASE_IMAGE, domain::DOMAIN_TEMPLATE] {
            let dest = ctx.workdir.join(file);
            if dest.exists() {
                debug!("{file} already present, not copying");
                continue;
            }
            let src = assets.join(file);
            fs::copy(&src, &dest).with_context(|| format!("Failed to copy {} to {}", src, dest))?;
            info!("copied {file} from {assets}");
        }
    }

    if let Some(ref script) = config.prepare_script {
        if script.exists() {
            std::process::Command::new(script.as_str())
                .run()
                .with_context(|| format!("Failed to run preparation script {}", script))?;
            info!("preparation script {script} completed");
        } else {
            warn!("preparation script {script} not found, skipping");
        }
    }

    Ok(())
}
