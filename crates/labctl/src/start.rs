//! `labctl start` - inject guest configuration and boot every lab VM
//!
//! For each VM recorded in the state snapshot: stage and inject its guest
//! configuration, start the domain, and open an interactive console in a
//! new terminal. Once all VMs are handled the host is wired into the lab.

use color_eyre::Result;
use tracing::{error, info, warn};

use crate::context::LabContext;
use crate::state::LabState;
use crate::{network, provision};

/// Run the start command
pub fn run(ctx: &LabContext) -> Result<()> {
    let Some(state) = LabState::load(&ctx.state_path)? else {
        warn!(
            "no lab state found at {}; run 'labctl create' first",
            ctx.state_path
        );
        return Ok(());
    };

    info!("starting {} lab VMs", state.len());
    for name in state.ordered_names() {
        if let Err(e) = start_vm(ctx, name) {
            error!("failed to start VM {name}: {e:#}");
            continue;
        }
        info!("VM {name} started");
    }

    if let Err(e) = network::configure_host_routing() {
        error!("failed to configure host routing: {e:#}");
    }

    Ok(())
}

fn start_vm(ctx: &LabContext, name: &str) -> Result<()> {
    provision::inject_configs(name, &ctx.workdir)?;
    ctx.libvirt.start(name)?;
    ctx.libvirt.open_console(name)?;
    Ok(())
}
