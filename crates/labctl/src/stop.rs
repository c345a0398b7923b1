//! `labctl stop` - gracefully shut down every lab VM

use color_eyre::Result;
use tracing::{error, info, warn};

use crate::context::{pause, LabContext};
use crate::state::LabState;

/// Run the stop command
pub fn run(ctx: &LabContext) -> Result<()> {
    let Some(state) = LabState::load(&ctx.state_path)? else {
        warn!(
            "no lab state found at {}; run 'labctl create' first",
            ctx.state_path
        );
        return Ok(());
    };

    info!("stopping {} lab VMs", state.len());
    for name in state.ordered_names() {
        match ctx.libvirt.shutdown(name) {
            Ok(()) => info!("VM {name} shutting down"),
            Err(e) => error!("failed to stop VM {name}: {e:#}"),
        }
    }

    // The key set is unchanged; the snapshot is rewritten wholesale.
    state.save(&ctx.state_path)?;

    pause();
    Ok(())
}
