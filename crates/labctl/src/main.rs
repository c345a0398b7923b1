use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use color_eyre::{Report, Result};

use labctl::config::{self, LabConfig};
use labctl::context::LabContext;
use labctl::{create, destroy, start, stop};

/// Provision and manage a small load-balanced web lab on libvirt.
///
/// labctl builds a fixed scenario from one base image and one domain
/// template: N web server VMs behind an HAProxy balancer with a client,
/// wired over two Open vSwitch bridges. The lifecycle is
/// create -> start -> stop -> destroy.
#[derive(Parser)]
struct Cli {
    /// Path to the lab configuration file
    #[clap(long, global = true, default_value = config::CONFIG_FILE)]
    config: Utf8PathBuf,

    /// Libvirt connection URI (e.g., qemu:///system)
    #[clap(long, global = true)]
    connect: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Lab lifecycle operations
#[derive(Subcommand)]
enum Commands {
    /// Build images, domain definitions, and networks for the lab
    Create,

    /// Inject guest configuration and boot every lab VM
    Start,

    /// Gracefully shut down every lab VM
    Stop,

    /// Tear down VMs, networks, and generated artifacts
    Destroy,
}

/// Install and configure the tracing/logging system.
///
/// Sets up structured logging with environment-based filtering,
/// error layer integration, and console output formatting.
/// Logs are filtered by the RUST_LOG environment variable; when it is
/// unset the default level comes from the config file's `debug` flag.
fn install_tracing(debug: bool) {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_filter = if debug { "debug" } else { "info" };
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
}

/// Main entry point for the labctl CLI application.
///
/// Initializes logging and error handling, then dispatches the requested
/// lifecycle operation. Operational failures are logged per VM inside the
/// operations; the process exits 0 for every non-usage path.
fn main() -> Result<(), Report> {
    let cli = Cli::parse();

    // The debug flag widens the default log filter, so peek at the config
    // before logging is installed; create reports load problems properly.
    let debug = LabConfig::load(&cli.config)
        .ok()
        .flatten()
        .map(|c| c.debug)
        .unwrap_or(false);
    install_tracing(debug);
    color_eyre::install()?;

    let ctx = LabContext::new(cli.config, cli.connect)?;
    let result = match cli.command {
        Commands::Create => create::run(&ctx),
        Commands::Start => start::run(&ctx),
        Commands::Stop => stop::run(&ctx),
        Commands::Destroy => destroy::run(&ctx),
    };

    // Setup failures surface here; everything operational was already
    // logged where it happened. Neither changes the exit status.
    if let Err(e) = result {
        tracing::error!("{e:#}");
    }

    tracing::info!("lab run completed");
    std::process::exit(0)
}
