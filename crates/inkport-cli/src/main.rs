//! Inkport CLI - export and re-import 3D ink sessions
//!
//! Inkport recovers ink sessions exported into host logs, inspects them,
//! and re-materializes them through the shared import state machine.
//!
//! ## Quick Start
//!
//! ```bash
//! # Pull the latest export out of a log
//! inkport extract ~/output_log.txt -o session.json
//!
//! # Import it at half size and save the resulting scene
//! inkport import session.json --scale 0.5 -o scene.json
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::Parser;

mod commands;
pub mod ui;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Extract(args) => commands::extract::run(args).await,
        Command::Envelope(args) => commands::envelope::run(args).await,
        Command::Inspect(args) => commands::inspect::run(args).await,
        Command::Import(args) => commands::import::run(args).await,
        Command::Config(args) => commands::config::run(args),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "warn,inkport=debug,inkport_core=debug"
    } else {
        "warn,inkport=info,inkport_core=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
