//! statesync - unified CLI entrypoint.
//!
//! Usage:
//!   statesync start --config config/statesync.toml
//!   statesync match mqtt_shared/seattle/state/light.office --from '!haven' --event state

use anyhow::Result;
use clap::Parser;
use statesync::cli::commands::{run_match, run_start};
use statesync::cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start(args) => run_start(args).await,
        Commands::Match(args) => run_match(args),
    }
}
