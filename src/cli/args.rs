//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// statesync - mirror entity state between hosts over MQTT.
#[derive(Parser)]
#[command(name = "statesync")]
#[command(version)]
#[command(about = "Cross-host entity state sync and topic diagnostics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the broker and start syncing
    Start(StartArgs),

    /// Parse a topic and test it against a listener pattern
    Match(MatchArgs),
}

// -----------------------------------------------------------------------------
// Start command
// -----------------------------------------------------------------------------

#[derive(Args)]
pub struct StartArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/statesync.toml")]
    pub config: PathBuf,

    /// Override host.name from the config file
    #[arg(long)]
    pub host: Option<String>,
}

// -----------------------------------------------------------------------------
// Match command (offline pattern diagnostics)
// -----------------------------------------------------------------------------

#[derive(Args)]
pub struct MatchArgs {
    /// Full topic, e.g. mqtt_shared/seattle/state/light.office
    pub topic: String,

    /// Base topic the namespace lives under
    #[arg(long, default_value = crate::routing::DEFAULT_BASE_TOPIC)]
    pub base: String,

    /// fromhost filter (`name`, `!name`, `all`)
    #[arg(long = "from")]
    pub fromhost: Option<String>,

    /// tohost filter (`name`, `!name`, `all`)
    #[arg(long = "to")]
    pub tohost: Option<String>,

    /// event_type filter (`name`, `!name`)
    #[arg(long = "event")]
    pub event_type: Option<String>,

    /// entity filter (`name`, `!name`)
    #[arg(long)]
    pub entity: Option<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}
