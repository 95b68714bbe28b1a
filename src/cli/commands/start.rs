//! Start command - runs one syncing host.

use crate::cli::args::StartArgs;
use crate::config::Config;
use crate::runtime::Runtime;
use crate::telemetry;
use anyhow::Result;
use std::env;

pub async fn run_start(args: StartArgs) -> Result<()> {
    // Set config path via environment so Config::load_from_env picks it up
    env::set_var("STATESYNC_CONFIG", args.config.display().to_string());

    let mut config = Config::load_from_env()?;
    if let Some(host) = args.host {
        config.host.name = host;
    }
    let log_handle = telemetry::init_tracing(
        Some(config.telemetry.log_level.as_str()),
        config.telemetry.json,
    )?;
    let mut runtime = Runtime::new(config, Some(log_handle))?;
    runtime.run().await
}
