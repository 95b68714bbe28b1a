use anyhow::{anyhow, Result};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload;

pub type LogHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// Initialize logging with a reloadable level. `json` selects structured
/// output; otherwise lines are human readable.
pub fn init_tracing(log_level: Option<&str>, json: bool) -> Result<LogHandle> {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(filter);
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    });
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init tracing: {e}"))?;
    Ok(handle)
}

/// Swap the active filter, e.g. `debug` or `statesync::routing=trace`.
pub fn set_log_level(handle: &LogHandle, level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_new(level).map_err(|e| anyhow!("invalid log filter {level:?}: {e}"))?;
    handle
        .modify(|f| *f = filter)
        .map_err(|e| anyhow!("failed to reload log filter: {e}"))?;
    tracing::info!("log level set to {level}");
    Ok(())
}
