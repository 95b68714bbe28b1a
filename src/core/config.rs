use crate::routing::DEFAULT_BASE_TOPIC;
use crate::sync::{is_valid_host_token, EntityNameCodec, SyncOptions};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const RESERVED_TOPIC_CHARS: [char; 3] = ['/', '#', '+'];

/// Top-level configuration for one statesync host.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: HostConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Name this host publishes under; also the suffix peers give its mirrors.
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_host")]
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    /// Generated from the host name when absent.
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            client_id: None,
            keep_alive_secs: default_keep_alive_secs(),
            username: None,
            password: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_base_topic")]
    pub base_topic: String,
    /// Local entities whose state is published to peers.
    #[serde(default)]
    pub shared_entities: Vec<String>,
    /// Known peer hosts. When set, only these names are recognised as
    /// mirror suffixes and only their broadcasts are mirrored.
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default = "default_service_namespace")]
    pub service_namespace: String,
    /// Register a catch-all listener that logs every message on the namespace.
    #[serde(default)]
    pub log_all_messages: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_topic: default_base_topic(),
            shared_entities: Vec::new(),
            peers: Vec::new(),
            service_namespace: default_service_namespace(),
            log_all_messages: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from a path resolved via STATESYNC_CONFIG or defaults to
    /// `config/statesync.toml`.
    /// Applies STATESYNC_HOSTNAME and STATESYNC_LOG_LEVEL after parsing.
    pub fn load_from_env() -> Result<Self> {
        let path = env_config_path();
        let mut cfg = Self::load(&path)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Load configuration from a specific file (TOML or JSON based on extension).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let data = fs::read_to_string(path_ref)
            .with_context(|| format!("unable to read config {}", path_ref.display()))?;
        if is_json(path_ref) {
            Ok(serde_json::from_str(&data)
                .with_context(|| format!("invalid JSON config {}", path_ref.display()))?)
        } else {
            Ok(toml::from_str(&data)
                .with_context(|| format!("invalid TOML config {}", path_ref.display()))?)
        }
    }

    /// Validate naming invariants the protocol depends on.
    pub fn validate(&self) -> Result<()> {
        validate_host_name("host.name", &self.host.name)?;
        for peer in &self.sync.peers {
            validate_host_name("sync.peers", peer)?;
            if *peer == self.host.name {
                bail!("sync.peers must not include this host ({peer})");
            }
        }
        let base = &self.sync.base_topic;
        if base.is_empty() || base.contains(RESERVED_TOPIC_CHARS) {
            bail!("sync.base_topic {base:?} must be a single non-empty topic level");
        }
        let codec = self.name_codec();
        for entity in &self.sync.shared_entities {
            if entity.is_empty() || entity.contains(RESERVED_TOPIC_CHARS) {
                bail!("shared entity {entity:?} is not a valid topic level");
            }
            if let (base, Some(host)) = codec.split_host(entity) {
                bail!(
                    "shared entity {entity:?} reads as {base:?} mirrored from host {host:?}; \
                     list the real hosts in sync.peers or share a different entity"
                );
            }
        }
        if self.broker.port == 0 {
            bail!("broker.port must be > 0");
        }
        if self.broker.channel_capacity == 0 {
            bail!("broker.channel_capacity must be > 0");
        }
        if self.broker.username.is_some() != self.broker.password.is_some() {
            bail!("broker.username and broker.password must be set together");
        }
        Ok(())
    }

    /// Suffix codec as the engine will use it: with peers configured, only
    /// they and this host count as mirror suffixes.
    pub fn name_codec(&self) -> EntityNameCodec {
        let mut codec = EntityNameCodec::with_known_hosts(self.sync.peers.iter().cloned());
        if !self.sync.peers.is_empty() {
            codec.register_host(&self.host.name);
        }
        codec
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            my_host: self.host.name.clone(),
            base_topic: self.sync.base_topic.clone(),
            shared_entities: self.sync.shared_entities.clone(),
            service_namespace: self.sync.service_namespace.clone(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("STATESYNC_HOSTNAME") {
            self.host.name = name;
        }
        if let Ok(level) = std::env::var("STATESYNC_LOG_LEVEL") {
            self.telemetry.log_level = level;
        }
    }
}

/// Host names become topic levels and mirror suffixes, so they may not
/// contain topic separators, wildcards, the suffix delimiter or dashes, nor be
/// a pattern host wildcard.
fn validate_host_name(field: &str, name: &str) -> Result<()> {
    if !is_valid_host_token(name) {
        bail!("{field} {name:?} must be non-empty, free of '_', '/', '+', '#' and not a wildcard");
    }
    if name.contains('-') {
        bail!("{field} {name:?} must not contain '-'");
    }
    Ok(())
}

fn env_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("STATESYNC_CONFIG") {
        PathBuf::from(path)
    } else {
        PathBuf::from("config/statesync.toml")
    }
}

fn is_json(path: &Path) -> bool {
    matches!(path.extension().and_then(|s| s.to_str()), Some("json"))
}

fn default_broker_host() -> String {
    "127.0.0.1".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_channel_capacity() -> usize {
    64
}

fn default_base_topic() -> String {
    DEFAULT_BASE_TOPIC.to_string()
}

fn default_service_namespace() -> String {
    "default".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
