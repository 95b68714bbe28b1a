//! Control-plane service contract.
//!
//! A local actor asks for a change on a mirrored entity by calling the
//! `remote_entity` service. Rejections surface synchronously to the caller as
//! [`ServiceError`]; accepted calls turn into a publish to the origin host.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub const REMOTE_ENTITY_SERVICE: &str = "remote_entity";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    SetState,
    ToggleState,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetState => "set_state",
            Self::ToggleState => "toggle_state",
        }
    }
}

impl FromStr for ServiceAction {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set_state" => Ok(Self::SetState),
            "toggle_state" => Ok(Self::ToggleState),
            other => Err(ServiceError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw service invocation as received from the calling layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceCall {
    #[serde(default)]
    pub namespace: String,
    pub action: String,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ServiceCall {
    pub fn new(namespace: &str, action: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            action: action.to_string(),
            entity_id: None,
            value: None,
        }
    }

    pub fn entity(mut self, entity_id: &str) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("wrong namespace {actual:?} (expected {expected:?})")]
    WrongNamespace { expected: String, actual: String },
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("missing required argument entity_id")]
    MissingEntityId,
    #[error("missing required argument value for {0}")]
    MissingValue(ServiceAction),
    #[error("entity {0} does not exist")]
    UnknownEntity(String),
    #[error("entity {entity_id} has non-binary state {state:?}")]
    NotBinary { entity_id: String, state: String },
    #[error("entity {0} is not a mirrored entity")]
    NotMirrored(String),
    #[error("no service registered as {0}")]
    UnknownService(String),
    #[error("publish failed: {0}")]
    Publish(#[from] crate::transport::TransportError),
}

/// Two-valued state domain accepted by `toggle_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryState {
    On,
    Off,
}

impl BinaryState {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

/// Something that can serve a registered service call.
pub trait ServiceHandler: Send + Sync {
    fn call(&self, call: &ServiceCall) -> Result<(), ServiceError>;
}

/// Name -> handler table standing in for the platform's service registry.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    handlers: BTreeMap<String, Arc<dyn ServiceHandler>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, handler: Arc<dyn ServiceHandler>) {
        if self.handlers.insert(name.to_string(), handler).is_some() {
            tracing::warn!("service {name} re-registered");
        }
    }

    pub fn call(&self, name: &str, call: &ServiceCall) -> Result<(), ServiceError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ServiceError::UnknownService(name.to_string()))?;
        handler.call(call)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
