//! Publish/subscribe transport seam.
//!
//! - `mqtt` - `rumqttc` client used by the runtime
//! - `memory` - Recording transport for tests and offline tooling
//!
//! Publishing is fire-and-forget: implementations queue the message and
//! return without waiting on the network. Inbound delivery is driven by the
//! runtime, which feeds `(topic, payload)` into the dispatcher.

pub mod memory;
pub mod mqtt;

pub use memory::{MemoryTransport, PublishedMessage};
pub use mqtt::MqttTransport;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request could not be queued. The MQTT client reports a full queue
    /// and a dropped event loop the same way.
    #[error("transport request queue is full or closed")]
    Unavailable,
}

pub trait Transport: Send + Sync {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError>;

    fn subscribe(&self, filter: &str) -> Result<(), TransportError>;
}

/// Wildcard filter covering every topic under `base`.
pub fn subscription_filter(base: &str) -> String {
    format!("{base}/#")
}
