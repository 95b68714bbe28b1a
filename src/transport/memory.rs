use super::{Transport, TransportError};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: String,
}

#[derive(Default)]
struct Inner {
    outbox: Vec<PublishedMessage>,
    subscriptions: Vec<String>,
    closed: bool,
}

/// Transport that records publishes instead of sending them. Clones share
/// the same outbox, so a test can hand one clone to an engine and drain the
/// other.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every message published since the last drain, oldest first.
    pub fn drain(&self) -> Vec<PublishedMessage> {
        std::mem::take(&mut self.inner.lock().outbox)
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.inner.lock().outbox.clone()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.lock().subscriptions.clone()
    }

    /// Make every later request fail with [`TransportError::Unavailable`].
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }
}

impl Transport for MemoryTransport {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(TransportError::Unavailable);
        }
        inner.outbox.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }

    fn subscribe(&self, filter: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(TransportError::Unavailable);
        }
        if !inner.subscriptions.iter().any(|s| s == filter) {
            inner.subscriptions.push(filter.to_string());
        }
        Ok(())
    }
}
