//! Named listener registry with multicast dispatch.
//!
//! The transport hands every raw `(topic, payload)` to [`Dispatcher::dispatch`].
//! The topic is parsed once, tested against every listener pattern in
//! registration order, and each match receives a [`Delivery`]. Several
//! listeners may fire for the same message.

use super::pattern::Pattern;
use super::topic::TopicAddress;
use serde_json::error::Category;
use serde_json::Value;

/// Borrowed view of one matched message handed to a listener.
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    pub fromhost: &'a str,
    pub tohost: Option<&'a str>,
    pub event_type: &'a str,
    pub entity: Option<&'a str>,
    pub payload: &'a str,
    /// Best-effort JSON view of `payload`; `None` for plain scalars.
    pub decoded: Option<&'a Value>,
}

pub type ListenerFn<R> = Box<dyn Fn(&Delivery<'_>) -> R + Send + Sync>;

pub struct Listener<R> {
    pub name: String,
    pub pattern: Pattern,
    callback: ListenerFn<R>,
}

impl<R> std::fmt::Debug for Listener<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .finish()
    }
}

/// Listener registry. `R` is whatever the callbacks report back.
#[derive(Debug)]
pub struct Dispatcher<R> {
    base_topic: String,
    listeners: Vec<Listener<R>>,
}

impl<R> Dispatcher<R> {
    pub fn new(base_topic: impl Into<String>) -> Self {
        Self {
            base_topic: base_topic.into(),
            listeners: Vec::new(),
        }
    }

    pub fn base_topic(&self) -> &str {
        &self.base_topic
    }

    /// Register `callback` under `name`. An existing listener with the same
    /// name is replaced in place and keeps its position.
    pub fn add_listener<F>(&mut self, name: &str, pattern: Pattern, callback: F)
    where
        F: Fn(&Delivery<'_>) -> R + Send + Sync + 'static,
    {
        let listener = Listener {
            name: name.to_string(),
            pattern,
            callback: Box::new(callback),
        };
        match self.listeners.iter_mut().find(|l| l.name == name) {
            Some(existing) => {
                tracing::warn!("add_listener - re-registering listener: {name}");
                *existing = listener;
            }
            None => self.listeners.push(listener),
        }
    }

    /// Remove the listener registered under `name`; returns whether it existed.
    pub fn remove_listener(&mut self, name: &str) -> bool {
        match self.listeners.iter().position(|l| l.name == name) {
            Some(idx) => {
                self.listeners.remove(idx);
                true
            }
            None => {
                tracing::warn!("remove_listener - listener not found: {name}");
                false
            }
        }
    }

    pub fn listener_names(&self) -> impl Iterator<Item = &str> {
        self.listeners.iter().map(|l| l.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Route one raw message to every matching listener and collect their
    /// results in invocation order. Topics outside the namespace yield an
    /// empty result; the parser already logged why.
    pub fn dispatch(&self, raw_topic: &str, payload: &str) -> Vec<R> {
        let Ok(address) = TopicAddress::parse(&self.base_topic, raw_topic) else {
            return Vec::new();
        };

        let mut decoded: Option<Option<Value>> = None;
        let mut results = Vec::new();
        for listener in self.listeners.iter().filter(|l| l.pattern.matches(&address)) {
            tracing::debug!("dispatcher: dispatching to: {}", listener.name);
            let decoded = decoded.get_or_insert_with(|| safe_decode_payload(payload));
            let delivery = Delivery {
                fromhost: &address.fromhost,
                tohost: address.tohost.as_deref(),
                event_type: &address.event_type,
                entity: address.entity.as_deref(),
                payload,
                decoded: decoded.as_ref(),
            };
            results.push((listener.callback)(&delivery));
        }

        if results.is_empty() {
            tracing::debug!("dispatcher: could not find pattern to match: {raw_topic}");
        }
        results
    }
}

/// Attempt a JSON decode of `payload`. Malformed input is expected (most
/// payloads are plain scalars) and yields `None` quietly; anything that is
/// not a decode failure is logged.
pub fn safe_decode_payload(payload: &str) -> Option<Value> {
    match serde_json::from_str(payload) {
        Ok(value) => Some(value),
        Err(err) => {
            if err.classify() == Category::Io {
                tracing::warn!("unexpected error decoding payload {payload:?}: {err}");
            }
            None
        }
    }
}
