//! Structured topic addresses on the shared namespace.
//!
//! Two wire forms share one base prefix:
//! - broadcast: `<base>/<fromhost>/<event_type>/<entity>` (4 segments)
//! - directed:  `<base>/<fromhost>/<tohost>/<event_type>/<entity>` (5 segments)
//!
//! Anything else is not ours and parses to a [`TopicError`], never a panic.

use std::fmt;
use thiserror::Error;

/// Default prefix shared by every cooperating host.
pub const DEFAULT_BASE_TOPIC: &str = "mqtt_shared";

const MIN_SEGMENTS: usize = 4;
const MAX_SEGMENTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("improper format ({count} segments): {topic}")]
    SegmentCount { topic: String, count: usize },
    #[error("does not start with {expected}: {topic}")]
    BasePrefix { topic: String, expected: String },
}

/// Parsed form of a topic on the shared namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicAddress {
    pub fromhost: String,
    pub tohost: Option<String>,
    pub event_type: String,
    pub entity: Option<String>,
}

impl TopicAddress {
    /// Address visible to every host (legacy broadcast form).
    pub fn broadcast(fromhost: &str, event_type: &str, entity: &str) -> Self {
        Self {
            fromhost: fromhost.to_string(),
            tohost: None,
            event_type: event_type.to_string(),
            entity: Some(entity.to_string()),
        }
    }

    /// Address meant for a single destination host.
    pub fn directed(fromhost: &str, tohost: &str, event_type: &str, entity: &str) -> Self {
        Self {
            fromhost: fromhost.to_string(),
            tohost: Some(tohost.to_string()),
            event_type: event_type.to_string(),
            entity: Some(entity.to_string()),
        }
    }

    /// Split `topic` under `base`. Failures are logged at debug level and
    /// returned; callers treat them as "does not match".
    pub fn parse(base: &str, topic: &str) -> Result<Self, TopicError> {
        let parts: Vec<&str> = topic.split('/').collect();
        if !(MIN_SEGMENTS..=MAX_SEGMENTS).contains(&parts.len()) {
            let err = TopicError::SegmentCount {
                topic: topic.to_string(),
                count: parts.len(),
            };
            tracing::debug!("topic parse failed - {err}");
            return Err(err);
        }
        if parts[0] != base {
            let err = TopicError::BasePrefix {
                topic: topic.to_string(),
                expected: base.to_string(),
            };
            tracing::debug!("topic parse failed - {err}");
            return Err(err);
        }

        let address = if parts.len() == MAX_SEGMENTS {
            Self::directed(parts[1], parts[2], parts[3], parts[4])
        } else {
            Self::broadcast(parts[1], parts[2], parts[3])
        };
        Ok(address)
    }

    /// Inverse of [`TopicAddress::parse`], used for outbound publishes.
    pub fn format(&self, base: &str) -> String {
        let mut topic = format!("{base}/{}", self.fromhost);
        if let Some(tohost) = &self.tohost {
            topic.push('/');
            topic.push_str(tohost);
        }
        topic.push('/');
        topic.push_str(&self.event_type);
        if let Some(entity) = &self.entity {
            topic.push('/');
            topic.push_str(entity);
        }
        topic
    }

    pub fn is_directed(&self) -> bool {
        self.tohost.is_some()
    }
}

impl fmt::Display for TopicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.fromhost,
            self.tohost.as_deref().unwrap_or("-"),
            self.event_type,
            self.entity.as_deref().unwrap_or("-")
        )
    }
}
