//! Topic addressing and listener dispatch.
//!
//! - `topic` - Parsing/formatting of shared-namespace topics
//! - `pattern` - Per-field listener filters with negation and host wildcards
//! - `dispatcher` - Named listener registry and multicast dispatch

pub mod dispatcher;
pub mod pattern;
pub mod topic;

pub use dispatcher::{safe_decode_payload, Delivery, Dispatcher, Listener, ListenerFn};
pub use pattern::{match_field, FieldMatcher, Pattern, HOST_WILDCARDS};
pub use topic::{TopicAddress, TopicError, DEFAULT_BASE_TOPIC};
