#![deny(unused, dead_code)]
#![deny(clippy::all, clippy::pedantic)]
// Module naming: common pattern in domain-driven code
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
// Documentation style: many terms don't need backticks
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// API ergonomics: prefer simplicity over must_use annotations
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
// Format strings: allow non-inlined for readability
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::result_large_err)]

//! statesync - cross-host entity state mirroring over a shared MQTT namespace.
//!
//! # Module Organization
//!
//! ## Core
//! - `core::config` - Configuration parsing and validation
//! - `core::wiring` - Listener and service registration
//! - `core::console` - Operator console commands
//! - `core::runtime` - Main runtime orchestration
//!
//! ## Routing
//! - `routing::topic` - Topic grammar (`base/from[/to]/event/entity`)
//! - `routing::pattern` - Per-field matchers with negation and host wildcards
//! - `routing::dispatcher` - Named listener registry, multicast dispatch
//!
//! ## Sync
//! - `sync::naming` - Host-suffixed mirror ids
//! - `sync::store` - Entity state store
//! - `sync::engine` - Publishing, mirroring, directed requests, ping/pong
//! - `sync::service` - `remote_entity` control plane
//!
//! ## Transport
//! - `transport::mqtt` - `rumqttc` client
//! - `transport::memory` - Recording transport
//!
//! ## Operations
//! - `ops::telemetry` - Tracing setup and runtime log level

// Core infrastructure
pub mod core;

// Topic routing
pub mod routing;

// Entity sync
pub mod sync;

// Pub/sub transport
pub mod transport;

// Operations
pub mod ops;

// CLI
pub mod cli;

pub use self::core::{config, runtime};
pub use ops::telemetry;
