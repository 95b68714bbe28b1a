//! Core runtime infrastructure.
//!
//! - `config` - Configuration parsing and validation
//! - `wiring` - Listener, service and watch registration
//! - `console` - Operator commands read from stdin
//! - `runtime` - Event loop tying broker, dispatcher and console together

pub mod config;
pub mod console;
pub mod runtime;
pub mod wiring;

pub use config::*;
pub use console::{ConsoleCommand, ConsoleError};
pub use runtime::Runtime;
pub use wiring::{register_listeners, register_services, subscribe, wire, Wired};
