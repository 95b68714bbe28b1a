//! statesync CLI - unified command-line interface.
//!
//! - `statesync start` - Connect and run one host
//! - `statesync match` - Check a topic against a pattern offline

mod args;
pub mod commands;

pub use args::{Cli, Commands, MatchArgs, StartArgs};
