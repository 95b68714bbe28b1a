//! CLI command implementations.

mod r#match;
mod start;

pub use r#match::run_match;
pub use start::run_start;
