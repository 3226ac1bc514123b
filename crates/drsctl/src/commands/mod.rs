//! Command handlers: bridge CLI args -> reconciler -> output formatting.

pub mod apply;
pub mod config_cmd;
pub mod get;
