//! CLI command handlers
//!
//! Argument parsing structures, routing, and the `collect` and `info`
//! command implementations.

pub mod args;
pub mod commands;
pub mod router;

pub use args::{Cli, Commands, SourceArgs};
pub use router::execute_command;
