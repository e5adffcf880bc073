//! Tooling & Integration Layer
//!
//! Command-line surface over the staging, fixity and assembly pipelines.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, CommandOutcome, Commands};
pub use format::OutputFormat;
