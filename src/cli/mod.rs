//! CLI module for the tenant cleaner.
//!
//! This module provides the command-line interface and the formatting of
//! run summaries.

mod commands;
mod output;

pub use commands::{Cli, OutputFormat};
pub use output::OutputFormatter;
