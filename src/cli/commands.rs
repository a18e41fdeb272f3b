//! CLI definition.
//!
//! This module defines the command-line arguments using clap.

use clap::Parser;
use std::path::PathBuf;

/// Tenant cleaner - removes stale `OpenStack` tenant resources.
#[derive(Parser, Debug)]
#[command(name = "tenant-cleaner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(env = "TENANT_CLEANER_CONFIG")]
    pub config: PathBuf,

    /// Report what would be deleted without deleting anything.
    #[arg(short, long)]
    pub dry_run: bool,

    /// Run once and exit instead of running periodically.
    #[arg(short, long)]
    pub single_run: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format of the run summary (text, json).
    #[arg(long, default_value = "text")]
    pub output: OutputFormat,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
