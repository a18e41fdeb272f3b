//! Configuration module for the tenant cleaner.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing the YAML configuration file
//! - Validation of configuration values
//! - Compiling the document into per-tenant cleanups with their detectors

mod compile;
mod parser;
mod spec;
mod validator;

pub use compile::{
    area_detectors, compile, CleanupArea, CleanupConfig, Configuration, GeneralConfig,
};
pub use parser::{resolve_password, ConfigParser};
pub use spec::{
    AreaSpec, CleanerSpec, CleanupSpec, CredentialSpec, GeneralSpec, LogFormat, LogSpec,
    DEFAULT_MAX_SIMULTANEOUS_DELETES,
};
pub use validator::{validate_config, ConfigValidator, ValidationError, ValidationResult};

use crate::error::Result;
use std::path::Path;

/// Loads, validates and compiles the configuration file at `path`.
///
/// A `.env` file next to the configuration is loaded first so passwords can
/// be taken from it.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded, is invalid, or references
/// an unset environment variable.
pub fn load(path: impl AsRef<Path>) -> Result<Configuration> {
    let path = path.as_ref();
    let parser = path
        .parent()
        .map_or_else(ConfigParser::new, |dir| ConfigParser::new().with_base_path(dir));

    parser.load_dotenv()?;
    let spec = parser.load_file(path)?;
    validate_config(&spec)?;
    compile(&spec, Some(path))
}
