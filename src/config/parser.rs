//! Configuration loading.
//!
//! Reads the YAML file, loads a `.env` file found next to it, and resolves
//! passwords that are given by environment variable name.

use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::{CleanerSpec, CredentialSpec};

/// Loads cleaner configuration documents.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Directory searched for a `.env` file.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for a `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<CleanerSpec> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<CleanerSpec> {
        debug!("Parsing YAML configuration");

        let spec: CleanerSpec = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            }
        })?;

        debug!(
            "Parsed configuration with {} cleanup entries",
            spec.cleanup.len()
        );
        Ok(spec)
    }

    /// Loads the `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the `.env` file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to load .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Returns the password of a credential entry, reading the environment when
/// it is given by variable name.
///
/// # Errors
///
/// Returns an error if the named environment variable is not set, or if the
/// entry names no password at all.
pub fn resolve_password(credential: &CredentialSpec) -> Result<String> {
    if let Some(password) = &credential.password {
        return Ok(password.clone());
    }

    match &credential.password_env {
        Some(name) => std::env::var(name).map_err(|_| {
            ConfigError::MissingEnvVar {
                name: name.clone(),
            }
            .into()
        }),
        None => Err(ConfigError::validation(
            format!("No password given for user '{}'", credential.username),
            "credentials.password",
        )
        .into()),
    }
}
