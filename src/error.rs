//! Error types for the tenant cleaner.
//!
//! Configuration, tracking and listing errors are fatal for a run. Per-item
//! delete failures are not represented here as run failures; the executor
//! logs and counts them.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::ItemType;

/// The main error type for the tenant cleaner.
#[derive(Debug, Error)]
pub enum CleanerError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Age tracking store errors.
    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    /// `OpenStack` API errors.
    #[error("OpenStack API error: {0}")]
    OpenStack(#[from] OpenStackError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// An exclude pattern is not a valid regular expression.
    #[error("Invalid exclude pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Description of the problem.
        message: String,
    },
}

/// Age tracking store errors.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The tracking database is corrupted.
    #[error("Tracking database is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// The tracking database could not be read or written.
    #[error("Tracking database unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// Serialization error.
    #[error("Tracking serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },
}

/// `OpenStack` API errors.
#[derive(Debug, Error)]
pub enum OpenStackError {
    /// Authentication failed.
    #[error("OpenStack authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("OpenStack API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
    },

    /// Network error.
    #[error("Network error communicating with OpenStack: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from OpenStack API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// The service catalogue has no endpoint for a service.
    #[error("No endpoint found for service '{service}'")]
    EndpointNotFound {
        /// Service type that was looked up.
        service: String,
    },

    /// A manager was asked to handle an item of another type.
    #[error("Manager for {expected} items cannot handle a {found} item")]
    ItemTypeMismatch {
        /// Type the manager handles.
        expected: ItemType,
        /// Type of the item it was given.
        found: ItemType,
    },
}

/// Planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A cleanup configuration has no credentials to work with.
    #[error("Cleanup configuration {index} has no credentials")]
    NoCredentials {
        /// Position of the cleanup configuration.
        index: usize,
    },
}

/// Result type alias for tenant cleaner operations.
pub type Result<T> = std::result::Result<T, CleanerError>;

impl CleanerError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error means the configuration itself is unusable.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl TrackingError {
    /// Creates an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a corruption error with the given message.
    #[must_use]
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }
}

impl OpenStackError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
