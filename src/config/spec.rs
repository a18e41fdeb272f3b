//! Configuration document types.
//!
//! These structs map one-to-one onto the YAML configuration file. They are
//! turned into the runtime [`Configuration`](super::Configuration) by
//! [`compile`](super::compile()) once validated.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of deletions allowed to run at the same time.
pub const DEFAULT_MAX_SIMULTANEOUS_DELETES: usize = 4;

/// The root of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CleanerSpec {
    /// Settings that apply to every run.
    pub general: GeneralSpec,
    /// One entry per tenant to clean.
    #[serde(default)]
    pub cleanup: Vec<CleanupSpec>,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GeneralSpec {
    /// Period between runs when not running once.
    #[serde(with = "humantime_serde")]
    pub run_every: Duration,
    /// Logging settings.
    #[serde(default)]
    pub log: LogSpec,
    /// Location of the tracking database, relative to the configuration file.
    #[serde(default)]
    pub tracking_database: Option<PathBuf>,
    /// Maximum number of deletions in flight at once.
    #[serde(default = "default_max_simultaneous_deletes")]
    pub max_simultaneous_deletes: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct LogSpec {
    /// Log level or `tracing` filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogSpec {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Cleanup settings for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CleanupSpec {
    /// Keystone authentication URL.
    pub openstack_auth_url: String,
    /// Tenant (project) name.
    pub tenant: String,
    /// Identities within the tenant, in order of preference.
    #[serde(default)]
    pub credentials: Vec<CredentialSpec>,
    /// Instance cleanup settings.
    #[serde(default)]
    pub instances: Option<AreaSpec>,
    /// Image cleanup settings.
    #[serde(default)]
    pub images: Option<AreaSpec>,
    /// Key-pair cleanup settings.
    #[serde(default)]
    pub key_pairs: Option<AreaSpec>,
}

/// One identity within a tenant.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CredentialSpec {
    /// User name.
    pub username: String,
    /// Password given inline.
    #[serde(default)]
    pub password: Option<String>,
    /// Name of the environment variable holding the password.
    #[serde(default)]
    pub password_env: Option<String>,
}

impl std::fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSpec")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("password_env", &self.password_env)
            .finish()
    }
}

/// Cleanup settings for one kind of resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct AreaSpec {
    /// Whether the area is cleaned at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum age an item must exceed before it may be removed.
    #[serde(default, with = "humantime_serde")]
    pub remove_if_older_than: Option<Duration>,
    /// Name patterns of items that are never removed.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Only remove images and key-pairs that no instance uses.
    #[serde(default = "default_true")]
    pub remove_only_if_unused: bool,
}

impl Default for AreaSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            remove_if_older_than: None,
            exclude: Vec::new(),
            remove_only_if_unused: true,
        }
    }
}

const fn default_max_simultaneous_deletes() -> usize {
    DEFAULT_MAX_SIMULTANEOUS_DELETES
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_true() -> bool {
    true
}
