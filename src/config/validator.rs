//! Configuration validation.
//!
//! Every problem in the document is collected. The first error is reported
//! as fatal, the rest are logged.

use crate::detection::ExcludePatterns;
use crate::error::{ConfigError, Result};
use tracing::{debug, warn};

use super::spec::{AreaSpec, CleanerSpec, CleanupSpec, CredentialSpec};

/// Validator for cleaner configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all problems found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any were found.
    pub fn validate(&self, spec: &CleanerSpec) -> Result<ValidationResult> {
        let result = self.check(spec);

        for warning in &result.warnings {
            warn!("{warning}");
        }

        match result.errors.first() {
            None => {
                debug!("Configuration validation passed");
                Ok(result)
            }
            Some(first) => {
                for other in result.errors.iter().skip(1) {
                    warn!("Also invalid: {}: {}", other.field, other.message);
                }
                Err(ConfigError::validation(first.message.clone(), first.field.clone()).into())
            }
        }
    }

    /// Collects every problem without failing.
    #[must_use]
    pub fn check(&self, spec: &CleanerSpec) -> ValidationResult {
        let mut result = ValidationResult::default();

        if spec.general.run_every.is_zero() {
            result.error("general.run-every", "Run period must be greater than zero");
        }
        if spec.general.max_simultaneous_deletes == 0 {
            result.error(
                "general.max-simultaneous-deletes",
                "At least one deletion must be allowed at a time",
            );
        }

        if spec.cleanup.is_empty() {
            result.error("cleanup", "No cleanup configurations defined");
        }
        for (i, cleanup) in spec.cleanup.iter().enumerate() {
            Self::validate_cleanup(cleanup, &format!("cleanup[{i}]"), &mut result);
        }

        result
    }

    fn validate_cleanup(cleanup: &CleanupSpec, prefix: &str, result: &mut ValidationResult) {
        if cleanup.openstack_auth_url.trim().is_empty() {
            result.error(
                format!("{prefix}.openstack-auth-url"),
                "OpenStack authentication URL cannot be empty",
            );
        } else if !cleanup.openstack_auth_url.starts_with("http://")
            && !cleanup.openstack_auth_url.starts_with("https://")
        {
            result.error(
                format!("{prefix}.openstack-auth-url"),
                format!(
                    "OpenStack authentication URL '{}' must be an http(s) URL",
                    cleanup.openstack_auth_url
                ),
            );
        }

        if cleanup.tenant.trim().is_empty() {
            result.error(format!("{prefix}.tenant"), "Tenant cannot be empty");
        }

        if cleanup.credentials.is_empty() {
            result.error(
                format!("{prefix}.credentials"),
                "At least one set of credentials is required",
            );
        }
        for (i, credential) in cleanup.credentials.iter().enumerate() {
            Self::validate_credential(credential, &format!("{prefix}.credentials[{i}]"), result);
        }

        let areas = [
            ("instances", cleanup.instances.as_ref()),
            ("images", cleanup.images.as_ref()),
            ("key-pairs", cleanup.key_pairs.as_ref()),
        ];
        for (name, area) in areas {
            if let Some(area) = area {
                Self::validate_area(area, &format!("{prefix}.{name}"), result);
            }
        }

        if areas.iter().all(|(_, area)| !area.is_some_and(|a| a.enabled)) {
            result
                .warnings
                .push(format!("{prefix} for tenant '{}' cleans nothing", cleanup.tenant));
        }

        if let Some(instances) = cleanup.instances.as_ref().filter(|a| a.enabled) {
            if instances.remove_if_older_than.is_none() && instances.exclude.is_empty() {
                result.warnings.push(format!(
                    "{prefix}.instances has no age threshold or excludes: every instance will be removed"
                ));
            }
        }
    }

    fn validate_credential(credential: &CredentialSpec, prefix: &str, result: &mut ValidationResult) {
        if credential.username.trim().is_empty() {
            result.error(format!("{prefix}.username"), "Username cannot be empty");
        }

        match (&credential.password, &credential.password_env) {
            (Some(_), Some(_)) => result.error(
                format!("{prefix}.password"),
                "Only one of password and password-env may be given",
            ),
            (None, None) => result.error(
                format!("{prefix}.password"),
                format!("No password given for user '{}'", credential.username),
            ),
            (None, Some(name)) if name.trim().is_empty() => result.error(
                format!("{prefix}.password-env"),
                "Password environment variable name cannot be empty",
            ),
            _ => {}
        }
    }

    fn validate_area(area: &AreaSpec, prefix: &str, result: &mut ValidationResult) {
        if let Err(e) = ExcludePatterns::new(&area.exclude) {
            result.error(format!("{prefix}.exclude"), e.to_string());
        }

        if let Some(threshold) = area.remove_if_older_than {
            if chrono::Duration::from_std(threshold).is_err() {
                result.error(
                    format!("{prefix}.remove-if-older-than"),
                    "Age threshold is out of range",
                );
            }
        }
    }
}

/// Validates a configuration document using default settings.
///
/// # Errors
///
/// Returns the first validation error if any were found.
pub fn validate_config(spec: &CleanerSpec) -> Result<ValidationResult> {
    ConfigValidator::new().validate(spec)
}
