//! Turns a validated configuration document into runtime configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::detection::{Detector, ExcludePatterns};
use crate::error::{ConfigError, Result};
use crate::models::{CredentialSelection, Credentials, ItemType};

use super::parser::resolve_password;
use super::spec::{AreaSpec, CleanerSpec, CleanupSpec, LogSpec};

/// File name of the tracking database when none is configured.
const DEFAULT_TRACKING_DATABASE: &str = "tracking.json";

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Settings that apply to every run.
    pub general: GeneralConfig,
    /// One entry per tenant, each producing its own plan.
    pub cleanups: Vec<CleanupConfig>,
}

/// Runtime general settings.
#[derive(Debug, Clone)]
pub struct GeneralConfig {
    /// Period between runs.
    pub run_every: Duration,
    /// Logging settings.
    pub log: LogSpec,
    /// Resolved location of the tracking database.
    pub tracking_database: PathBuf,
    /// Maximum number of deletions in flight at once.
    pub max_simultaneous_deletes: usize,
}

/// How one tenant is cleaned.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Identities within the tenant, in order of preference.
    pub credentials: Vec<Credentials>,
    /// Areas to clean, in configured order.
    pub areas: Vec<CleanupArea>,
}

impl CleanupConfig {
    /// Returns the identities an area of the given type is processed with.
    #[must_use]
    pub fn credentials_for(&self, item_type: ItemType) -> &[Credentials] {
        match item_type.credential_selection() {
            CredentialSelection::All => &self.credentials,
            CredentialSelection::First => {
                &self.credentials[..self.credentials.len().min(1)]
            }
        }
    }
}

/// One area of a cleanup and the detectors that guard it.
#[derive(Debug, Clone)]
pub struct CleanupArea {
    /// Kind of resource cleaned.
    pub item_type: ItemType,
    /// Detectors evaluated for every item, in order.
    pub detectors: Vec<Detector>,
}

impl CleanupArea {
    /// Creates an area.
    #[must_use]
    pub const fn new(item_type: ItemType, detectors: Vec<Detector>) -> Self {
        Self {
            item_type,
            detectors,
        }
    }

    /// Returns true if any detector needs the tenant's instances.
    #[must_use]
    pub fn needs_instances(&self) -> bool {
        self.detectors.iter().any(Detector::needs_instances)
    }
}

/// Compiles a validated document.
///
/// Relative tracking database paths are resolved against the directory of
/// `config_path`.
///
/// # Errors
///
/// Returns an error if a password cannot be resolved or a setting cannot be
/// turned into a detector.
pub fn compile(spec: &CleanerSpec, config_path: Option<&Path>) -> Result<Configuration> {
    let general = GeneralConfig {
        run_every: spec.general.run_every,
        log: spec.general.log.clone(),
        tracking_database: resolve_tracking_database(
            spec.general.tracking_database.as_deref(),
            config_path,
        ),
        max_simultaneous_deletes: spec.general.max_simultaneous_deletes,
    };

    let cleanups = spec
        .cleanup
        .iter()
        .map(compile_cleanup)
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Compiled {} cleanup configurations, tracking database at {}",
        cleanups.len(),
        general.tracking_database.display()
    );
    Ok(Configuration { general, cleanups })
}

fn compile_cleanup(cleanup: &CleanupSpec) -> Result<CleanupConfig> {
    let credentials = cleanup
        .credentials
        .iter()
        .map(|credential| -> Result<Credentials> {
            Ok(Credentials::new(
                cleanup.openstack_auth_url.clone(),
                cleanup.tenant.clone(),
                credential.username.clone(),
                resolve_password(credential)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut areas = Vec::new();
    let configured = [
        (ItemType::Image, cleanup.images.as_ref()),
        (ItemType::Instance, cleanup.instances.as_ref()),
        (ItemType::KeyPair, cleanup.key_pairs.as_ref()),
    ];
    for (item_type, area) in configured {
        if let Some(area) = area.filter(|a| a.enabled) {
            areas.push(CleanupArea::new(item_type, area_detectors(item_type, area)?));
        }
    }

    Ok(CleanupConfig { credentials, areas })
}

/// Builds the detector list of an area.
///
/// # Errors
///
/// Returns an error if an exclude pattern or age threshold is invalid.
pub fn area_detectors(item_type: ItemType, area: &AreaSpec) -> Result<Vec<Detector>> {
    let mut detectors = Vec::new();

    if !area.exclude.is_empty() {
        detectors.push(Detector::Exclude(ExcludePatterns::new(&area.exclude)?));
    }

    if let Some(threshold) = area.remove_if_older_than {
        let threshold = chrono::Duration::from_std(threshold).map_err(|e| {
            ConfigError::validation(
                format!("Age threshold is out of range: {e}"),
                "remove-if-older-than",
            )
        })?;
        detectors.push(Detector::OlderThan(threshold));
    }

    match item_type {
        ItemType::Image => {
            detectors.push(Detector::ProtectedImage);
            if area.remove_only_if_unused {
                detectors.push(Detector::ImageInUse);
            }
        }
        ItemType::KeyPair => {
            if area.remove_only_if_unused {
                detectors.push(Detector::KeyPairInUse);
            }
        }
        ItemType::Instance => {}
    }

    Ok(detectors)
}

fn resolve_tracking_database(configured: Option<&Path>, config_path: Option<&Path>) -> PathBuf {
    let config_dir = config_path.and_then(Path::parent);

    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => config_dir.map_or_else(|| path.to_path_buf(), |dir| dir.join(path)),
        None => dirs::data_dir().map_or_else(
            || {
                config_dir
                    .unwrap_or_else(|| Path::new("."))
                    .join(DEFAULT_TRACKING_DATABASE)
            },
            |dir| dir.join("tenant-cleaner").join(DEFAULT_TRACKING_DATABASE),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    const CONFIG: &str = r#"
general:
  run-every: 15m
  tracking-database: state/tracking.json
cleanup:
  - openstack-auth-url: http://keystone:5000/v2.0
    tenant: first
    credentials:
      - username: alice
        password: a
      - username: bob
        password: b
    instances:
      remove-if-older-than: 1d
      exclude: ["keep-.*"]
    images:
      remove-if-older-than: 31d
    key-pairs:
      remove-if-older-than: 1h
      remove-only-if-unused: false
  - openstack-auth-url: http://keystone:5000/v2.0
    tenant: second
    credentials:
      - username: carol
        password: c
    images:
      enabled: false
    key-pairs: {}
"#;

    fn compiled() -> Configuration {
        let spec = ConfigParser::new().parse_yaml(CONFIG, None).unwrap();
        compile(&spec, Some(Path::new("/etc/cleaner/config.yml"))).unwrap()
    }

    fn names(area: &CleanupArea) -> Vec<&'static str> {
        area.detectors.iter().map(Detector::name).collect()
    }

    #[test]
    fn test_each_entry_is_its_own_cleanup() {
        let configuration = compiled();
        assert_eq!(configuration.cleanups.len(), 2);
        assert_eq!(configuration.cleanups[0].credentials.len(), 2);
        assert_eq!(configuration.cleanups[0].credentials[0].tenant, "first");
        assert_eq!(configuration.cleanups[1].credentials[0].username, "carol");
    }

    #[test]
    fn test_detectors_per_area() {
        let configuration = compiled();
        let areas = &configuration.cleanups[0].areas;

        let types: Vec<_> = areas.iter().map(|a| a.item_type).collect();
        assert_eq!(
            types,
            vec![ItemType::Image, ItemType::Instance, ItemType::KeyPair]
        );
        assert_eq!(
            names(&areas[0]),
            vec!["older-than", "protected-image", "image-in-use"]
        );
        assert_eq!(names(&areas[1]), vec!["exclude", "older-than"]);
        assert_eq!(names(&areas[2]), vec!["older-than"]);
        assert!(areas[0].needs_instances());
        assert!(!areas[1].needs_instances());
    }

    #[test]
    fn test_disabled_area_is_left_out() {
        let configuration = compiled();
        let areas = &configuration.cleanups[1].areas;
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].item_type, ItemType::KeyPair);
        assert_eq!(names(&areas[0]), vec!["key-pair-in-use"]);
    }

    #[test]
    fn test_credentials_for_area() {
        let configuration = compiled();
        let cleanup = &configuration.cleanups[0];
        assert_eq!(cleanup.credentials_for(ItemType::KeyPair).len(), 2);
        let first = cleanup.credentials_for(ItemType::Image);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].username, "alice");
    }

    #[test]
    fn test_tracking_database_relative_to_config() {
        let configuration = compiled();
        assert_eq!(
            configuration.general.tracking_database,
            PathBuf::from("/etc/cleaner/state/tracking.json")
        );
    }

    #[test]
    fn test_absolute_tracking_database() {
        let path = resolve_tracking_database(
            Some(Path::new("/var/lib/tracking.json")),
            Some(Path::new("/etc/cleaner/config.yml")),
        );
        assert_eq!(path, PathBuf::from("/var/lib/tracking.json"));
    }

    #[test]
    fn test_password_from_environment() {
        let yaml = CONFIG.replace("password: c", "password-env: PATH");
        let spec = ConfigParser::new().parse_yaml(&yaml, None).unwrap();

        let configuration = compile(&spec, None).unwrap();
        assert_eq!(
            configuration.cleanups[1].credentials[0].password,
            std::env::var("PATH").unwrap()
        );
    }
}
