//! File-backed tracker backend.
//!
//! The tracking table is stored as a JSON document. Every operation is a short
//! session: read the table, optionally change it, and write it back through a
//! temporary file and an atomic rename. Registration and unregistration handle
//! their whole batch in one session.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{CleanerError, Result, TrackingError};
use crate::models::{Item, ItemKey, ItemType};

use super::tracker::{Tracker, TrackingRecord};

/// Current version of the tracking file format.
pub const TRACKING_VERSION: &str = "1";

/// On-disk layout of the tracking table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackingTable {
    version: String,
    #[serde(default)]
    records: Vec<TrackingRecord>,
}

impl Default for TrackingTable {
    fn default() -> Self {
        Self {
            version: TRACKING_VERSION.to_string(),
            records: Vec::new(),
        }
    }
}

impl TrackingTable {
    fn position(&self, key: &ItemKey) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.item_type == key.item_type && r.identifier == key.identifier)
    }
}

/// Tracker persisted to a local JSON file.
#[derive(Debug)]
pub struct LocalTracker {
    /// Path to the tracking file.
    path: PathBuf,
    /// Serializes read-modify-write sessions.
    session: Mutex<()>,
    #[cfg(test)]
    saves: std::sync::atomic::AtomicUsize,
}

impl LocalTracker {
    /// Opens the tracking database at the given path, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or is unreadable.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let tracker = Self {
            path: path.into(),
            session: Mutex::new(()),
            #[cfg(test)]
            saves: std::sync::atomic::AtomicUsize::new(0),
        };

        if fs::try_exists(&tracker.path).await.unwrap_or(false) {
            // Fail early on a corrupted table rather than mid-run.
            tracker.load().await?;
        } else {
            info!("Creating tracking database: {}", tracker.path.display());
            tracker.save(&TrackingTable::default()).await?;
        }

        Ok(tracker)
    }

    /// Returns the path of the tracking file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<TrackingTable> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!("Tracking file does not exist: {}", self.path.display());
            return Ok(TrackingTable::default());
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            TrackingError::unavailable(format!("Failed to read tracking file: {e}"))
        })?;

        let table: TrackingTable = serde_json::from_str(&content).map_err(|e| {
            TrackingError::corrupted(format!("Failed to parse tracking file: {e}"))
        })?;

        if table.version != TRACKING_VERSION {
            return Err(TrackingError::corrupted(format!(
                "Unsupported tracking file version {} (expected {TRACKING_VERSION})",
                table.version
            ))
            .into());
        }

        Ok(table)
    }

    async fn save(&self, table: &TrackingTable) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                TrackingError::unavailable(format!("Failed to create tracking directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(table).map_err(|e| {
            CleanerError::Tracking(TrackingError::SerializationError {
                message: format!("Failed to serialize tracking table: {e}"),
            })
        })?;

        let temp_path = self.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            TrackingError::unavailable(format!("Failed to create temp tracking file: {e}"))
        })?;
        file.write_all(content.as_bytes()).await.map_err(|e| {
            TrackingError::unavailable(format!("Failed to write tracking file: {e}"))
        })?;
        file.sync_all().await.map_err(|e| {
            TrackingError::unavailable(format!("Failed to sync tracking file: {e}"))
        })?;

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            TrackingError::unavailable(format!("Failed to rename tracking file: {e}"))
        })?;

        #[cfg(test)]
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Tracker for LocalTracker {
    async fn first_seen(&self, key: &ItemKey) -> Result<Option<DateTime<Utc>>> {
        let _session = self.session.lock().await;
        let table = self.load().await?;
        Ok(table
            .position(key)
            .map(|index| table.records[index].first_seen_at))
    }

    async fn insert(&self, record: TrackingRecord) -> Result<()> {
        let _session = self.session.lock().await;
        let mut table = self.load().await?;
        match table.position(&record.key()) {
            Some(index) => table.records[index] = record,
            None => table.records.push(record),
        }
        self.save(&table).await
    }

    async fn remove(&self, key: &ItemKey) -> Result<()> {
        let _session = self.session.lock().await;
        let mut table = self.load().await?;
        let Some(index) = table.position(key) else {
            return Ok(());
        };
        table.records.swap_remove(index);
        self.save(&table).await
    }

    async fn registered_identifiers(&self, item_type: Option<ItemType>) -> Result<HashSet<String>> {
        let _session = self.session.lock().await;
        let table = self.load().await?;
        Ok(table
            .records
            .into_iter()
            .filter(|r| item_type.is_none_or(|t| r.item_type == t))
            .map(|r| r.identifier)
            .collect())
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }

    async fn register(&self, items: &[Item]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let _session = self.session.lock().await;
        let mut table = self.load().await?;
        let mut tracked: HashSet<ItemKey> = table.records.iter().map(TrackingRecord::key).collect();

        let before = table.records.len();
        for item in items {
            let key = item.key();
            if tracked.contains(&key) {
                continue;
            }
            let first_seen = item.created_at().unwrap_or_else(Utc::now);
            debug!("Tracking {} (first seen {first_seen})", item.describe(true));
            tracked.insert(key.clone());
            table.records.push(TrackingRecord::new(key, first_seen));
        }

        if table.records.len() == before {
            return Ok(());
        }
        self.save(&table).await
    }

    async fn unregister(&self, item_type: ItemType, identifiers: &[String]) -> Result<()> {
        if identifiers.is_empty() {
            return Ok(());
        }

        let _session = self.session.lock().await;
        let mut table = self.load().await?;
        let gone: HashSet<&str> = identifiers.iter().map(String::as_str).collect();

        let before = table.records.len();
        table.records.retain(|r| {
            let stale = r.item_type == item_type && gone.contains(r.identifier.as_str());
            if stale {
                debug!("No longer tracking {item_type} \"{}\"", r.identifier);
            }
            !stale
        });

        if table.records.len() == before {
            return Ok(());
        }
        self.save(&table).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeyPair;
    use std::sync::atomic::Ordering;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn create_test_tracker() -> (LocalTracker, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let tracker = LocalTracker::open(temp_dir.path().join("tracking.json"))
            .await
            .expect("Failed to open tracker");
        (tracker, temp_dir)
    }

    fn key_pair(identifier: &str) -> Item {
        KeyPair {
            identifier: identifier.to_string(),
            name: identifier.to_string(),
            fingerprint: String::new(),
        }
        .into()
    }

    #[tokio::test]
    async fn test_open_creates_database() {
        let (tracker, _temp) = create_test_tracker().await;
        assert!(tracker.path().exists());
        assert!(tracker.registered_identifiers(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let (tracker, temp) = create_test_tracker().await;
        let item = key_pair("persisted");
        let first_seen = Utc::now() - Duration::hours(3);
        tracker
            .insert(TrackingRecord::new(item.key(), first_seen))
            .await
            .unwrap();

        let reopened = LocalTracker::open(temp.path().join("tracking.json"))
            .await
            .unwrap();
        assert_eq!(
            reopened.first_seen(&item.key()).await.unwrap(),
            Some(first_seen)
        );
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let (tracker, _temp) = create_test_tracker().await;
        let items = vec![key_pair("a"), key_pair("b")];
        tracker.register(&items).await.unwrap();
        tracker.register(&items).await.unwrap();

        assert_eq!(
            tracker
                .registered_identifiers(Some(ItemType::KeyPair))
                .await
                .unwrap()
                .len(),
            2
        );

        tracker
            .unregister(ItemType::KeyPair, &[String::from("a"), String::from("missing")])
            .await
            .unwrap();

        assert_eq!(
            tracker.registered_identifiers(None).await.unwrap(),
            HashSet::from([String::from("b")])
        );
    }

    #[tokio::test]
    async fn test_batches_are_written_once() {
        let (tracker, _temp) = create_test_tracker().await;
        let existing = key_pair("existing");
        let first_seen = Utc::now() - Duration::hours(5);
        tracker
            .insert(TrackingRecord::new(existing.key(), first_seen))
            .await
            .unwrap();
        let saves = tracker.saves.load(Ordering::SeqCst);

        let items: Vec<Item> = (0..50)
            .map(|i| key_pair(&format!("key-{i}")))
            .chain([existing.clone(), key_pair("key-0")])
            .collect();
        tracker.register(&items).await.unwrap();
        assert_eq!(tracker.saves.load(Ordering::SeqCst), saves + 1);
        assert_eq!(tracker.registered_identifiers(None).await.unwrap().len(), 51);
        assert_eq!(
            tracker.first_seen(&existing.key()).await.unwrap(),
            Some(first_seen)
        );

        let gone: Vec<String> = (0..50).map(|i| format!("key-{i}")).collect();
        tracker.unregister(ItemType::KeyPair, &gone).await.unwrap();
        assert_eq!(tracker.saves.load(Ordering::SeqCst), saves + 2);

        // Nothing left to change: no rewrite.
        tracker.register(&[existing]).await.unwrap();
        tracker.unregister(ItemType::KeyPair, &gone).await.unwrap();
        assert_eq!(tracker.saves.load(Ordering::SeqCst), saves + 2);
        assert_eq!(
            tracker.registered_identifiers(None).await.unwrap(),
            HashSet::from([String::from("existing")])
        );
    }

    #[tokio::test]
    async fn test_unregister_is_type_scoped() {
        let (tracker, _temp) = create_test_tracker().await;
        tracker
            .insert(TrackingRecord::new(
                ItemKey::new(ItemType::Image, "shared"),
                Utc::now(),
            ))
            .await
            .unwrap();
        tracker.register(&[key_pair("shared")]).await.unwrap();

        tracker
            .unregister(ItemType::KeyPair, &[String::from("shared")])
            .await
            .unwrap();

        assert_eq!(
            tracker
                .registered_identifiers(Some(ItemType::Image))
                .await
                .unwrap(),
            HashSet::from([String::from("shared")])
        );
        assert!(tracker
            .registered_identifiers(Some(ItemType::KeyPair))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_corrupted_database_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tracking.json");
        std::fs::write(&path, "not json").unwrap();

        let result = LocalTracker::open(&path).await;
        assert!(matches!(
            result,
            Err(CleanerError::Tracking(TrackingError::Corrupted { .. }))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_sessions() {
        let (tracker, _temp) = create_test_tracker().await;
        let tracker = std::sync::Arc::new(tracker);

        let mut handles = Vec::new();
        for i in 0..8 {
            let tracker = std::sync::Arc::clone(&tracker);
            handles.push(tokio::spawn(async move {
                tracker.register(&[key_pair(&i.to_string())]).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(tracker.registered_identifiers(None).await.unwrap().len(), 8);
    }
}
