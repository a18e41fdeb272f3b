//! In-process tracker backend.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{ItemKey, ItemType};

use super::tracker::{Tracker, TrackingRecord};

/// Tracker that keeps its records in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    records: RwLock<HashMap<ItemKey, DateTime<Utc>>>,
}

impl MemoryTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tracked items.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if nothing is tracked.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl Tracker for MemoryTracker {
    async fn first_seen(&self, key: &ItemKey) -> Result<Option<DateTime<Utc>>> {
        Ok(self.records.read().await.get(key).copied())
    }

    async fn insert(&self, record: TrackingRecord) -> Result<()> {
        let first_seen = record.first_seen_at;
        self.records.write().await.insert(record.key(), first_seen);
        Ok(())
    }

    async fn remove(&self, key: &ItemKey) -> Result<()> {
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn registered_identifiers(&self, item_type: Option<ItemType>) -> Result<HashSet<String>> {
        Ok(self
            .records
            .read()
            .await
            .keys()
            .filter(|key| item_type.is_none_or(|t| key.item_type == t))
            .map(|key| key.identifier.clone())
            .collect())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Image, Item, KeyPair};
    use chrono::Duration;

    fn key_pair(identifier: &str) -> Item {
        KeyPair {
            identifier: identifier.to_string(),
            name: identifier.to_string(),
            fingerprint: String::new(),
        }
        .into()
    }

    fn image(identifier: &str, created_at: DateTime<Utc>) -> Item {
        Image {
            identifier: identifier.to_string(),
            name: identifier.to_string(),
            protected: false,
            created_at,
            updated_at: created_at,
        }
        .into()
    }

    #[tokio::test]
    async fn test_get_age_when_not_tracked() {
        let tracker = MemoryTracker::new();
        assert!(tracker.get_age(&key_pair("123")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_with_created_time() {
        let tracker = MemoryTracker::new();
        let created = Utc::now() - Duration::days(10);
        let item = image("123", created);

        let start = Utc::now();
        tracker.register(std::slice::from_ref(&item)).await.unwrap();
        let age = tracker.get_age(&item).await.unwrap().unwrap();
        let end = Utc::now();

        assert!(age >= start - created);
        assert!(age <= end - created);
    }

    #[tokio::test]
    async fn test_register_without_created_time() {
        let tracker = MemoryTracker::new();
        let item = key_pair("123");

        let start = Utc::now();
        tracker.register(std::slice::from_ref(&item)).await.unwrap();
        let age = tracker.get_age(&item).await.unwrap().unwrap();
        let end = Utc::now();

        assert!(age >= Duration::zero());
        assert!(age <= end - start);
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let tracker = MemoryTracker::new();
        let item = key_pair("123");
        let first_seen = Utc::now() - Duration::hours(2);
        tracker
            .insert(TrackingRecord::new(item.key(), first_seen))
            .await
            .unwrap();

        tracker.register(std::slice::from_ref(&item)).await.unwrap();
        tracker.register(std::slice::from_ref(&item)).await.unwrap();

        assert_eq!(tracker.len().await, 1);
        assert_eq!(
            tracker.first_seen(&item.key()).await.unwrap(),
            Some(first_seen)
        );
    }

    #[tokio::test]
    async fn test_registered_identifiers_of_type() {
        let tracker = MemoryTracker::new();
        let items = vec![
            key_pair("1"),
            key_pair("2"),
            image("3", Utc::now()),
        ];
        tracker.register(&items).await.unwrap();

        let all = tracker.registered_identifiers(None).await.unwrap();
        assert_eq!(all.len(), 3);

        let key_pairs = tracker
            .registered_identifiers(Some(ItemType::KeyPair))
            .await
            .unwrap();
        assert_eq!(
            key_pairs,
            HashSet::from([String::from("1"), String::from("2")])
        );
    }

    #[tokio::test]
    async fn test_unregister_is_type_scoped() {
        let tracker = MemoryTracker::new();
        let items = vec![key_pair("same"), image("same", Utc::now())];
        tracker.register(&items).await.unwrap();

        tracker
            .unregister(ItemType::KeyPair, &[String::from("same")])
            .await
            .unwrap();

        assert!(tracker.get_age(&items[0]).await.unwrap().is_none());
        assert!(tracker.get_age(&items[1]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unregister_when_not_tracked() {
        let tracker = MemoryTracker::new();
        tracker
            .unregister(ItemType::Image, &[String::from("missing")])
            .await
            .unwrap();
        assert!(tracker.is_empty().await);
    }
}
