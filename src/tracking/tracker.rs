//! Tracker trait definition.
//!
//! Backends only have to implement record storage; registration semantics
//! live in the provided methods. A backend may override them to handle a
//! whole batch at once, keeping the same semantics.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::{Item, ItemKey, ItemType};

/// A single row of the tracking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRecord {
    /// Item identifier.
    pub identifier: String,
    /// Item type.
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// When the item was first seen (or created, if the cloud said so).
    pub first_seen_at: DateTime<Utc>,
}

impl TrackingRecord {
    /// Creates a new record.
    #[must_use]
    pub fn new(key: ItemKey, first_seen_at: DateTime<Utc>) -> Self {
        Self {
            identifier: key.identifier,
            item_type: key.item_type,
            first_seen_at,
        }
    }

    /// Returns the record's type-scoped key.
    #[must_use]
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.item_type, self.identifier.clone())
    }
}

/// Persistent store of first-seen times.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Gets the first-seen time recorded for a key, if any.
    async fn first_seen(&self, key: &ItemKey) -> Result<Option<DateTime<Utc>>>;

    /// Stores a record, replacing any record with the same key.
    async fn insert(&self, record: TrackingRecord) -> Result<()>;

    /// Removes the record for a key. Removing a missing key is a no-op.
    async fn remove(&self, key: &ItemKey) -> Result<()>;

    /// Gets all tracked identifiers, optionally restricted to one type.
    async fn registered_identifiers(&self, item_type: Option<ItemType>) -> Result<HashSet<String>>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;

    /// Gets how long ago the item was first seen, if it is tracked.
    async fn get_age(&self, item: &Item) -> Result<Option<Duration>> {
        Ok(self
            .first_seen(&item.key())
            .await?
            .map(|first_seen| Utc::now() - first_seen))
    }

    /// Registers items that are not yet tracked.
    ///
    /// The cloud's creation time is used when the item has one, otherwise the
    /// current time. Already tracked items are left untouched.
    async fn register(&self, items: &[Item]) -> Result<()> {
        for item in items {
            if self.get_age(item).await?.is_some() {
                continue;
            }
            let first_seen = item.created_at().unwrap_or_else(Utc::now);
            debug!("Tracking {} (first seen {first_seen})", item.describe(true));
            self.insert(TrackingRecord::new(item.key(), first_seen)).await?;
        }
        Ok(())
    }

    /// Stops tracking the given identifiers of one type.
    async fn unregister(&self, item_type: ItemType, identifiers: &[String]) -> Result<()> {
        for identifier in identifiers {
            debug!("No longer tracking {item_type} \"{identifier}\"");
            self.remove(&ItemKey::new(item_type, identifier.clone())).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Tracker for Box<dyn Tracker> {
    async fn first_seen(&self, key: &ItemKey) -> Result<Option<DateTime<Utc>>> {
        (**self).first_seen(key).await
    }

    async fn insert(&self, record: TrackingRecord) -> Result<()> {
        (**self).insert(record).await
    }

    async fn remove(&self, key: &ItemKey) -> Result<()> {
        (**self).remove(key).await
    }

    async fn registered_identifiers(&self, item_type: Option<ItemType>) -> Result<HashSet<String>> {
        (**self).registered_identifiers(item_type).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }

    async fn get_age(&self, item: &Item) -> Result<Option<Duration>> {
        (**self).get_age(item).await
    }

    async fn register(&self, items: &[Item]) -> Result<()> {
        (**self).register(items).await
    }

    async fn unregister(&self, item_type: ItemType, identifiers: &[String]) -> Result<()> {
        (**self).unregister(item_type, identifiers).await
    }
}
