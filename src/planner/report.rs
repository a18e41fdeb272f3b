//! Area reports: tracker reconciliation and detector evaluation for one area.
//!
//! Building a report reconciles the tracker with the live listing before any
//! detector runs, so a freshly discovered item always has an age.

use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::detection::{CarryOver, Detection, DetectionContext, Detector};
use crate::error::Result;
use crate::models::{Instance, Item, ItemType};
use crate::openstack::ResourceManager;
use crate::tracking::Tracker;

/// An item and the outcome of every detector evaluated for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemAndReasons {
    /// The item.
    pub item: Item,
    /// One detection per configured detector, in detector order.
    pub detections: Vec<Detection>,
}

impl ItemAndReasons {
    /// Returns true if any detector prevented deletion.
    #[must_use]
    pub fn is_prevented(&self) -> bool {
        self.detections.iter().any(|d| d.prevented)
    }

    /// Reasons of the detectors that prevented deletion.
    #[must_use]
    pub fn prevent_reasons(&self) -> Vec<&str> {
        self.reasons_where(true)
    }

    /// Reasons of the detectors that allowed deletion.
    #[must_use]
    pub fn allow_reasons(&self) -> Vec<&str> {
        self.reasons_where(false)
    }

    fn reasons_where(&self, prevented: bool) -> Vec<&str> {
        self.detections
            .iter()
            .filter(|d| d.prevented == prevented)
            .map(|d| d.reason.as_str())
            .collect()
    }
}

/// The partition of one area's items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AreaReport {
    /// Items every detector allowed.
    pub marked: Vec<ItemAndReasons>,
    /// Items at least one detector prevented.
    pub spared: Vec<ItemAndReasons>,
}

/// Builds the report for the area handled by `manager`.
///
/// `instances` are the tenant's instances, needed only by the in-use
/// detectors. The tracker is reconciled against this one listing, so an area
/// processed with several identities goes through [`reconcile_tracker`] and
/// [`evaluate_items`] separately instead.
///
/// # Errors
///
/// Returns an error if the listing fails or the tracker cannot be read or
/// updated.
pub async fn build_area_report(
    manager: &dyn ResourceManager,
    detectors: &[Detector],
    tracker: &dyn Tracker,
    carry_over: &CarryOver,
    instances: &[Instance],
) -> Result<AreaReport> {
    let items = dedup(manager.list_all().await?);
    reconcile_tracker(tracker, manager.item_type(), &items).await?;

    let context = DetectionContext {
        credentials: manager.credentials(),
        tracker,
        carry_over,
        instances,
    };
    evaluate_items(items, detectors, &context).await
}

/// Brings the tracker in line with the complete live listing of one area.
///
/// Items not yet tracked are registered and records of `item_type` items
/// missing from `items` are dropped. Records of other types are untouched.
///
/// # Errors
///
/// Returns an error if the tracker cannot be read or updated.
pub async fn reconcile_tracker(
    tracker: &dyn Tracker,
    item_type: ItemType,
    items: &[Item],
) -> Result<()> {
    let registered = tracker.registered_identifiers(Some(item_type)).await?;

    let new_items: Vec<Item> = items
        .iter()
        .filter(|item| item.item_type() == item_type && !registered.contains(item.identifier()))
        .cloned()
        .collect();
    tracker.register(&new_items).await?;

    let live: HashSet<&str> = items.iter().map(Item::identifier).collect();
    let mut stale: Vec<String> = registered
        .iter()
        .filter(|identifier| !live.contains(identifier.as_str()))
        .cloned()
        .collect();
    stale.sort();
    tracker.unregister(item_type, &stale).await?;

    debug!(
        "{item_type} tracking: {} live, {} new, {} gone",
        items.len(),
        new_items.len(),
        stale.len()
    );
    Ok(())
}

/// Evaluates every detector for every item and partitions the items.
///
/// Detectors are never short-circuited: each item carries one detection per
/// detector, in detector order.
///
/// # Errors
///
/// Returns an error if a detector cannot read the tracker.
pub async fn evaluate_items(
    items: Vec<Item>,
    detectors: &[Detector],
    context: &DetectionContext<'_>,
) -> Result<AreaReport> {
    let mut report = AreaReport::default();
    for item in items {
        let mut detections = Vec::with_capacity(detectors.len());
        for detector in detectors {
            detections.push(detector.detect(&item, context).await?);
        }

        let entry = ItemAndReasons { item, detections };
        if entry.is_prevented() {
            report.spared.push(entry);
        } else {
            report.marked.push(entry);
        }
    }

    Ok(report)
}

/// Drops repeated listings of the same item, keeping the first.
pub(crate) fn dedup(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::ExcludePatterns;
    use crate::planner::fakes::{credentials, image, key_pair, FakeManager};
    use crate::tracking::{MemoryTracker, TrackingRecord};
    use chrono::{Duration, Utc};

    fn manager(item_type: ItemType, items: Vec<Item>) -> FakeManager {
        FakeManager::new(item_type, credentials("user"), items)
    }

    async fn track(tracker: &MemoryTracker, item: &Item, age: Duration) {
        tracker
            .insert(TrackingRecord::new(item.key(), Utc::now() - age))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reconciles_tracker_with_listing() {
        let tracker = MemoryTracker::new();
        track(&tracker, &key_pair("a"), Duration::hours(1)).await;
        track(&tracker, &key_pair("b"), Duration::hours(1)).await;
        // Same identifier, other type: must survive.
        track(&tracker, &image("a", false, 1), Duration::hours(1)).await;

        let manager = manager(ItemType::KeyPair, vec![key_pair("b"), key_pair("c")]);
        build_area_report(&manager, &[], &tracker, &CarryOver::new(), &[])
            .await
            .unwrap();

        let tracked = tracker
            .registered_identifiers(Some(ItemType::KeyPair))
            .await
            .unwrap();
        assert_eq!(
            tracked,
            HashSet::from([String::from("b"), String::from("c")])
        );
        let images = tracker
            .registered_identifiers(Some(ItemType::Image))
            .await
            .unwrap();
        assert_eq!(images, HashSet::from([String::from("a")]));
    }

    #[tokio::test]
    async fn test_reconcile_keeps_records_of_every_listed_item() {
        let tracker = MemoryTracker::new();
        let first_seen = Utc::now() - Duration::hours(2);
        for name in ["alice-key", "bob-key", "gone"] {
            tracker
                .insert(TrackingRecord::new(key_pair(name).key(), first_seen))
                .await
                .unwrap();
        }

        let listed = [key_pair("alice-key"), key_pair("bob-key")];
        reconcile_tracker(&tracker, ItemType::KeyPair, &listed)
            .await
            .unwrap();

        let tracked = tracker
            .registered_identifiers(Some(ItemType::KeyPair))
            .await
            .unwrap();
        assert_eq!(
            tracked,
            HashSet::from([String::from("alice-key"), String::from("bob-key")])
        );
        let age = tracker.get_age(&key_pair("bob-key")).await.unwrap().unwrap();
        assert!(age > Duration::hours(1));
    }

    #[tokio::test]
    async fn test_new_item_has_age_on_first_run() {
        let tracker = MemoryTracker::new();
        let manager = manager(ItemType::KeyPair, vec![key_pair("fresh")]);

        let report = build_area_report(
            &manager,
            &[Detector::OlderThan(Duration::hours(1))],
            &tracker,
            &CarryOver::new(),
            &[],
        )
        .await
        .unwrap();

        assert!(report.marked.is_empty());
        let reasons = report.spared[0].prevent_reasons();
        assert!(reasons[0].contains("not older than"));
        assert!(reasons[0].starts_with("Item age: 0s"));
    }

    #[tokio::test]
    async fn test_all_detectors_allow_marks_item() {
        let tracker = MemoryTracker::new();
        let item = key_pair("old");
        track(&tracker, &item, Duration::hours(2)).await;
        let manager = manager(ItemType::KeyPair, vec![item]);

        let detectors = [
            Detector::Exclude(ExcludePatterns::new(&["keep-.*"]).unwrap()),
            Detector::OlderThan(Duration::hours(1)),
            Detector::KeyPairInUse,
        ];
        let report = build_area_report(&manager, &detectors, &tracker, &CarryOver::new(), &[])
            .await
            .unwrap();

        assert_eq!(report.marked.len(), 1);
        assert!(report.spared.is_empty());
        assert_eq!(report.marked[0].detections.len(), 3);
        assert_eq!(report.marked[0].allow_reasons().len(), 3);
    }

    #[tokio::test]
    async fn test_any_prevention_spares_item_with_every_reason() {
        let tracker = MemoryTracker::new();
        let item = key_pair("keep-me");
        track(&tracker, &item, Duration::hours(2)).await;
        let manager = manager(ItemType::KeyPair, vec![item]);

        let detectors = [
            Detector::OlderThan(Duration::hours(1)),
            Detector::Exclude(ExcludePatterns::new(&["keep-.*"]).unwrap()),
        ];
        let report = build_area_report(&manager, &detectors, &tracker, &CarryOver::new(), &[])
            .await
            .unwrap();

        assert!(report.marked.is_empty());
        let spared = &report.spared[0];
        assert_eq!(spared.detections.len(), 2);
        assert_eq!(spared.prevent_reasons(), vec!["Exclude matched: keep-.*"]);
        assert_eq!(spared.allow_reasons().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_listings_are_reported_once() {
        let tracker = MemoryTracker::new();
        let manager = manager(ItemType::KeyPair, vec![key_pair("k"), key_pair("k")]);

        let report = build_area_report(&manager, &[], &tracker, &CarryOver::new(), &[])
            .await
            .unwrap();
        assert_eq!(report.marked.len(), 1);
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        use crate::planner::fakes::FakeFactory;
        use crate::openstack::ManagerFactory;

        let factory = FakeFactory::new().failing(ItemType::Image);
        let manager = factory.create(ItemType::Image, &credentials("user")).unwrap();
        let tracker = MemoryTracker::new();

        let result =
            build_area_report(manager.as_ref(), &[], &tracker, &CarryOver::new(), &[]).await;
        assert!(result.is_err());
        assert!(tracker.is_empty().await);
    }
}
