//! Cleanup plan types and construction.
//!
//! A plan is built fresh on every run: one [`CleanupPlan`] per configured
//! tenant, each holding one [`AreaPlan`] per enabled area in processing order.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{CleanupArea, CleanupConfig};
use crate::detection::{CarryOver, DetectionContext};
use crate::error::{PlanError, Result};
use crate::models::{Credentials, Instance, Item, ItemType};
use crate::openstack::{ManagerFactory, ResourceManager};
use crate::tracking::Tracker;

use super::report::{dedup, evaluate_items, reconcile_tracker, ItemAndReasons};

/// An item bound to the manager that deletes it.
#[derive(Clone)]
pub struct DeleteSetup {
    /// Item to delete.
    pub item: Item,
    /// Manager acting as the identity that listed the item.
    pub manager: Arc<dyn ResourceManager>,
}

impl std::fmt::Debug for DeleteSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteSetup")
            .field("item", &self.item)
            .field("username", &self.manager.credentials().username)
            .finish()
    }
}

/// Decisions for one area of one cleanup.
#[derive(Debug, Clone, Serialize)]
pub struct AreaPlan {
    /// Area the decisions are for.
    pub item_type: ItemType,
    /// Deletions to perform. Always empty in a dry run.
    #[serde(skip)]
    pub delete_setups: Vec<DeleteSetup>,
    /// Items marked for deletion, with every detector's reason.
    pub marked: Vec<ItemAndReasons>,
    /// Items spared, with every detector's reason.
    pub spared: Vec<ItemAndReasons>,
}

impl AreaPlan {
    fn new(item_type: ItemType) -> Self {
        Self {
            item_type,
            delete_setups: Vec::new(),
            marked: Vec::new(),
            spared: Vec::new(),
        }
    }
}

/// Decisions for one cleanup configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupPlan {
    /// Area plans in processing order.
    pub areas: Vec<AreaPlan>,
}

impl CleanupPlan {
    /// Returns the plan for an area, if the area was processed.
    #[must_use]
    pub fn area(&self, item_type: ItemType) -> Option<&AreaPlan> {
        self.areas.iter().find(|a| a.item_type == item_type)
    }

    /// Returns the number of items marked for deletion.
    #[must_use]
    pub fn marked_count(&self) -> usize {
        self.areas.iter().map(|a| a.marked.len()).sum()
    }

    /// Returns the number of items spared.
    #[must_use]
    pub fn spared_count(&self) -> usize {
        self.areas.iter().map(|a| a.spared.len()).sum()
    }

    /// Returns the number of deletions to perform.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.areas.iter().map(|a| a.delete_setups.len()).sum()
    }
}

/// Orders areas so instances come first, keeping the configured order of the rest.
///
/// Deleting an instance can free the image and key-pair it uses, so those
/// areas have to see the instance decisions.
#[must_use]
pub fn order_areas(areas: &[CleanupArea]) -> Vec<&CleanupArea> {
    let mut ordered: Vec<&CleanupArea> = areas.iter().collect();
    ordered.sort_by_key(|area| area.item_type != ItemType::Instance);
    ordered
}

/// Builds cleanup plans.
pub struct PlanBuilder<'a> {
    factory: &'a dyn ManagerFactory,
    tracker: &'a dyn Tracker,
    dry_run: bool,
}

impl<'a> PlanBuilder<'a> {
    /// Creates a builder. Plans are dry runs unless told otherwise.
    #[must_use]
    pub fn new(factory: &'a dyn ManagerFactory, tracker: &'a dyn Tracker) -> Self {
        Self {
            factory,
            tracker,
            dry_run: true,
        }
    }

    /// Sets whether deletions are planned.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Builds one plan per cleanup configuration, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if any area cannot be listed or the tracker fails.
    /// Partial plans are never returned.
    pub async fn build(&self, cleanups: &[CleanupConfig]) -> Result<Vec<CleanupPlan>> {
        let mut plans = Vec::with_capacity(cleanups.len());
        for (index, cleanup) in cleanups.iter().enumerate() {
            plans.push(self.build_cleanup(index, cleanup).await?);
        }
        Ok(plans)
    }

    /// Builds the plan of a single cleanup configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup has no credentials, an area cannot be
    /// listed, or the tracker fails.
    pub async fn build_cleanup(&self, index: usize, cleanup: &CleanupConfig) -> Result<CleanupPlan> {
        if cleanup.credentials.is_empty() {
            return Err(PlanError::NoCredentials { index }.into());
        }

        let mut plan = CleanupPlan::default();
        let mut carry_over = CarryOver::new();

        for area in order_areas(&cleanup.areas) {
            let area_plan = self
                .build_area(area, cleanup.credentials_for(area.item_type), &carry_over)
                .await?;
            carry_over.extend(area_plan.marked.iter().map(|entry| &entry.item));
            plan.areas.push(area_plan);
        }

        info!(
            "Cleanup configuration {}: {} marked for deletion, {} spared",
            index + 1,
            plan.marked_count(),
            plan.spared_count()
        );
        Ok(plan)
    }

    async fn build_area(
        &self,
        area: &CleanupArea,
        credentials: &[Credentials],
        carry_over: &CarryOver,
    ) -> Result<AreaPlan> {
        let mut listings = Vec::with_capacity(credentials.len());
        for credentials in credentials {
            let manager = self.factory.create(area.item_type, credentials)?;
            let items = dedup(manager.list_all().await?);
            let instances = if area.needs_instances() {
                self.list_instances(credentials).await?
            } else {
                Vec::new()
            };
            listings.push((manager, items, instances));
        }

        // Each identity only sees its own items, so the tracker is
        // reconciled against what all of them listed together.
        let live = dedup(
            listings
                .iter()
                .flat_map(|(_, items, _)| items.iter().cloned())
                .collect(),
        );
        reconcile_tracker(self.tracker, area.item_type, &live).await?;

        let mut area_plan = AreaPlan::new(area.item_type);
        for (manager, items, instances) in listings {
            debug!(
                "Building {} report as {} with {} item(s) carried over",
                area.item_type,
                manager.credentials().username,
                carry_over.len()
            );
            let context = DetectionContext {
                credentials: manager.credentials(),
                tracker: self.tracker,
                carry_over,
                instances: &instances,
            };
            let report = evaluate_items(items, &area.detectors, &context).await?;

            if !self.dry_run {
                area_plan
                    .delete_setups
                    .extend(report.marked.iter().map(|entry| DeleteSetup {
                        item: entry.item.clone(),
                        manager: Arc::clone(&manager),
                    }));
            }
            area_plan.marked.extend(report.marked);
            area_plan.spared.extend(report.spared);
        }

        Ok(area_plan)
    }

    async fn list_instances(&self, credentials: &Credentials) -> Result<Vec<Instance>> {
        let manager = self.factory.create(ItemType::Instance, credentials)?;
        Ok(manager
            .list_all()
            .await?
            .into_iter()
            .filter_map(|item| match item {
                Item::Instance(instance) => Some(instance),
                Item::Image(_) | Item::KeyPair(_) => None,
            })
            .collect())
    }
}
