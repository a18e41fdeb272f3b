//! Plan executor.
//!
//! Deletions run concurrently, bounded by a semaphore. A failed deletion is
//! logged and counted; it never stops the others or fails the run.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::plan::{CleanupPlan, DeleteSetup};

/// Executor for cleanup plans.
#[derive(Debug, Clone, Copy)]
pub struct PlanExecutor {
    /// Maximum number of deletions in flight at once.
    max_simultaneous_deletes: usize,
}

/// Result of executing a set of plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Number of deletions attempted.
    pub attempted: usize,
    /// Number of items deleted.
    pub deleted: usize,
    /// Number of deletions that failed.
    pub failed: usize,
}

impl PlanExecutor {
    /// Creates an executor. A limit of zero is treated as one.
    #[must_use]
    pub fn new(max_simultaneous_deletes: usize) -> Self {
        Self {
            max_simultaneous_deletes: max_simultaneous_deletes.max(1),
        }
    }

    /// Returns the concurrency limit.
    #[must_use]
    pub const fn max_simultaneous_deletes(&self) -> usize {
        self.max_simultaneous_deletes
    }

    /// Deletes every planned item of every plan and waits for all deletions.
    pub async fn execute(&self, plans: &[CleanupPlan]) -> ExecutionResult {
        let setups: Vec<DeleteSetup> = plans
            .iter()
            .flat_map(|plan| plan.areas.iter())
            .flat_map(|area| area.delete_setups.iter().cloned())
            .collect();

        let mut result = ExecutionResult {
            attempted: setups.len(),
            ..ExecutionResult::default()
        };
        if setups.is_empty() {
            debug!("Nothing to delete");
            return result;
        }

        let semaphore = Arc::new(Semaphore::new(self.max_simultaneous_deletes));
        let mut tasks = JoinSet::new();

        for setup in setups {
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return false;
                };
                let description = setup.item.describe(true);
                info!("Deleting item {description}");

                match setup.manager.delete(&setup.item).await {
                    Ok(()) => {
                        debug!("Deleted item {description}");
                        true
                    }
                    Err(e) => {
                        error!("Failed to delete item {description}: {e}");
                        false
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => result.deleted += 1,
                Ok(false) => result.failed += 1,
                Err(e) => {
                    error!("Delete task did not complete: {e}");
                    result.failed += 1;
                }
            }
        }

        info!("{result}");
        result
    }
}

impl ExecutionResult {
    /// Returns true if every attempted deletion succeeded.
    #[must_use]
    pub const fn all_successful(&self) -> bool {
        self.failed == 0
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} item(s) deleted, {} failed",
            self.deleted, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpenStackError;
    use crate::models::{Item, ItemType};
    use crate::openstack::MockResourceManager;
    use crate::planner::fakes::{credentials, key_pair, FakeManager};
    use crate::planner::plan::AreaPlan;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn plan_with(setups: Vec<DeleteSetup>) -> CleanupPlan {
        CleanupPlan {
            areas: vec![AreaPlan {
                item_type: ItemType::KeyPair,
                delete_setups: setups,
                marked: Vec::new(),
                spared: Vec::new(),
            }],
        }
    }

    fn setups(manager: &Arc<dyn crate::openstack::ResourceManager>, names: &[&str]) -> Vec<DeleteSetup> {
        names
            .iter()
            .map(|name| DeleteSetup {
                item: key_pair(name),
                manager: Arc::clone(manager),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_plans() {
        let result = PlanExecutor::new(4).execute(&[]).await;
        assert_eq!(result, ExecutionResult::default());
    }

    #[tokio::test]
    async fn test_deletes_every_planned_item() {
        let fake = Arc::new(FakeManager::new(ItemType::KeyPair, credentials("alice"), vec![]));
        let manager: Arc<dyn crate::openstack::ResourceManager> = fake.clone();
        let plans = [
            plan_with(setups(&manager, &["a", "b"])),
            plan_with(setups(&manager, &["c"])),
        ];

        let result = PlanExecutor::new(2).execute(&plans).await;

        assert_eq!(result.attempted, 3);
        assert_eq!(result.deleted, 3);
        let mut deleted: Vec<String> = fake
            .deleted
            .lock()
            .unwrap()
            .iter()
            .map(|item| item.identifier().to_string())
            .collect();
        deleted.sort();
        assert_eq!(deleted, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_deletions() {
        let mut mock = MockResourceManager::new();
        mock.expect_delete().times(3).returning(|item: &Item| {
            if item.identifier() == "broken" {
                Err(OpenStackError::api_error(409, "conflict").into())
            } else {
                Ok(())
            }
        });
        let manager: Arc<dyn crate::openstack::ResourceManager> = Arc::new(mock);
        let plans = [plan_with(setups(&manager, &["a", "broken", "b"]))];

        let result = PlanExecutor::new(1).execute(&plans).await;

        assert_eq!(result.deleted, 2);
        assert_eq!(result.failed, 1);
        assert!(!result.all_successful());
    }

    struct SlowManager {
        credentials: crate::models::Credentials,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl crate::openstack::ResourceManager for SlowManager {
        fn item_type(&self) -> ItemType {
            ItemType::KeyPair
        }

        fn credentials(&self) -> &crate::models::Credentials {
            &self.credentials
        }

        async fn list_all(&self) -> crate::error::Result<Vec<Item>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _item: &Item) -> crate::error::Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let slow = Arc::new(SlowManager {
            credentials: credentials("alice"),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let manager: Arc<dyn crate::openstack::ResourceManager> = slow.clone();
        let names: Vec<String> = (0..10).map(|i| format!("key-{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let plans = [plan_with(setups(&manager, &names))];

        let result = PlanExecutor::new(3).execute(&plans).await;

        assert_eq!(result.deleted, 10);
        assert!(slow.peak.load(Ordering::SeqCst) <= 3);
        assert!(slow.peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_zero_limit_is_raised_to_one() {
        assert_eq!(PlanExecutor::new(0).max_simultaneous_deletes(), 1);
    }
}
