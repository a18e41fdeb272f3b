//! Planning module for cleanup runs.
//!
//! This module builds per-area reports, composes them into ordered cleanup
//! plans, explains the plans and executes their deletions.

mod executor;
mod explain;
mod plan;
mod report;

#[cfg(test)]
pub(crate) mod fakes;

pub use executor::{ExecutionResult, PlanExecutor};
pub use explain::explain;
pub use plan::{order_areas, AreaPlan, CleanupPlan, DeleteSetup, PlanBuilder};
pub use report::{
    build_area_report, evaluate_items, reconcile_tracker, AreaReport, ItemAndReasons,
};
