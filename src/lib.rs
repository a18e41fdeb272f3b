// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is reported
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are reported
#![warn(unused_variables)]            // Unused variables are reported
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Tenant Cleaner
//!
//! Periodic, age-aware cleanup of `OpenStack` tenant resources.
//!
//! ## Overview
//!
//! The cleaner inspects the instances, images and key-pairs of one or more
//! tenants, decides with a set of composable detectors which of them are safe
//! to delete, and deletes them (or only reports, in a dry run).
//!
//! Key-pairs carry no creation time, so the cleaner remembers when it first
//! saw every item and computes ages from that record.
//!
//! ## Architecture
//!
//! 1. **Area reports**: each area (resource type) is listed, the tracker is
//!    reconciled with the listing, and every configured detector is evaluated
//!    for every item
//! 2. **Plans**: areas are processed instances first, and items marked for
//!    deletion are carried over so later areas can see them
//! 3. **Execution**: planned deletions run with bounded concurrency; a failed
//!    deletion is logged and does not stop the others
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing, validation and compilation
//! - [`models`]: Resource and credential value types
//! - [`tracking`]: First-seen time storage
//! - [`detection`]: Delete prevention detectors
//! - [`openstack`]: Resource managers and the `OpenStack` API client
//! - [`planner`]: Area reports, plans, explanation and execution
//! - [`runner`]: Single and periodic runs
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! general:
//!   run-every: 15m
//!   tracking-database: tracking.json
//!
//! cleanup:
//!   - openstack-auth-url: http://keystone.example.com:5000/v2.0
//!     tenant: my-tenant
//!     credentials:
//!       - username: cleaner
//!         password-env: CLEANER_PASSWORD
//!     instances:
//!       remove-if-older-than: 1d
//!       exclude: ["my-special-instance.*"]
//!     images:
//!       remove-if-older-than: 31d
//!     key-pairs:
//!       remove-if-older-than: 1h
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod openstack;
pub mod planner;
pub mod runner;
pub mod tracking;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, OutputFormatter};
pub use config::{CleanupConfig, ConfigParser, ConfigValidator, Configuration};
pub use detection::{CarryOver, Detection, Detector};
pub use error::{CleanerError, Result};
pub use models::{Credentials, Image, Instance, Item, ItemKey, ItemType, KeyPair};
pub use openstack::{ManagerFactory, OpenStackClient, OpenStackManagerFactory, ResourceManager};
pub use planner::{explain, CleanupPlan, PlanBuilder, PlanExecutor};
pub use runner::{RunSummary, Runner};
pub use tracking::{LocalTracker, MemoryTracker, Tracker};
