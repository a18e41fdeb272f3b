//! Age tracking for tenant resources.
//!
//! The cloud cannot always say when a resource was created (key-pairs in
//! particular), so the cleaner remembers when it first saw each item. The
//! records are kept in a single table keyed by `(identifier, type)`.

mod tracker;
mod memory;
mod local;

pub use tracker::{Tracker, TrackingRecord};
pub use memory::MemoryTracker;
pub use local::LocalTracker;
