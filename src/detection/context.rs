//! Inputs shared by every detector evaluated within one area report.

use std::collections::HashSet;

use crate::models::{Credentials, Instance, Item, ItemKey};
use crate::tracking::Tracker;

/// Items already marked for deletion by areas processed earlier in the same
/// cleanup configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarryOver {
    keys: HashSet<ItemKey>,
}

impl CarryOver {
    /// Creates an empty carry-over set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item to the set.
    pub fn insert(&mut self, item: &Item) {
        self.keys.insert(item.key());
    }

    /// Returns true if the item is already marked for deletion.
    #[must_use]
    pub fn contains(&self, item: &Item) -> bool {
        self.keys.contains(&item.key())
    }

    /// Returns true if the key is already marked for deletion.
    #[must_use]
    pub fn contains_key(&self, key: &ItemKey) -> bool {
        self.keys.contains(key)
    }

    /// Returns the number of items in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<'a> Extend<&'a Item> for CarryOver {
    fn extend<T: IntoIterator<Item = &'a Item>>(&mut self, iter: T) {
        for item in iter {
            self.insert(item);
        }
    }
}

/// Everything a detector may consult besides the item itself.
#[derive(Clone, Copy)]
pub struct DetectionContext<'a> {
    /// Credentials the area is being processed with.
    pub credentials: &'a Credentials,
    /// Age tracker.
    pub tracker: &'a dyn Tracker,
    /// Items other areas have already marked for deletion.
    pub carry_over: &'a CarryOver,
    /// Instances visible with `credentials`, for in-use checks.
    pub instances: &'a [Instance],
}

impl std::fmt::Debug for DetectionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionContext")
            .field("credentials", self.credentials)
            .field("tracker", &self.tracker.backend_type())
            .field("carry_over", &self.carry_over.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}
