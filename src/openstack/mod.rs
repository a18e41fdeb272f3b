//! `OpenStack` resource managers.
//!
//! The planner only sees the [`ResourceManager`] and [`ManagerFactory`]
//! traits. This module also provides the implementation backed by the
//! Keystone, Nova and Glance HTTP APIs.

mod client;
mod manager;
mod types;

pub use client::OpenStackClient;
pub use manager::{ManagerFactory, OpenStackManager, OpenStackManagerFactory, ResourceManager};
pub use types::Session;

#[cfg(test)]
pub use manager::MockResourceManager;
