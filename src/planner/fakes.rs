//! In-process resource managers for planner tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{OpenStackError, Result};
use crate::models::{Credentials, Image, Instance, Item, ItemType, KeyPair};
use crate::openstack::{ManagerFactory, ResourceManager};

pub fn credentials(username: &str) -> Credentials {
    Credentials::new("http://keystone:5000/v2.0", "tenant", username, "secret")
}

pub fn instance(identifier: &str, image: Option<&str>, key_name: Option<&str>, age_days: i64) -> Item {
    let created_at = Utc::now() - Duration::days(age_days);
    Instance {
        identifier: identifier.to_string(),
        name: format!("instance-{identifier}"),
        image: image.map(str::to_string),
        key_name: key_name.map(str::to_string),
        created_at,
        updated_at: created_at,
    }
    .into()
}

pub fn image(identifier: &str, protected: bool, age_days: i64) -> Item {
    let created_at = Utc::now() - Duration::days(age_days);
    Image {
        identifier: identifier.to_string(),
        name: format!("image-{identifier}"),
        protected,
        created_at,
        updated_at: created_at,
    }
    .into()
}

pub fn key_pair(name: &str) -> Item {
    KeyPair {
        identifier: name.to_string(),
        name: name.to_string(),
        fingerprint: String::from("aa:bb:cc"),
    }
    .into()
}

/// Serves a fixed listing and records deletions.
#[derive(Debug)]
pub struct FakeManager {
    item_type: ItemType,
    credentials: Credentials,
    items: Vec<Item>,
    pub deleted: Mutex<Vec<Item>>,
}

impl FakeManager {
    pub fn new(item_type: ItemType, credentials: Credentials, items: Vec<Item>) -> Self {
        Self {
            item_type,
            credentials,
            items,
            deleted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ResourceManager for FakeManager {
    fn item_type(&self) -> ItemType {
        self.item_type
    }

    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    async fn list_all(&self) -> Result<Vec<Item>> {
        Ok(self.items.clone())
    }

    async fn delete(&self, item: &Item) -> Result<()> {
        self.deleted.lock().unwrap().push(item.clone());
        Ok(())
    }
}

/// Hands out [`FakeManager`]s with listings keyed by type and user name.
#[derive(Debug, Default)]
pub struct FakeFactory {
    listings: HashMap<(ItemType, String), Vec<Item>>,
    pub created: Mutex<Vec<(ItemType, String)>>,
    pub failing: Option<ItemType>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets what a user sees in an area.
    pub fn with(mut self, item_type: ItemType, username: &str, items: Vec<Item>) -> Self {
        self.listings.insert((item_type, username.to_string()), items);
        self
    }

    /// Makes listing an area fail.
    pub fn failing(mut self, item_type: ItemType) -> Self {
        self.failing = Some(item_type);
        self
    }
}

/// A manager whose listing always fails.
#[derive(Debug)]
struct BrokenManager {
    item_type: ItemType,
    credentials: Credentials,
}

#[async_trait]
impl ResourceManager for BrokenManager {
    fn item_type(&self) -> ItemType {
        self.item_type
    }

    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    async fn list_all(&self) -> Result<Vec<Item>> {
        Err(OpenStackError::api_error(503, "service unavailable").into())
    }

    async fn delete(&self, _item: &Item) -> Result<()> {
        Ok(())
    }
}

impl ManagerFactory for FakeFactory {
    fn create(
        &self,
        item_type: ItemType,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ResourceManager>> {
        self.created
            .lock()
            .unwrap()
            .push((item_type, credentials.username.clone()));

        if self.failing == Some(item_type) {
            return Ok(Arc::new(BrokenManager {
                item_type,
                credentials: credentials.clone(),
            }));
        }

        let items = self
            .listings
            .get(&(item_type, credentials.username.clone()))
            .cloned()
            .unwrap_or_default();
        Ok(Arc::new(FakeManager::new(
            item_type,
            credentials.clone(),
            items,
        )))
    }
}
