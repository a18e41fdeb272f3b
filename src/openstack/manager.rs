//! Resource managers: list and delete the items of one type.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::error::{CleanerError, OpenStackError, Result};
use crate::models::{Credentials, Item, ItemType};

use super::client::OpenStackClient;

/// Lists and deletes the items of a single type with a single identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// Returns the item type this manager handles.
    fn item_type(&self) -> ItemType;

    /// Returns the identity this manager acts as.
    fn credentials(&self) -> &Credentials;

    /// Lists every item of this manager's type visible to its identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    async fn list_all(&self) -> Result<Vec<Item>>;

    /// Deletes the given item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is of another type or the deletion fails.
    async fn delete(&self, item: &Item) -> Result<()>;
}

/// Creates resource managers for an item type and identity.
pub trait ManagerFactory: Send + Sync {
    /// Creates a manager for the given item type acting as the given identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager cannot be created.
    fn create(
        &self,
        item_type: ItemType,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ResourceManager>>;
}

/// A resource manager backed by the `OpenStack` APIs.
#[derive(Debug, Clone)]
pub struct OpenStackManager {
    item_type: ItemType,
    client: Arc<OpenStackClient>,
}

impl OpenStackManager {
    /// Creates a manager for the given item type using a shared client.
    #[must_use]
    pub const fn new(item_type: ItemType, client: Arc<OpenStackClient>) -> Self {
        Self { item_type, client }
    }
}

#[async_trait]
impl ResourceManager for OpenStackManager {
    fn item_type(&self) -> ItemType {
        self.item_type
    }

    fn credentials(&self) -> &Credentials {
        self.client.credentials()
    }

    async fn list_all(&self) -> Result<Vec<Item>> {
        let items = match self.item_type {
            ItemType::Instance => self
                .client
                .list_instances()
                .await?
                .into_iter()
                .map(Item::from)
                .collect(),
            ItemType::Image => self
                .client
                .list_images()
                .await?
                .into_iter()
                .map(Item::from)
                .collect(),
            ItemType::KeyPair => self
                .client
                .list_key_pairs()
                .await?
                .into_iter()
                .map(Item::from)
                .collect(),
        };
        Ok(items)
    }

    async fn delete(&self, item: &Item) -> Result<()> {
        if item.item_type() != self.item_type {
            return Err(OpenStackError::ItemTypeMismatch {
                expected: self.item_type,
                found: item.item_type(),
            }
            .into());
        }

        match item {
            Item::Instance(instance) => self.client.delete_instance(&instance.identifier).await,
            Item::Image(image) => self.client.delete_image(&image.identifier).await,
            Item::KeyPair(key_pair) => self.client.delete_key_pair(&key_pair.name).await,
        }
    }
}

/// Creates [`OpenStackManager`]s, sharing one client per identity.
///
/// Sharing the client means the instance, image and key-pair managers of an
/// identity reuse one Keystone token.
#[derive(Debug)]
pub struct OpenStackManagerFactory {
    timeout: Duration,
    clients: Mutex<HashMap<Credentials, Arc<OpenStackClient>>>,
}

impl OpenStackManagerFactory {
    /// Creates a factory whose clients use the given request timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, credentials: &Credentials) -> Result<Arc<OpenStackClient>> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| CleanerError::internal("OpenStack client cache lock poisoned"))?;

        if let Some(client) = clients.get(credentials) {
            return Ok(Arc::clone(client));
        }

        debug!(
            "Creating OpenStack client for {} in tenant {}",
            credentials.username, credentials.tenant
        );
        let client = Arc::new(OpenStackClient::with_timeout(
            credentials.clone(),
            self.timeout,
        )?);
        clients.insert(credentials.clone(), Arc::clone(&client));
        Ok(client)
    }
}

impl ManagerFactory for OpenStackManagerFactory {
    fn create(
        &self,
        item_type: ItemType,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ResourceManager>> {
        let client = self.client_for(credentials)?;
        Ok(Arc::new(OpenStackManager::new(item_type, client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeyPair;

    fn credentials(username: &str) -> Credentials {
        Credentials::new("http://keystone:5000/v2.0", "tenant", username, "secret")
    }

    #[test]
    fn test_factory_shares_client_per_identity() {
        let factory = OpenStackManagerFactory::new(Duration::from_secs(5));

        let first = factory.client_for(&credentials("alice")).unwrap();
        let second = factory.client_for(&credentials("alice")).unwrap();
        let other = factory.client_for(&credentials("bob")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_created_manager_reports_type_and_identity() {
        let factory = OpenStackManagerFactory::new(Duration::from_secs(5));
        let manager = factory
            .create(ItemType::KeyPair, &credentials("alice"))
            .unwrap();

        assert_eq!(manager.item_type(), ItemType::KeyPair);
        assert_eq!(manager.credentials().username, "alice");
    }

    #[tokio::test]
    async fn test_delete_rejects_other_item_types() {
        let factory = OpenStackManagerFactory::new(Duration::from_secs(5));
        let manager = factory
            .create(ItemType::Image, &credentials("alice"))
            .unwrap();
        let item = Item::from(KeyPair {
            identifier: String::from("k"),
            name: String::from("k"),
            fingerprint: String::new(),
        });

        let err = manager.delete(&item).await.unwrap_err();
        assert!(matches!(
            err,
            CleanerError::OpenStack(OpenStackError::ItemTypeMismatch {
                expected: ItemType::Image,
                found: ItemType::KeyPair,
            })
        ));
    }
}
