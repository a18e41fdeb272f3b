//! Value types for tenant resources and the credentials used to reach them.
//!
//! Items are compared structurally. Identifiers are only unique within an
//! [`ItemType`], so anything keyed by identifier is keyed by [`ItemKey`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credentials for a single identity within a tenant.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credentials {
    /// Keystone authentication URL.
    pub auth_url: String,
    /// Tenant (project) name.
    pub tenant: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates a new set of credentials.
    #[must_use]
    pub fn new(
        auth_url: impl Into<String>,
        tenant: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            tenant: tenant.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

// Passwords never reach the logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_url", &self.auth_url)
            .field("tenant", &self.tenant)
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// The kinds of resource that can be cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Virtual machine instances.
    Instance,
    /// Disk images.
    Image,
    /// SSH key-pairs.
    KeyPair,
}

/// Which of a cleanup configuration's credential sets an area is processed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSelection {
    /// Only the first configured credential set.
    First,
    /// Every configured credential set, in order.
    All,
}

impl ItemType {
    /// All item types, in declaration order.
    pub const ALL: [Self; 3] = [Self::Instance, Self::Image, Self::KeyPair];

    /// Returns the credential selection policy for this area.
    ///
    /// Key-pairs can only be deleted by the identity that created them, so
    /// every identity has to be tried.
    #[must_use]
    pub const fn credential_selection(self) -> CredentialSelection {
        match self {
            Self::KeyPair => CredentialSelection::All,
            Self::Instance | Self::Image => CredentialSelection::First,
        }
    }

    /// Returns the stable name used in persisted tracking records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Image => "image",
            Self::KeyPair => "key_pair",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Instance => "Instance",
            Self::Image => "Image",
            Self::KeyPair => "KeyPair",
        };
        write!(f, "{s}")
    }
}

/// A virtual machine instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instance {
    /// Instance identifier.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Identifier of the image the instance booted from.
    pub image: Option<String>,
    /// Name of the key-pair injected into the instance.
    pub key_name: Option<String>,
    /// When the cloud created the instance.
    pub created_at: DateTime<Utc>,
    /// When the cloud last updated the instance.
    pub updated_at: DateTime<Utc>,
}

/// A disk image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
    /// Image identifier.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Whether the cloud has the image marked as protected.
    pub protected: bool,
    /// When the cloud created the image.
    pub created_at: DateTime<Utc>,
    /// When the cloud last updated the image.
    pub updated_at: DateTime<Utc>,
}

/// An SSH key-pair. Its identifier is its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPair {
    /// Key-pair identifier.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Public key fingerprint.
    pub fingerprint: String,
}

/// A tenant resource of any type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    /// A virtual machine instance.
    Instance(Instance),
    /// A disk image.
    Image(Image),
    /// An SSH key-pair.
    KeyPair(KeyPair),
}

impl Item {
    /// Returns the item's identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Instance(i) => &i.identifier,
            Self::Image(i) => &i.identifier,
            Self::KeyPair(k) => &k.identifier,
        }
    }

    /// Returns the item's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Instance(i) => &i.name,
            Self::Image(i) => &i.name,
            Self::KeyPair(k) => &k.name,
        }
    }

    /// Returns the item's type.
    #[must_use]
    pub const fn item_type(&self) -> ItemType {
        match self {
            Self::Instance(_) => ItemType::Instance,
            Self::Image(_) => ItemType::Image,
            Self::KeyPair(_) => ItemType::KeyPair,
        }
    }

    /// Returns the cloud-reported creation time, if the type carries one.
    #[must_use]
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instance(i) => Some(i.created_at),
            Self::Image(i) => Some(i.created_at),
            Self::KeyPair(_) => None,
        }
    }

    /// Returns the type-scoped key of this item.
    #[must_use]
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.item_type(), self.identifier())
    }

    /// Returns a short human readable description of the item.
    #[must_use]
    pub fn describe(&self, include_type: bool) -> String {
        let prefix = if include_type {
            format!("of type \"{}\" ", self.item_type())
        } else {
            String::new()
        };
        format!(
            "{prefix}with id \"{}\" and name \"{}\"",
            self.identifier(),
            self.name()
        )
    }
}

impl From<Instance> for Item {
    fn from(instance: Instance) -> Self {
        Self::Instance(instance)
    }
}

impl From<Image> for Item {
    fn from(image: Image) -> Self {
        Self::Image(image)
    }
}

impl From<KeyPair> for Item {
    fn from(key_pair: KeyPair) -> Self {
        Self::KeyPair(key_pair)
    }
}

/// An identifier scoped by item type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    /// Item type.
    pub item_type: ItemType,
    /// Identifier within that type.
    pub identifier: String,
}

impl ItemKey {
    /// Creates a new key.
    #[must_use]
    pub fn new(item_type: ItemType, identifier: impl Into<String>) -> Self {
        Self {
            item_type,
            identifier: identifier.into(),
        }
    }
}
