//! `OpenStack` API wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Image, Instance, KeyPair};

/// An authenticated Keystone session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Token sent as `X-Auth-Token`.
    pub token: String,
    /// Identifier of the tenant the token is scoped to.
    pub tenant_id: String,
    /// Public URL of the compute (Nova) service.
    pub compute_url: String,
    /// Public URL of the image (Glance) service.
    pub image_url: String,
}

/// Keystone v2 token request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenRequest<'a> {
    pub auth: TokenRequestAuth<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenRequestAuth<'a> {
    pub tenant_name: &'a str,
    pub password_credentials: PasswordCredentials<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordCredentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Keystone v2 token response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access: Access,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Access {
    pub token: Token,
    #[serde(default)]
    pub service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Token {
    pub id: String,
    pub tenant: TokenTenant,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenTenant {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatalogEndpoint {
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

/// Nova `servers/detail` response.
#[derive(Debug, Deserialize)]
pub(crate) struct ServersResponse {
    #[serde(default)]
    pub servers: Vec<Server>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// An object with an `id`, or an empty string for volume-backed servers.
    #[serde(default)]
    pub image: serde_json::Value,
    #[serde(default)]
    pub key_name: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<Server> for Instance {
    fn from(server: Server) -> Self {
        let image = server
            .image
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        Self {
            identifier: server.id,
            name: server.name,
            image,
            key_name: server.key_name.filter(|k| !k.is_empty()),
            created_at: server.created,
            updated_at: server.updated,
        }
    }
}

/// Nova `os-keypairs` response.
#[derive(Debug, Deserialize)]
pub(crate) struct KeyPairsResponse {
    #[serde(default)]
    pub keypairs: Vec<KeyPairWrapper>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyPairWrapper {
    pub keypair: NovaKeyPair,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NovaKeyPair {
    pub name: String,
    #[serde(default)]
    pub fingerprint: String,
}

impl From<NovaKeyPair> for KeyPair {
    fn from(key_pair: NovaKeyPair) -> Self {
        Self {
            identifier: key_pair.name.clone(),
            name: key_pair.name,
            fingerprint: key_pair.fingerprint,
        }
    }
}

/// Glance v2 `images` response.
#[derive(Debug, Deserialize)]
pub(crate) struct ImagesResponse {
    #[serde(default)]
    pub images: Vec<GlanceImage>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GlanceImage {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GlanceImage> for Image {
    fn from(image: GlanceImage) -> Self {
        Self {
            identifier: image.id,
            name: image.name.unwrap_or_default(),
            protected: image.protected,
            created_at: image.created_at,
            updated_at: image.updated_at,
        }
    }
}
