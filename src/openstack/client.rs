//! `OpenStack` HTTP client.
//!
//! Authenticates against Keystone v2 and talks to the Nova and Glance
//! endpoints advertised in the service catalogue. One client is bound to a
//! single set of credentials.

use reqwest::{header, Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::error::{OpenStackError, Result};
use crate::models::{Credentials, Image, Instance, KeyPair};

use super::types::{
    CatalogEntry, ImagesResponse, KeyPairsResponse, PasswordCredentials, ServersResponse,
    Session, TokenRequest, TokenRequestAuth, TokenResponse,
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the Keystone token.
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Catalogue type of the compute service.
const COMPUTE_SERVICE: &str = "compute";

/// Catalogue type of the image service.
const IMAGE_SERVICE: &str = "image";

/// `OpenStack` API client for a single identity.
#[derive(Debug)]
pub struct OpenStackClient {
    /// HTTP client.
    client: Client,
    /// Identity used to authenticate.
    credentials: Credentials,
    /// Cached Keystone session.
    session: RwLock<Option<Session>>,
}

impl OpenStackClient {
    /// Creates a new client for the given credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_timeout(credentials, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(credentials: Credentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OpenStackError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            session: RwLock::new(None),
        })
    }

    /// Returns the credentials this client authenticates with.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the current session, authenticating if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn session(&self) -> Result<Session> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(session.clone());
        }

        let mut guard = self.session.write().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }
        let session = self.authenticate().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Drops the cached session so the next request re-authenticates.
    async fn invalidate(&self) {
        *self.session.write().await = None;
    }

    /// Requests a new token from Keystone.
    async fn authenticate(&self) -> Result<Session> {
        let url = format!("{}/tokens", self.credentials.auth_url.trim_end_matches('/'));
        debug!(
            "Authenticating as {} in tenant {}",
            self.credentials.username, self.credentials.tenant
        );

        let request = TokenRequest {
            auth: TokenRequestAuth {
                tenant_name: &self.credentials.tenant,
                password_credentials: PasswordCredentials {
                    username: &self.credentials.username,
                    password: &self.credentials.password,
                },
            },
        };

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| OpenStackError::network(format!("Authentication request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(OpenStackError::AuthenticationFailed {
                message: format!(
                    "Keystone rejected user {} for tenant {}",
                    self.credentials.username, self.credentials.tenant
                ),
            }
            .into());
        }
        let response = check_status(response).await?;

        let token: TokenResponse = response.json().await.map_err(|e| {
            OpenStackError::invalid_response(format!("Failed to parse token response: {e}"))
        })?;

        let access = token.access;
        Ok(Session {
            token: access.token.id,
            tenant_id: access.token.tenant.id,
            compute_url: find_endpoint(&access.service_catalog, COMPUTE_SERVICE)?,
            image_url: find_endpoint(&access.service_catalog, IMAGE_SERVICE)?,
        })
    }

    /// Sends an authenticated request, re-authenticating once on a rejected token.
    async fn send<F>(&self, method: Method, url_for: F) -> Result<Response>
    where
        F: Fn(&Session) -> Result<Url> + Send + Sync,
    {
        let mut retried = false;
        loop {
            let session = self.session().await?;
            let url = url_for(&session)?;
            trace!("{method} {url}");

            let response = self
                .client
                .request(method.clone(), url)
                .header(AUTH_TOKEN_HEADER, &session.token)
                .header(header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| OpenStackError::network(format!("Request failed: {e}")))?;

            if response.status() == StatusCode::UNAUTHORIZED && !retried {
                debug!("Token rejected, re-authenticating");
                self.invalidate().await;
                retried = true;
                continue;
            }
            return Ok(response);
        }
    }

    /// Sends an authenticated GET and decodes the JSON body.
    async fn get_json<T, F>(&self, url_for: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&Session) -> Result<Url> + Send + Sync,
    {
        let response = check_status(self.send(Method::GET, url_for).await?).await?;
        response.json().await.map_err(|e| {
            OpenStackError::invalid_response(format!("Failed to parse response: {e}")).into()
        })
    }

    /// Sends an authenticated DELETE. A resource that is already gone counts as deleted.
    async fn delete<F>(&self, url_for: F) -> Result<()>
    where
        F: Fn(&Session) -> Result<Url> + Send + Sync,
    {
        let response = self.send(Method::DELETE, url_for).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Resource at {} is already gone", response.url());
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    /// Lists the tenant's instances.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn list_instances(&self) -> Result<Vec<Instance>> {
        let response: ServersResponse = self
            .get_json(|s| endpoint_url(&s.compute_url, &["servers", "detail"]))
            .await?;
        debug!("Listed {} instances", response.servers.len());
        Ok(response.servers.into_iter().map(Instance::from).collect())
    }

    /// Lists the key-pairs owned by this client's identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn list_key_pairs(&self) -> Result<Vec<KeyPair>> {
        let response: KeyPairsResponse = self
            .get_json(|s| endpoint_url(&s.compute_url, &["os-keypairs"]))
            .await?;
        debug!("Listed {} key-pairs", response.keypairs.len());
        Ok(response
            .keypairs
            .into_iter()
            .map(|wrapper| KeyPair::from(wrapper.keypair))
            .collect())
    }

    /// Lists the images owned by the tenant, following pagination.
    ///
    /// Public images belonging to other tenants are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    pub async fn list_images(&self) -> Result<Vec<Image>> {
        let tenant_id = self.session().await?.tenant_id;
        let mut images = Vec::new();
        let mut next: Option<String> = None;

        loop {
            let page: ImagesResponse = match next.as_deref() {
                None => {
                    self.get_json(|s| {
                        let mut url = endpoint_url(image_api_root(&s.image_url), &["v2", "images"])?;
                        url.query_pairs_mut().append_pair("owner", &s.tenant_id);
                        Ok(url)
                    })
                    .await?
                }
                Some(path) => {
                    self.get_json(|s| {
                        let joined = format!("{}{path}", image_api_root(&s.image_url));
                        Url::parse(&joined).map_err(|e| {
                            OpenStackError::invalid_response(format!(
                                "Invalid pagination link '{path}': {e}"
                            ))
                            .into()
                        })
                    })
                    .await?
                }
            };

            images.extend(
                page.images
                    .into_iter()
                    .filter(|image| image.owner.as_deref() == Some(tenant_id.as_str()))
                    .map(Image::from),
            );

            match page.next {
                Some(path) if !path.is_empty() => next = Some(path),
                _ => break,
            }
        }

        debug!("Listed {} images", images.len());
        Ok(images)
    }

    /// Deletes an instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn delete_instance(&self, identifier: &str) -> Result<()> {
        self.delete(|s| endpoint_url(&s.compute_url, &["servers", identifier]))
            .await
    }

    /// Deletes a key-pair by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn delete_key_pair(&self, name: &str) -> Result<()> {
        self.delete(|s| endpoint_url(&s.compute_url, &["os-keypairs", name]))
            .await
    }

    /// Deletes an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn delete_image(&self, identifier: &str) -> Result<()> {
        self.delete(|s| endpoint_url(image_api_root(&s.image_url), &["v2", "images", identifier]))
            .await
    }
}

/// Maps non-success statuses to errors.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(OpenStackError::AuthenticationFailed {
            message: format!("Request to {} was refused ({status})", response.url()),
        }
        .into());
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(OpenStackError::api_error(status.as_u16(), body).into());
    }

    Ok(response)
}

/// Finds the public URL of a service in the catalogue.
fn find_endpoint(catalog: &[CatalogEntry], service_type: &str) -> Result<String> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == service_type)
        .flat_map(|entry| entry.endpoints.iter())
        .map(|endpoint| endpoint.public_url.clone())
        .next()
        .ok_or_else(|| {
            OpenStackError::EndpointNotFound {
                service: service_type.to_string(),
            }
            .into()
        })
}

/// Appends percent-encoded path segments to a service URL.
fn endpoint_url(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| {
        OpenStackError::invalid_response(format!("Invalid endpoint URL '{base}': {e}"))
    })?;
    url.path_segments_mut()
        .map_err(|()| OpenStackError::invalid_response(format!("Endpoint URL '{base}' cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Strips any version suffix from the Glance endpoint.
fn image_api_root(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    trimmed
        .strip_suffix("/v2")
        .or_else(|| trimmed.strip_suffix("/v2.0"))
        .unwrap_or(trimmed)
}
