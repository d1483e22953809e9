//! HTTP client for the statistics backend.

mod auth;
mod export;
mod servers;
mod stats;

pub use export::export_file_name;
pub use stats::{DEFAULT_PAGE_SIZE, ListQuery};

use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::envelope::Envelope;
use crate::error::{Error, Result};

/// Bearer token shared between the session owner and the client.
///
/// Cloning yields a handle to the same slot.
#[derive(Debug, Clone, Default)]
pub struct SharedToken(Arc<RwLock<Option<String>>>);

impl SharedToken {
    /// Creates an empty token slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current token, if any.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the current token.
    pub fn set(&self, token: impl Into<String>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Removes the current token.
    pub fn clear(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns true if a token is present.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Client for the statistics backend.
///
/// Cheap to clone; clones share the connection pool and the token slot.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    token: SharedToken,
    http_client: Client,
}

impl ApiClient {
    /// Creates a client rooted at `base_url` (for example
    /// `http://localhost:3001/api`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or cannot carry a path.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "{base_url} cannot be used as an API base URL"
            )));
        }

        Ok(Self {
            base_url,
            token: SharedToken::new(),
            http_client: Client::new(),
        })
    }

    /// Uses the given token slot instead of a private one.
    #[must_use]
    pub fn with_token(mut self, token: SharedToken) -> Self {
        self.token = token;
        self
    }

    /// Uses a preconfigured HTTP client (timeouts, proxies).
    #[must_use]
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Returns the token slot attached to requests.
    #[must_use]
    pub const fn token(&self) -> &SharedToken {
        &self.token
    }

    /// Returns the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the URL for the given path segments below the base URL.
    ///
    /// Segments are percent-encoded; an empty last segment yields a trailing
    /// slash.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidConfig(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Starts a request with the bearer token and JSON headers attached.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, path = url.path(), "API request");
        let builder = self
            .http_client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");

        match self.token.get() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and returns the raw body of a successful response.
    pub(crate) async fn send_raw(&self, builder: RequestBuilder) -> Result<Bytes> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let error = Error::from_response(status, &body);
            warn!(status = status.as_u16(), "API request failed: {error}");
            return Err(error);
        }

        Ok(body)
    }

    /// Sends the request and decodes the JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let body = self.send_raw(builder).await?;
        serde_json::from_slice(&body).map_err(Into::into)
    }

    /// Sends the request and returns the `data` member of the envelope.
    pub(crate) async fn send_data<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        self.send_json::<Envelope<T>>(builder)
            .await
            .map(Envelope::into_data)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_token_is_shared() {
        let token = SharedToken::new();
        let clone = token.clone();
        assert!(!clone.is_set());

        token.set("abc");
        assert_eq!(clone.get().as_deref(), Some("abc"));

        clone.clear();
        assert!(token.get().is_none());
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let client = ApiClient::new("http://localhost:3001/api").unwrap();
        let url = client.endpoint(&["servers", "42", "toggle-status"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/api/servers/42/toggle-status");
    }

    #[test]
    fn test_endpoint_with_trailing_slash_base() {
        let client = ApiClient::new("http://localhost:3001/api/").unwrap();
        let url = client.endpoint(&["servers"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/api/servers");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = ApiClient::new("http://localhost/api").unwrap();
        let url = client.endpoint(&["servers", "a b"]).unwrap();
        assert_eq!(url.path(), "/api/servers/a%20b");
    }

    #[test]
    fn test_endpoint_trailing_empty_segment() {
        let client = ApiClient::new("http://localhost/api").unwrap();
        let url = client.endpoint(&["export", "server", "1", "bounces", ""]).unwrap();
        assert_eq!(url.path(), "/api/export/server/1/bounces/");
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(ApiClient::new("mailto:ops@example.com").is_err());
        assert!(ApiClient::new("not a url").is_err());
    }
}
