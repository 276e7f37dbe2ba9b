use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use keycloak_jose::Jwks;
use reqwest::{
    header::{self, HeaderValue},
    Client, StatusCode,
};

use super::KeySource;
use crate::error::KeyFetchError;

#[derive(Debug)]
struct Validators {
    jwks: Jwks,
    etag: Option<HeaderValue>,
    last_modified: Option<HeaderValue>,
}

/// Fetches the key set from the provider's JWKS endpoint over HTTP
///
/// The last response is remembered along with its `ETag` and
/// `Last-Modified` headers, so later fetches are conditional and a
/// `304 Not Modified` reuses the keys already held.
#[derive(Debug)]
pub struct RemoteKeySource {
    jwks_url: String,
    client: Client,
    last: ArcSwapOption<Validators>,
}

impl RemoteKeySource {
    /// A source for `jwks_url`, using a client with this crate's user agent
    ///
    /// # Errors
    ///
    /// The HTTP client could not be built, typically because no TLS backend
    /// is available.
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, KeyFetchError> {
        let client = Client::builder()
            .user_agent(concat!("keycloak_authority/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(KeyFetchError::transport)?;

        Ok(Self::with_client(jwks_url, client))
    }

    /// A source for `jwks_url` sharing an existing client
    #[must_use]
    pub fn with_client(jwks_url: impl Into<String>, client: Client) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            client,
            last: ArcSwapOption::empty(),
        }
    }

    /// The endpoint keys are fetched from
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

#[async_trait]
impl KeySource for RemoteKeySource {
    #[tracing::instrument(skip(self), fields(jwks.url = tracing::field::Empty))]
    async fn fetch(&self) -> Result<Jwks, KeyFetchError> {
        let span = tracing::Span::current();
        span.record("jwks.url", &self.jwks_url.as_str());
        tracing::debug!("fetching JWKS");
        let mut request = self.client.get(&self.jwks_url);

        let last = self.last.load_full();
        if let Some(last) = &last {
            if let Some(etag) = &last.etag {
                request = request.header(header::IF_NONE_MATCH, etag);
            } else if let Some(last_modified) = &last.last_modified {
                request = request.header(header::IF_MODIFIED_SINCE, last_modified);
            }
        }

        let response = request.send().await.map_err(|err| {
            let error: &dyn std::error::Error = &err;
            tracing::warn!(error, "JWKS fetch failed; provider unreachable");
            KeyFetchError::transport(err)
        })?;

        if response.status() == StatusCode::NOT_MODIFIED {
            if let Some(last) = last {
                tracing::debug!("JWKS not modified");
                return Ok(last.jwks.clone());
            }
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::warn!(
                http.status_code = status,
                "JWKS fetch failed; unexpected response status",
            );
            return Err(KeyFetchError::Status(status));
        }

        let etag = response.headers().get(header::ETAG).map(ToOwned::to_owned);
        let last_modified = response
            .headers()
            .get(header::LAST_MODIFIED)
            .map(ToOwned::to_owned);

        let body = response.bytes().await.map_err(KeyFetchError::transport)?;
        let jwks: Jwks = serde_json::from_slice(&body).map_err(|err| {
            let error: &dyn std::error::Error = &err;
            tracing::warn!(error, "JWKS fetch failed; response is not a key set");
            KeyFetchError::decode(err)
        })?;

        tracing::info!(jwks.keys = jwks.keys().len(), "JWKS fetched");

        self.last.store(Some(Arc::new(Validators {
            jwks: jwks.clone(),
            etag,
            last_modified,
        })));

        Ok(jwks)
    }
}
