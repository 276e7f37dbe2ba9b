//! Provider metadata discovery

use keycloak_jose::jwt::Issuer;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::KeyFetchError;

const UMA2_CONFIGURATION: &str = ".well-known/uma2-configuration";
const OPENID_CONFIGURATION: &str = ".well-known/openid-configuration";

/// The parts of a realm's published metadata needed to verify its tokens
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderMetadata {
    /// The issuer identifier placed in every token
    pub issuer: Issuer,
    /// Where the realm publishes its signing keys
    pub jwks_uri: String,
}

/// Reads the issuer and JWKS location of a realm
///
/// `realm_url` is the realm base, such as
/// `https://sso.example.com/realms/demo`. The UMA2 metadata document is
/// tried first. When the realm does not publish one, the OpenID Connect
/// metadata is used instead.
///
/// # Errors
///
/// Neither document could be fetched or decoded.
#[tracing::instrument]
pub async fn discover(realm_url: &str) -> Result<ProviderMetadata, KeyFetchError> {
    let client = Client::builder()
        .user_agent(concat!("keycloak_authority/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(KeyFetchError::transport)?;

    discover_with_client(&client, realm_url).await
}

/// Reads the issuer and JWKS location of a realm with an existing client
///
/// # Errors
///
/// Neither document could be fetched or decoded.
pub async fn discover_with_client(
    client: &Client,
    realm_url: &str,
) -> Result<ProviderMetadata, KeyFetchError> {
    let base = realm_url.trim_end_matches('/');

    match fetch_metadata(client, &format!("{base}/{UMA2_CONFIGURATION}")).await {
        Err(KeyFetchError::Status(status)) if status == StatusCode::NOT_FOUND.as_u16() => {
            tracing::debug!("no UMA2 metadata; falling back to OpenID Connect metadata");
            fetch_metadata(client, &format!("{base}/{OPENID_CONFIGURATION}")).await
        }
        result => result,
    }
}

async fn fetch_metadata(client: &Client, url: &str) -> Result<ProviderMetadata, KeyFetchError> {
    let response = client.get(url).send().await?;
    response.error_for_status_ref()?;

    let body = response.bytes().await?;
    let metadata: ProviderMetadata =
        serde_json::from_slice(&body).map_err(KeyFetchError::decode)?;

    tracing::debug!(
        metadata.url = url,
        metadata.issuer = %metadata.issuer,
        "provider metadata fetched"
    );

    Ok(metadata)
}
