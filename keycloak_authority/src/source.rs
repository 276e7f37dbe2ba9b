//! Where signing keys come from

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use keycloak_jose::Jwks;

use crate::error::KeyFetchError;

#[cfg(feature = "reqwest")]
mod remote;

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub use remote::RemoteKeySource;

/// A provider of JSON Web Key Sets
///
/// Each call should return the provider's current key set. Caching, timeouts
/// and coalescing of concurrent requests are handled by
/// [`KeySetCache`][crate::KeySetCache], so implementations can stay simple.
#[async_trait]
pub trait KeySource: fmt::Debug + Send + Sync {
    /// Retrieves the current key set
    async fn fetch(&self) -> Result<Jwks, KeyFetchError>;
}

#[async_trait]
impl<S: KeySource + ?Sized> KeySource for Arc<S> {
    async fn fetch(&self) -> Result<Jwks, KeyFetchError> {
        S::fetch(self).await
    }
}

#[async_trait]
impl<S: KeySource + ?Sized> KeySource for Box<S> {
    async fn fetch(&self) -> Result<Jwks, KeyFetchError> {
        S::fetch(self).await
    }
}

/// A fixed key set
///
/// Useful when the keys are distributed out of band, and in tests.
#[derive(Clone, Debug, Default)]
pub struct StaticKeySource {
    jwks: Jwks,
}

impl StaticKeySource {
    /// Serves `jwks` on every fetch
    #[must_use]
    pub fn new(jwks: Jwks) -> Self {
        Self { jwks }
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<Jwks, KeyFetchError> {
        Ok(self.jwks.clone())
    }
}

impl From<Jwks> for StaticKeySource {
    fn from(jwks: Jwks) -> Self {
        Self::new(jwks)
    }
}
