//! Errors raised while fetching keys and verifying tokens

use std::{error::Error as StdError, sync::Arc, time::Duration};

use keycloak_jose::{
    error::{ClaimsRejected, JwtVerifyError, MalformedToken, UnsupportedAlgorithm},
    jwk,
};
use thiserror::Error;

type SharedSource = Arc<dyn StdError + Send + Sync + 'static>;

/// The provider's key set could not be obtained
///
/// Cloneable so that every caller waiting on the same failed refresh sees
/// the same error.
#[derive(Clone, Debug, Error)]
pub enum KeyFetchError {
    /// The request did not complete
    #[error("failed to reach the JWKS endpoint")]
    Transport(#[source] SharedSource),

    /// The provider answered with a status other than success
    #[error("JWKS endpoint responded with HTTP status {0}")]
    Status(u16),

    /// The response body is not a JWKS document
    #[error("JWKS response could not be decoded")]
    Decode(#[source] SharedSource),

    /// The fetch did not complete within the configured timeout
    #[error("JWKS fetch timed out after {0:?}")]
    Timeout(Duration),

    /// A custom key source failed
    #[error("key source failed")]
    Other(#[source] SharedSource),
}

impl KeyFetchError {
    /// Wraps a transport failure
    pub fn transport(source: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self::Transport(Arc::from(source.into()))
    }

    /// Wraps a failure to decode the response body
    pub fn decode(source: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self::Decode(Arc::from(source.into()))
    }

    /// Wraps the failure of a custom key source
    pub fn other(source: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self::Other(Arc::from(source.into()))
    }

    /// Whether the fetch was abandoned because it took too long
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for KeyFetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else if err.is_decode() {
            Self::decode(err)
        } else {
            Self::transport(err)
        }
    }
}

/// A bearer token was not accepted
///
/// Every variant is distinguishable by the caller, either by matching or
/// through the `is_*` predicates.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The signing keys could not be obtained from the provider
    #[error("unable to obtain signing keys")]
    KeyFetch(#[from] KeyFetchError),

    /// The token is not a well-formed compact JWS
    #[error(transparent)]
    MalformedToken(#[from] MalformedToken),

    /// No key with the token's key ID is published, even after a refresh
    #[error("no signing key found for key ID {}", .kid.as_deref().map_or("<none>", jwk::KeyIdRef::as_str))]
    UnknownKey {
        /// The key ID named by the token header, if any
        kid: Option<jwk::KeyId>,
    },

    /// The declared algorithm is absent, unknown, not approved, or does not
    /// fit the resolved key
    #[error(transparent)]
    UnsupportedAlgorithm(#[from] UnsupportedAlgorithm),

    /// The signature does not verify under the resolved key
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// The token is expired, or carries no expiration
    #[error("token expired")]
    TokenExpired,

    /// The token is not yet valid
    #[error("token not yet valid")]
    TokenNotYetValid,

    /// The issuer is not the expected one, or is missing
    #[error("token issuer does not match")]
    IssuerMismatch,

    /// The audience does not include the expected one, or is missing
    #[error("token audience does not match")]
    AudienceMismatch,
}

impl VerifyError {
    /// Whether the keys could not be fetched
    #[must_use]
    pub fn is_key_fetch(&self) -> bool {
        matches!(self, Self::KeyFetch(_))
    }

    /// Whether the token was structurally invalid
    #[must_use]
    pub fn is_malformed_token(&self) -> bool {
        matches!(self, Self::MalformedToken(_))
    }

    /// Whether no matching key was found
    #[must_use]
    pub fn is_unknown_key(&self) -> bool {
        matches!(self, Self::UnknownKey { .. })
    }

    /// Whether the algorithm was rejected
    #[must_use]
    pub fn is_unsupported_algorithm(&self) -> bool {
        matches!(self, Self::UnsupportedAlgorithm(_))
    }

    /// Whether the signature failed to verify
    #[must_use]
    pub fn is_signature_invalid(&self) -> bool {
        matches!(self, Self::SignatureInvalid)
    }

    /// Whether the token was expired
    #[must_use]
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Self::TokenExpired)
    }

    /// Whether the token was not yet valid
    #[must_use]
    pub fn is_token_not_yet_valid(&self) -> bool {
        matches!(self, Self::TokenNotYetValid)
    }

    /// Whether the issuer did not match
    #[must_use]
    pub fn is_issuer_mismatch(&self) -> bool {
        matches!(self, Self::IssuerMismatch)
    }

    /// Whether the audience did not match
    #[must_use]
    pub fn is_audience_mismatch(&self) -> bool {
        matches!(self, Self::AudienceMismatch)
    }
}

impl From<ClaimsRejected> for VerifyError {
    fn from(err: ClaimsRejected) -> Self {
        match err {
            ClaimsRejected::TokenNotYetValid | ClaimsRejected::MissingRequiredClaim("nbf") => {
                Self::TokenNotYetValid
            }
            ClaimsRejected::InvalidIssuer | ClaimsRejected::MissingRequiredClaim("iss") => {
                Self::IssuerMismatch
            }
            ClaimsRejected::InvalidAudience | ClaimsRejected::MissingRequiredClaim("aud") => {
                Self::AudienceMismatch
            }
            // `exp` is the only other claim the validator requires
            ClaimsRejected::TokenExpired | ClaimsRejected::MissingRequiredClaim(_) => {
                Self::TokenExpired
            }
        }
    }
}

impl From<JwtVerifyError> for VerifyError {
    fn from(err: JwtVerifyError) -> Self {
        match err {
            JwtVerifyError::MalformedToken(e) => Self::MalformedToken(e),
            JwtVerifyError::UnsupportedAlgorithm(e) => Self::UnsupportedAlgorithm(e),
            JwtVerifyError::SignatureMismatch(_) => Self::SignatureInvalid,
            JwtVerifyError::ClaimsRejected(e) => e.into(),
        }
    }
}
