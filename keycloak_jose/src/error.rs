//! Common errors

#![allow(missing_copy_implementations)]

use std::error::Error as StdError;

use thiserror::Error;

use crate::jwa;

/// The compact token or one of its sections could not be decoded
#[derive(Debug, Error)]
#[error("malformed token: {reason}")]
pub struct MalformedToken {
    reason: &'static str,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl MalformedToken {
    /// A short description of which part of the token was defective
    #[must_use]
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

pub(crate) fn malformed_token(reason: &'static str) -> MalformedToken {
    MalformedToken {
        reason,
        source: None,
    }
}

pub(crate) fn malformed_token_with(
    reason: &'static str,
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedToken {
    MalformedToken {
        reason,
        source: Some(source.into()),
    }
}

/// The declared signing algorithm cannot be used
///
/// Covers unknown names (including `none`), algorithms outside the
/// validator's allow-list, and algorithms that do not belong to the family
/// the resolved key was minted for.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum UnsupportedAlgorithm {
    /// The token header carries no `alg`
    #[error("token header does not declare an algorithm")]
    Missing,

    /// The name does not match any supported signing algorithm
    #[error("'{0}' is not a supported signing algorithm")]
    Unknown(String),

    /// The algorithm is supported but not approved
    #[error("{0} is not an approved algorithm")]
    NotApproved(jwa::Algorithm),

    /// The algorithm belongs to a family the key material cannot serve
    #[error("{alg} cannot be used with a key of type {kty}")]
    IncompatibleKey {
        /// The declared algorithm
        alg: jwa::Algorithm,
        /// The `kty` of the resolved key
        kty: &'static str,
    },

    /// The key declares a different algorithm than the token
    #[error("{alg} does not match the key's declared algorithm {key_alg}")]
    KeyAlgorithmMismatch {
        /// The algorithm declared by the token
        alg: jwa::Algorithm,
        /// The algorithm declared by the key
        key_alg: jwa::Algorithm,
    },

    /// The EC key is on a different curve than the algorithm requires
    #[error("{alg} cannot be used with a key on curve {curve}")]
    CurveMismatch {
        /// The declared algorithm
        alg: jwa::Algorithm,
        /// The curve of the resolved key
        curve: jwa::ec::Curve,
    },
}

/// The signature did not match
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("signature mismatch")]
pub struct SignatureMismatch {
    _p: (),
}

pub(crate) const fn signature_mismatch() -> SignatureMismatch {
    SignatureMismatch { _p: () }
}

/// The key material was rejected
#[derive(Debug, Error)]
#[error("key rejected: {reason}")]
pub struct KeyRejected {
    reason: String,
}

pub(crate) fn key_rejected(reason: impl Into<String>) -> KeyRejected {
    KeyRejected {
        reason: reason.into(),
    }
}

/// Unexpected error (possibly a bug)
#[derive(Debug, Error)]
#[error("unexpected error")]
pub struct Unexpected {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

#[cfg_attr(not(feature = "test-util"), allow(dead_code))]
pub(crate) fn unexpected(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> Unexpected {
    Unexpected {
        source: source.into(),
    }
}

/// An error occurring while verifying a signature with a signing key
#[derive(Debug, Error)]
pub enum KeyVerifyError {
    /// The key cannot verify signatures made with this algorithm
    #[error(transparent)]
    UnsupportedAlgorithm(#[from] UnsupportedAlgorithm),

    /// The signature is invalid
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatch),
}

/// An error occurring when validating the claims of a token
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClaimsRejected {
    /// The token is expired according to the `exp` claim
    #[error("token expired")]
    TokenExpired,

    /// The token is not yet valid according to the `nbf` claim
    #[error("token not yet valid")]
    TokenNotYetValid,

    /// The `iss` claim does not name the expected issuer
    #[error("invalid issuer")]
    InvalidIssuer,

    /// The `aud` claim does not contain the expected audience
    #[error("invalid audience")]
    InvalidAudience,

    /// A claim required by the validator is absent or of the wrong type
    #[error("required {0} claim missing")]
    MissingRequiredClaim(&'static str),
}

/// An error occurring while verifying a token
#[derive(Debug, Error)]
pub enum JwtVerifyError {
    /// The token could not be decoded
    #[error(transparent)]
    MalformedToken(#[from] MalformedToken),

    /// The declared algorithm cannot be used
    #[error(transparent)]
    UnsupportedAlgorithm(#[from] UnsupportedAlgorithm),

    /// The signature did not verify
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatch),

    /// The claims were rejected by the validator
    #[error("token rejected by claims validator")]
    ClaimsRejected(#[from] ClaimsRejected),
}

impl From<KeyVerifyError> for JwtVerifyError {
    fn from(err: KeyVerifyError) -> Self {
        match err {
            KeyVerifyError::UnsupportedAlgorithm(e) => Self::UnsupportedAlgorithm(e),
            KeyVerifyError::SignatureMismatch(e) => Self::SignatureMismatch(e),
        }
    }
}
