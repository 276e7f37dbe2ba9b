//! Implementations of the JSON Web Algorithms (JWA) standard
//!
//! The specifications for these algorithms can be found in [RFC7518][].
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error;

pub mod ec;
pub mod hmac;
pub mod rsa;

#[doc(inline)]
pub use ec::EcPublicKey;
#[doc(inline)]
pub use hmac::HmacKey;
#[doc(inline)]
pub use rsa::RsaPublicKey;

/// A signing algorithm that can be verified
///
/// `ES512` and `none` are deliberately absent: the former has no P-521
/// verifier in the crypto backend, and the latter is never acceptable.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum Algorithm {
    /// HMAC using SHA-256
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
    /// RSA PKCS#1 v1.5 using SHA-256
    RS256,
    /// RSA PKCS#1 v1.5 using SHA-384
    RS384,
    /// RSA PKCS#1 v1.5 using SHA-512
    RS512,
    /// RSA-PSS using SHA-256 and MGF1 with SHA-256
    PS256,
    /// RSA-PSS using SHA-384 and MGF1 with SHA-384
    PS384,
    /// RSA-PSS using SHA-512 and MGF1 with SHA-512
    PS512,
    /// ECDSA using the P-256 curve and SHA-256
    ES256,
    /// ECDSA using the P-384 curve and SHA-384
    ES384,
}

impl Algorithm {
    /// Every algorithm this crate can verify
    pub const SUPPORTED: &'static [Algorithm] = &[
        Self::HS256,
        Self::HS384,
        Self::HS512,
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
        Self::ES256,
        Self::ES384,
    ];

    /// The family of keys that can verify signatures made with this algorithm
    #[must_use]
    pub const fn family(self) -> AlgorithmFamily {
        match self {
            Self::HS256 | Self::HS384 | Self::HS512 => AlgorithmFamily::Hmac,
            Self::RS256 | Self::RS384 | Self::RS512 => AlgorithmFamily::Rsa,
            Self::PS256 | Self::PS384 | Self::PS512 => AlgorithmFamily::RsaPss,
            Self::ES256 | Self::ES384 => AlgorithmFamily::EllipticCurve,
        }
    }

    /// The registered name of the algorithm
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
        }
    }

    /// The usage implied by this algorithm
    pub const fn to_usage(self) -> Usage {
        Usage::Signing
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = error::UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SUPPORTED
            .iter()
            .copied()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| error::UnsupportedAlgorithm::Unknown(s.to_owned()))
    }
}

impl TryFrom<String> for Algorithm {
    type Error = error::UnsupportedAlgorithm;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for &'static str {
    fn from(alg: Algorithm) -> Self {
        alg.as_str()
    }
}

/// Groups of algorithms that share a key type and verification routine
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum AlgorithmFamily {
    /// ECDSA over a named curve (`kty: "EC"`)
    EllipticCurve,
    /// HMAC with a shared secret (`kty: "oct"`)
    Hmac,
    /// RSA with PKCS#1 v1.5 padding (`kty: "RSA"`)
    Rsa,
    /// RSA with PSS padding (`kty: "RSA"`)
    RsaPss,
}

impl AlgorithmFamily {
    /// The `kty` of keys belonging to this family
    #[must_use]
    pub const fn key_type(self) -> &'static str {
        match self {
            Self::EllipticCurve => "EC",
            Self::Hmac => "oct",
            Self::Rsa | Self::RsaPss => "RSA",
        }
    }
}

/// The intended use for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Usage {
    /// The key is intended for signing and verification
    #[serde(rename = "sig")]
    Signing,

    /// The key is intended for encryption
    #[serde(rename = "enc")]
    Encryption,
}
