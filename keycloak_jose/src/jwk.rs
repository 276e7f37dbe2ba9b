//! Implementations of the JSON Web Keys (JWK) standard
//!
//! The specifications for JSON Web Keys can be found in [RFC7517][].
//!
//! [RFC7517]: https://tools.ietf.org/html/rfc7517

use aliri_braid::braid;
use serde::Deserialize;

use crate::{
    error,
    jwa::{self, AlgorithmFamily},
    jws::Verifier,
};

/// An identifier for a JWK
#[braid(serde, ref_doc = "A borrowed reference to JWK identifier ([`KeyId`])")]
pub struct KeyId;

/// The public material of a signing key, tagged by `kty`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kty")]
#[non_exhaustive]
pub enum KeyMaterial {
    /// RSA
    #[serde(rename = "RSA")]
    Rsa(jwa::RsaPublicKey),

    /// Elliptic curve cryptography
    #[serde(rename = "EC")]
    EllipticCurve(jwa::EcPublicKey),

    /// HMAC symmetric
    #[serde(rename = "oct")]
    Hmac(jwa::HmacKey),
}

impl KeyMaterial {
    /// The JWK `kty` of this material
    #[must_use]
    pub fn key_type(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "RSA",
            Self::EllipticCurve(_) => "EC",
            Self::Hmac(_) => "oct",
        }
    }

    /// The algorithm family implied by the key type alone
    ///
    /// RSA keys report [`AlgorithmFamily::Rsa`], although they can also
    /// verify PSS signatures.
    #[must_use]
    pub fn default_family(&self) -> AlgorithmFamily {
        match self {
            Self::Rsa(_) => AlgorithmFamily::Rsa,
            Self::EllipticCurve(_) => AlgorithmFamily::EllipticCurve,
            Self::Hmac(_) => AlgorithmFamily::Hmac,
        }
    }

    fn check_family(&self, alg: jwa::Algorithm) -> Result<(), error::UnsupportedAlgorithm> {
        let compatible = match self {
            Self::Rsa(k) => k.can_verify(alg),
            Self::Hmac(k) => k.can_verify(alg),
            Self::EllipticCurve(k) => {
                if alg.family() == AlgorithmFamily::EllipticCurve && !k.can_verify(alg) {
                    return Err(error::UnsupportedAlgorithm::CurveMismatch {
                        alg,
                        curve: k.curve(),
                    });
                }
                k.can_verify(alg)
            }
        };

        if compatible {
            Ok(())
        } else {
            Err(error::UnsupportedAlgorithm::IncompatibleKey {
                alg,
                kty: self.key_type(),
            })
        }
    }
}

impl Verifier for KeyMaterial {
    type Algorithm = jwa::Algorithm;
    type Error = error::KeyVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        self.check_family(alg).is_ok()
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        match self {
            Self::Rsa(k) => k.verify(alg, message, signature),
            Self::EllipticCurve(k) => k.verify(alg, message, signature),
            Self::Hmac(k) => k.verify(alg, message, signature),
        }
    }
}

impl From<jwa::RsaPublicKey> for KeyMaterial {
    fn from(key: jwa::RsaPublicKey) -> Self {
        Self::Rsa(key)
    }
}

impl From<jwa::EcPublicKey> for KeyMaterial {
    fn from(key: jwa::EcPublicKey) -> Self {
        Self::EllipticCurve(key)
    }
}

impl From<jwa::HmacKey> for KeyMaterial {
    fn from(key: jwa::HmacKey) -> Self {
        Self::Hmac(key)
    }
}

/// A JSON Web Key usable for verifying token signatures
///
/// Every signing key is identified. Keys intended for encryption and keys
/// whose declared algorithm does not fit their material are refused when
/// parsed, so a key that exists is always safe to dispatch to.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "SigningKeyDto")]
#[must_use]
pub struct SigningKey {
    key_id: KeyId,
    algorithm: Option<jwa::Algorithm>,
    usage: Option<jwa::Usage>,
    material: KeyMaterial,
}

impl SigningKey {
    /// Builds a signing key from identified key material
    pub fn new(key_id: impl Into<KeyId>, material: impl Into<KeyMaterial>) -> Self {
        Self {
            key_id: key_id.into(),
            algorithm: None,
            usage: None,
            material: material.into(),
        }
    }

    /// Restricts the key to a single algorithm
    ///
    /// # Errors
    ///
    /// The key material cannot serve the algorithm.
    pub fn with_algorithm(self, alg: jwa::Algorithm) -> Result<Self, error::UnsupportedAlgorithm> {
        self.material.check_family(alg)?;
        Ok(Self {
            algorithm: Some(alg),
            usage: Some(alg.to_usage()),
            ..self
        })
    }

    /// The key ID
    #[must_use]
    pub fn key_id(&self) -> &KeyIdRef {
        &self.key_id
    }

    /// The algorithm the key is restricted to, if declared
    #[must_use]
    pub fn algorithm(&self) -> Option<jwa::Algorithm> {
        self.algorithm
    }

    /// The declared usage of the key
    #[must_use]
    pub fn usage(&self) -> Option<jwa::Usage> {
        self.usage
    }

    /// The key material
    #[must_use]
    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// The algorithm family of the key
    ///
    /// Derived from the declared algorithm when present, otherwise from the
    /// key type.
    #[must_use]
    pub fn family(&self) -> AlgorithmFamily {
        self.algorithm
            .map_or_else(|| self.material.default_family(), jwa::Algorithm::family)
    }

    /// Checks that a token signed with `alg` may be verified by this key
    ///
    /// # Errors
    ///
    /// The algorithm differs from the key's declared algorithm, belongs to a
    /// family the key type cannot serve, or needs a different curve.
    pub fn check_algorithm(&self, alg: jwa::Algorithm) -> Result<(), error::UnsupportedAlgorithm> {
        if let Some(key_alg) = self.algorithm {
            if key_alg != alg {
                return Err(error::UnsupportedAlgorithm::KeyAlgorithmMismatch { alg, key_alg });
            }
        }

        self.material.check_family(alg)
    }
}

impl Verifier for SigningKey {
    type Algorithm = jwa::Algorithm;
    type Error = error::KeyVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        self.check_algorithm(alg).is_ok()
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        self.check_algorithm(alg)?;
        self.material.verify(alg, message, signature)
    }
}

/// Reasons a JWK cannot become a [`SigningKey`]
#[derive(Debug, thiserror::Error)]
pub enum InvalidSigningKey {
    /// The key has no `kid`
    #[error("key has no kid")]
    MissingKeyId,

    /// The key is intended for encryption
    #[error("key is intended for encryption")]
    EncryptionKey,

    /// The declared algorithm cannot be used with the key material
    #[error(transparent)]
    Algorithm(#[from] error::UnsupportedAlgorithm),
}

#[derive(Deserialize)]
struct SigningKeyDto {
    #[serde(rename = "kid", default)]
    key_id: Option<KeyId>,

    #[serde(rename = "use", default)]
    usage: Option<jwa::Usage>,

    #[serde(rename = "alg", default)]
    algorithm: Option<jwa::Algorithm>,

    #[serde(flatten)]
    material: KeyMaterial,
}

impl TryFrom<SigningKeyDto> for SigningKey {
    type Error = InvalidSigningKey;

    fn try_from(dto: SigningKeyDto) -> Result<Self, Self::Error> {
        let key_id = dto.key_id.ok_or(InvalidSigningKey::MissingKeyId)?;

        if dto.usage == Some(jwa::Usage::Encryption) {
            return Err(InvalidSigningKey::EncryptionKey);
        }

        if let Some(alg) = dto.algorithm {
            dto.material.check_family(alg)?;
        }

        Ok(Self {
            key_id,
            algorithm: dto.algorithm,
            usage: dto.usage,
            material: dto.material,
        })
    }
}
