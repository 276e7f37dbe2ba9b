//! HMAC JSON Web Algorithm implementations

use std::fmt;

use keycloak_base64::Base64Url;
use serde::Deserialize;

use super::{Algorithm, AlgorithmFamily};
use crate::{error, jws};

/// HMAC shared secret (`kty: "oct"`)
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "HmacKeyDto")]
#[must_use]
pub struct HmacKey {
    secret: Base64Url,
}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("HmacKey { secret: <redacted> }")
    }
}

impl HmacKey {
    /// HMAC using the provided secret
    ///
    /// # Errors
    ///
    /// The secret is empty.
    pub fn new(secret: impl Into<Base64Url>) -> Result<Self, error::KeyRejected> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(error::key_rejected("HMAC secret must not be empty"));
        }

        Ok(Self { secret })
    }

    #[cfg(feature = "test-util")]
    pub(crate) fn secret(&self) -> &[u8] {
        self.secret.as_slice()
    }
}

pub(crate) fn ring_algorithm(alg: Algorithm) -> Option<ring::hmac::Algorithm> {
    match alg {
        Algorithm::HS256 => Some(ring::hmac::HMAC_SHA256),
        Algorithm::HS384 => Some(ring::hmac::HMAC_SHA384),
        Algorithm::HS512 => Some(ring::hmac::HMAC_SHA512),
        _ => None,
    }
}

impl jws::Verifier for HmacKey {
    type Algorithm = Algorithm;
    type Error = error::KeyVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        alg.family() == AlgorithmFamily::Hmac
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        let ring_alg = ring_algorithm(alg).ok_or(error::UnsupportedAlgorithm::IncompatibleKey {
            alg,
            kty: AlgorithmFamily::Hmac.key_type(),
        })?;

        let key = ring::hmac::Key::new(ring_alg, self.secret.as_slice());
        ring::hmac::verify(&key, message, signature).map_err(|_| error::signature_mismatch())?;
        Ok(())
    }
}

impl TryFrom<HmacKeyDto> for HmacKey {
    type Error = error::KeyRejected;

    fn try_from(dto: HmacKeyDto) -> Result<Self, Self::Error> {
        Self::new(dto.k)
    }
}

#[derive(Deserialize)]
struct HmacKeyDto {
    k: Base64Url,
}
