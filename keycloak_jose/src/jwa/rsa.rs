//! RSA JSON Web Algorithm implementations

use keycloak_base64::Base64Url;
use serde::Deserialize;

use super::{Algorithm, AlgorithmFamily};
use crate::{error, jws};

/// Smallest accepted modulus size, in bits
pub const MIN_MODULUS_BITS: usize = 2048;

/// Largest accepted modulus size, in bits
pub const MAX_MODULUS_BITS: usize = 8192;

/// RSA public key components (`kty: "RSA"`)
///
/// The same key serves both PKCS#1 v1.5 (`RS*`) and PSS (`PS*`) signatures.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(try_from = "RsaPublicKeyDto")]
pub struct RsaPublicKey {
    modulus: Base64Url,
    exponent: Base64Url,
}

impl RsaPublicKey {
    /// Constructs a public key from the big-endian modulus and exponent
    ///
    /// Leading zero octets are stripped before the modulus size is checked.
    ///
    /// # Errors
    ///
    /// The modulus is outside the accepted size range or the exponent is
    /// empty.
    pub fn from_components(
        modulus: impl Into<Base64Url>,
        exponent: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let modulus = strip_leading_zeros(modulus.into());
        let exponent = strip_leading_zeros(exponent.into());

        let bits = bit_length(modulus.as_slice());
        if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&bits) {
            return Err(error::key_rejected(format!(
                "RSA modulus must be between {MIN_MODULUS_BITS} and {MAX_MODULUS_BITS} bits, got {bits}"
            )));
        }

        if exponent.is_empty() {
            return Err(error::key_rejected("RSA exponent must not be zero"));
        }

        Ok(Self { modulus, exponent })
    }

    /// The size of the modulus in bits
    #[must_use]
    pub fn modulus_bits(&self) -> usize {
        bit_length(self.modulus.as_slice())
    }
}

fn strip_leading_zeros(value: Base64Url) -> Base64Url {
    match value.as_slice().iter().position(|&b| b != 0) {
        Some(0) => value,
        Some(idx) => Base64Url::from(&value.as_slice()[idx..]),
        None => Base64Url::default(),
    }
}

fn bit_length(be_bytes: &[u8]) -> usize {
    match be_bytes.first() {
        Some(&first) => be_bytes.len() * 8 - first.leading_zeros() as usize,
        None => 0,
    }
}

fn verification_params(alg: Algorithm) -> Option<&'static ring::signature::RsaParameters> {
    match alg {
        Algorithm::RS256 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA256),
        Algorithm::RS384 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA384),
        Algorithm::RS512 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA512),
        Algorithm::PS256 => Some(&ring::signature::RSA_PSS_2048_8192_SHA256),
        Algorithm::PS384 => Some(&ring::signature::RSA_PSS_2048_8192_SHA384),
        Algorithm::PS512 => Some(&ring::signature::RSA_PSS_2048_8192_SHA512),
        _ => None,
    }
}

impl jws::Verifier for RsaPublicKey {
    type Algorithm = Algorithm;
    type Error = error::KeyVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        matches!(alg.family(), AlgorithmFamily::Rsa | AlgorithmFamily::RsaPss)
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        let params = verification_params(alg).ok_or(error::UnsupportedAlgorithm::IncompatibleKey {
            alg,
            kty: AlgorithmFamily::Rsa.key_type(),
        })?;

        let pk = ring::signature::RsaPublicKeyComponents {
            n: self.modulus.as_slice(),
            e: self.exponent.as_slice(),
        };

        pk.verify(params, message, signature)
            .map_err(|_| error::signature_mismatch())?;

        Ok(())
    }
}

impl TryFrom<RsaPublicKeyDto> for RsaPublicKey {
    type Error = error::KeyRejected;

    fn try_from(dto: RsaPublicKeyDto) -> Result<Self, Self::Error> {
        Self::from_components(dto.modulus, dto.exponent)
    }
}

#[derive(Deserialize)]
struct RsaPublicKeyDto {
    #[serde(rename = "n")]
    modulus: Base64Url,

    #[serde(rename = "e")]
    exponent: Base64Url,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_2048_bit_modulus_with_leading_zero() {
        let mut modulus = vec![0u8];
        modulus.extend(std::iter::repeat(0xc5).take(256));
        let key = RsaPublicKey::from_components(modulus, vec![1, 0, 1]).unwrap();
        assert_eq!(key.modulus_bits(), 2048);
    }

    #[test]
    fn rejects_short_modulus() {
        let err = RsaPublicKey::from_components(vec![0xff; 128], vec![1, 0, 1]).unwrap_err();
        assert!(err.to_string().contains("1024"));
    }

    #[test]
    fn rejects_oversized_modulus() {
        assert!(RsaPublicKey::from_components(vec![0xff; 1025], vec![1, 0, 1]).is_err());
    }

    #[test]
    fn rejects_zero_exponent() {
        assert!(RsaPublicKey::from_components(vec![0xff; 256], vec![0, 0]).is_err());
    }

    #[test]
    fn counts_bits_of_partial_leading_byte() {
        let mut modulus = vec![0x01];
        modulus.extend(std::iter::repeat(0xff).take(256));
        assert_eq!(bit_length(&modulus), 2049);
    }

    #[test]
    fn deserializes_from_jwk_members() {
        let json = include_str!("../../data/rsa/k1-public.json");
        let key: RsaPublicKey = serde_json::from_str(json).unwrap();
        assert_eq!(key.modulus_bits(), 2048);
    }
}
