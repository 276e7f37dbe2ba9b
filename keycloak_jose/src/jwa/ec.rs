//! ECC JSON Web Algorithm implementations

use std::fmt;

use keycloak_base64::Base64Url;
use serde::{Deserialize, Serialize};

use super::{Algorithm, AlgorithmFamily};
use crate::{error, jws};

/// A named ECC curve
///
/// P-521 is not listed because the crypto backend cannot verify it; keys on
/// that curve are rejected when the key set is parsed.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    /// The P-256 curve (prime256v1/secp256r1)
    #[serde(rename = "P-256")]
    P256,

    /// The P-384 curve (secp384r1)
    #[serde(rename = "P-384")]
    P384,
}

impl Curve {
    /// Size in bytes of a single affine coordinate
    #[must_use]
    pub const fn coordinate_size(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
        }
    }

    /// The signing algorithm defined for this curve
    #[must_use]
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::P256 => Algorithm::ES256,
            Self::P384 => Algorithm::ES384,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
        })
    }
}

/// Elliptic curve public key (`kty: "EC"`)
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(try_from = "EcPublicKeyDto")]
pub struct EcPublicKey {
    curve: Curve,
    /// Uncompressed SEC1 point, `0x04 || x || y`
    point: Vec<u8>,
}

impl EcPublicKey {
    /// Constructs a public key from its affine coordinates
    ///
    /// # Errors
    ///
    /// A coordinate does not have the length the curve requires.
    pub fn from_coordinates(
        curve: Curve,
        x: impl Into<Base64Url>,
        y: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let x = x.into();
        let y = y.into();
        let size = curve.coordinate_size();

        if x.len() != size || y.len() != size {
            return Err(error::key_rejected(format!(
                "{curve} coordinates must be {size} bytes"
            )));
        }

        let mut point = Vec::with_capacity(1 + 2 * size);
        point.push(0x04);
        point.extend_from_slice(x.as_slice());
        point.extend_from_slice(y.as_slice());

        Ok(Self { curve, point })
    }

    /// Constructs a public key from an uncompressed SEC1 point
    ///
    /// # Errors
    ///
    /// The point is not uncompressed or has the wrong length for the curve.
    pub fn from_uncompressed_point(curve: Curve, point: &[u8]) -> Result<Self, error::KeyRejected> {
        let size = curve.coordinate_size();
        match point.split_first() {
            Some((&0x04, coords)) if coords.len() == 2 * size => {
                let (x, y) = coords.split_at(size);
                Self::from_coordinates(curve, x, y)
            }
            _ => Err(error::key_rejected("expected an uncompressed EC point")),
        }
    }

    /// The curve this key lies on
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// The affine coordinates of the public point
    #[must_use]
    pub fn coordinates(&self) -> (&[u8], &[u8]) {
        let size = self.curve.coordinate_size();
        self.point[1..].split_at(size)
    }

    fn verification_algorithm(
        &self,
        alg: Algorithm,
    ) -> Result<&'static ring::signature::EcdsaVerificationAlgorithm, error::UnsupportedAlgorithm>
    {
        match (alg, self.curve) {
            (Algorithm::ES256, Curve::P256) => Ok(&ring::signature::ECDSA_P256_SHA256_FIXED),
            (Algorithm::ES384, Curve::P384) => Ok(&ring::signature::ECDSA_P384_SHA384_FIXED),
            (Algorithm::ES256 | Algorithm::ES384, curve) => {
                Err(error::UnsupportedAlgorithm::CurveMismatch { alg, curve })
            }
            _ => Err(error::UnsupportedAlgorithm::IncompatibleKey {
                alg,
                kty: AlgorithmFamily::EllipticCurve.key_type(),
            }),
        }
    }
}

impl jws::Verifier for EcPublicKey {
    type Algorithm = Algorithm;
    type Error = error::KeyVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        self.verification_algorithm(alg).is_ok()
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        let verification_alg = self.verification_algorithm(alg)?;

        ring::signature::UnparsedPublicKey::new(verification_alg, &self.point)
            .verify(message, signature)
            .map_err(|_| error::signature_mismatch())?;

        Ok(())
    }
}

impl TryFrom<EcPublicKeyDto> for EcPublicKey {
    type Error = error::KeyRejected;

    fn try_from(dto: EcPublicKeyDto) -> Result<Self, Self::Error> {
        Self::from_coordinates(dto.curve, dto.x, dto.y)
    }
}

#[derive(Deserialize)]
struct EcPublicKeyDto {
    #[serde(rename = "crv")]
    curve: Curve,
    x: Base64Url,
    y: Base64Url,
}
