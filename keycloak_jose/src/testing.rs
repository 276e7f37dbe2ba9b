//! Token minting for tests
//!
//! Verification is the only capability this crate offers in production.
//! Tests of code built on top of it still need tokens signed by a known key,
//! which is what [`TestSigner`] provides. Two pre-generated 2048-bit RSA keys
//! ship with the crate so that tests do not pay for RSA key generation.

use std::fmt;

use keycloak_base64::Base64Url;
use ring::{
    rand::SystemRandom,
    signature::{self, EcdsaKeyPair, KeyPair, RsaKeyPair},
};
use serde_json::{json, Value};

use crate::{error, jwa, jwk, jwt::Jwt, SigningKey};

const K1_PRIVATE: &[u8] = include_bytes!("../data/rsa/k1-private.pk8");
const K1_PUBLIC: &str = include_str!("../data/rsa/k1-public.json");
const K2_PRIVATE: &[u8] = include_bytes!("../data/rsa/k2-private.pk8");
const K2_PUBLIC: &str = include_str!("../data/rsa/k2-public.json");

/// A JWKS document in the shape Keycloak serves from its `certs` endpoint
///
/// Holds the public half of the `k1` fixture alongside an encryption key and
/// an Ed25519 key, neither of which can be used for verification.
pub const KEYCLOAK_CERTS: &str = include_str!("../data/keycloak-certs.json");

/// One of the pre-generated RSA key pairs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RsaFixture {
    /// The key published as `k1`
    K1,
    /// The key published as `k2`
    K2,
}

impl RsaFixture {
    fn private_der(self) -> &'static [u8] {
        match self {
            Self::K1 => K1_PRIVATE,
            Self::K2 => K2_PRIVATE,
        }
    }

    fn public_jwk(self) -> &'static str {
        match self {
            Self::K1 => K1_PUBLIC,
            Self::K2 => K2_PUBLIC,
        }
    }
}

enum SignerKey {
    Hmac(jwa::HmacKey),
    Rsa(RsaKeyPair, RsaFixture),
    Ec(EcdsaKeyPair, jwa::ec::Curve),
}

/// Signs tokens with a private key whose public half can be published
#[must_use]
pub struct TestSigner {
    key_id: jwk::KeyId,
    algorithm: jwa::Algorithm,
    key: SignerKey,
    rng: SystemRandom,
}

impl fmt::Debug for TestSigner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TestSigner")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl TestSigner {
    /// A signer using one of the RSA fixtures, published under `kid`
    ///
    /// # Errors
    ///
    /// `alg` is not an RSA algorithm, or the fixture cannot be loaded.
    pub fn rsa(
        kid: impl Into<jwk::KeyId>,
        fixture: RsaFixture,
        alg: jwa::Algorithm,
    ) -> Result<Self, error::Unexpected> {
        if !matches!(
            alg.family(),
            jwa::AlgorithmFamily::Rsa | jwa::AlgorithmFamily::RsaPss
        ) {
            return Err(error::unexpected(format!("{alg} is not an RSA algorithm")));
        }

        let pair = RsaKeyPair::from_pkcs8(fixture.private_der())
            .map_err(|e| error::unexpected(e.to_string()))?;

        Ok(Self {
            key_id: kid.into(),
            algorithm: alg,
            key: SignerKey::Rsa(pair, fixture),
            rng: SystemRandom::new(),
        })
    }

    /// An RS256 signer for the `k1` fixture
    ///
    /// # Errors
    ///
    /// The fixture cannot be loaded.
    pub fn k1() -> Result<Self, error::Unexpected> {
        Self::rsa("k1", RsaFixture::K1, jwa::Algorithm::RS256)
    }

    /// An RS256 signer for the `k2` fixture
    ///
    /// # Errors
    ///
    /// The fixture cannot be loaded.
    pub fn k2() -> Result<Self, error::Unexpected> {
        Self::rsa("k2", RsaFixture::K2, jwa::Algorithm::RS256)
    }

    /// A signer using a shared secret
    ///
    /// # Errors
    ///
    /// `alg` is not an HMAC algorithm, or the secret is empty.
    pub fn hmac(
        kid: impl Into<jwk::KeyId>,
        secret: impl Into<Base64Url>,
        alg: jwa::Algorithm,
    ) -> Result<Self, error::Unexpected> {
        if alg.family() != jwa::AlgorithmFamily::Hmac {
            return Err(error::unexpected(format!("{alg} is not an HMAC algorithm")));
        }

        let key = jwa::HmacKey::new(secret).map_err(error::unexpected)?;

        Ok(Self {
            key_id: kid.into(),
            algorithm: alg,
            key: SignerKey::Hmac(key),
            rng: SystemRandom::new(),
        })
    }

    /// A signer with a freshly generated EC key on the curve `alg` requires
    ///
    /// # Errors
    ///
    /// `alg` is not an EC algorithm, or key generation fails.
    pub fn ec(kid: impl Into<jwk::KeyId>, alg: jwa::Algorithm) -> Result<Self, error::Unexpected> {
        let (curve, signing_alg) = match alg {
            jwa::Algorithm::ES256 => (
                jwa::ec::Curve::P256,
                &signature::ECDSA_P256_SHA256_FIXED_SIGNING,
            ),
            jwa::Algorithm::ES384 => (
                jwa::ec::Curve::P384,
                &signature::ECDSA_P384_SHA384_FIXED_SIGNING,
            ),
            _ => return Err(error::unexpected(format!("{alg} is not an EC algorithm"))),
        };

        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(signing_alg, &rng)
            .map_err(|_| error::unexpected("EC key generation failed"))?;
        let pair = EcdsaKeyPair::from_pkcs8(signing_alg, pkcs8.as_ref(), &rng)
            .map_err(|e| error::unexpected(e.to_string()))?;

        Ok(Self {
            key_id: kid.into(),
            algorithm: alg,
            key: SignerKey::Ec(pair, curve),
            rng,
        })
    }

    /// Publishes the key under a different ID
    pub fn with_key_id(self, kid: impl Into<jwk::KeyId>) -> Self {
        Self {
            key_id: kid.into(),
            ..self
        }
    }

    /// The ID the key is published under
    #[must_use]
    pub fn key_id(&self) -> &jwk::KeyIdRef {
        &self.key_id
    }

    /// The algorithm used for signing
    #[must_use]
    pub fn algorithm(&self) -> jwa::Algorithm {
        self.algorithm
    }

    /// The public JWK, as a provider would publish it
    #[must_use]
    pub fn jwk(&self) -> Value {
        let mut jwk = match &self.key {
            SignerKey::Rsa(_, fixture) => {
                serde_json::from_str(fixture.public_jwk()).unwrap_or_else(|_| json!({}))
            }
            SignerKey::Hmac(key) => json!({
                "kty": "oct",
                "k": Base64Url::from_raw(key.secret()).to_string(),
            }),
            SignerKey::Ec(pair, curve) => {
                let point = pair.public_key().as_ref();
                let size = curve.coordinate_size();
                let x = point.get(1..=size).unwrap_or_default();
                let y = point.get(1 + size..).unwrap_or_default();
                json!({
                    "kty": "EC",
                    "crv": curve.to_string(),
                    "x": Base64Url::from_raw(x).to_string(),
                    "y": Base64Url::from_raw(y).to_string(),
                })
            }
        };

        if let Value::Object(members) = &mut jwk {
            members.insert("kid".into(), self.key_id.as_str().into());
            members.insert("alg".into(), self.algorithm.as_str().into());
            members.insert("use".into(), "sig".into());
        }

        jwk
    }

    /// A JWKS document publishing each signer's public key
    #[must_use]
    pub fn jwks<'a>(signers: impl IntoIterator<Item = &'a TestSigner>) -> Value {
        let keys: Vec<Value> = signers.into_iter().map(Self::jwk).collect();
        json!({ "keys": keys })
    }

    /// The verification key matching this signer
    ///
    /// # Errors
    ///
    /// The public JWK does not parse, which indicates a broken fixture.
    pub fn signing_key(&self) -> Result<SigningKey, error::Unexpected> {
        serde_json::from_value(self.jwk()).map_err(error::unexpected)
    }

    /// Signs `claims` under a header naming this signer's algorithm and key
    ///
    /// # Errors
    ///
    /// The signing operation fails.
    pub fn sign(&self, claims: &Value) -> Result<Jwt, error::Unexpected> {
        let header = json!({
            "alg": self.algorithm.as_str(),
            "kid": self.key_id.as_str(),
            "typ": "JWT",
        });

        self.sign_with_header(&header, claims)
    }

    /// Signs `claims` under an arbitrary header
    ///
    /// The signature is always made with this signer's own algorithm, so a
    /// header may lie about `alg` or `kid`.
    ///
    /// # Errors
    ///
    /// The signing operation fails.
    pub fn sign_with_header(&self, header: &Value, claims: &Value) -> Result<Jwt, error::Unexpected> {
        let h = Base64Url::from_raw(serde_json::to_vec(header).map_err(error::unexpected)?);
        let p = Base64Url::from_raw(serde_json::to_vec(claims).map_err(error::unexpected)?);
        let message = format!("{h}.{p}");

        let signature = self.sign_message(message.as_bytes())?;
        Ok(Jwt::new(format!("{message}.{}", Base64Url::from_raw(signature))))
    }

    fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, error::Unexpected> {
        match &self.key {
            SignerKey::Hmac(key) => {
                let alg = jwa::hmac::ring_algorithm(self.algorithm)
                    .ok_or_else(|| error::unexpected("HMAC signer with non-HMAC algorithm"))?;
                let key = ring::hmac::Key::new(alg, key.secret());
                Ok(ring::hmac::sign(&key, message).as_ref().to_vec())
            }
            SignerKey::Rsa(pair, _) => {
                let padding: &'static dyn signature::RsaEncoding = match self.algorithm {
                    jwa::Algorithm::RS256 => &signature::RSA_PKCS1_SHA256,
                    jwa::Algorithm::RS384 => &signature::RSA_PKCS1_SHA384,
                    jwa::Algorithm::RS512 => &signature::RSA_PKCS1_SHA512,
                    jwa::Algorithm::PS256 => &signature::RSA_PSS_SHA256,
                    jwa::Algorithm::PS384 => &signature::RSA_PSS_SHA384,
                    jwa::Algorithm::PS512 => &signature::RSA_PSS_SHA512,
                    _ => return Err(error::unexpected("RSA signer with non-RSA algorithm")),
                };

                let mut sig = vec![0; pair.public().modulus_len()];
                pair.sign(padding, &self.rng, message, &mut sig)
                    .map_err(|_| error::unexpected("RSA signing failed"))?;
                Ok(sig)
            }
            SignerKey::Ec(pair, _) => pair
                .sign(&self.rng, message)
                .map(|sig| sig.as_ref().to_vec())
                .map_err(|_| error::unexpected("ECDSA signing failed")),
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::{jwt, jws::Verifier, Jwks};

    fn claims() -> Value {
        json!({
            "iss": "https://sso.example.com/realms/demo",
            "aud": "account",
            "exp": 4_102_444_800_u64,
        })
    }

    fn validator() -> jwt::Validator {
        jwt::Validator::default()
            .require_issuer(jwt::Issuer::from_static("https://sso.example.com/realms/demo"))
            .add_allowed_audience(jwt::Audience::from_static("account"))
    }

    #[test]
    fn rsa_fixture_round_trips() -> Result<()> {
        let signer = TestSigner::k1()?;
        let token = signer.sign(&claims())?;
        let claims = token.verify(&signer.signing_key()?, &validator())?;
        assert_eq!(claims.iss().map(|i| i.as_str()), Some("https://sso.example.com/realms/demo"));
        Ok(())
    }

    #[test]
    fn every_algorithm_round_trips() -> Result<()> {
        let signers = [
            TestSigner::hmac("h256", b"secret".to_vec(), jwa::Algorithm::HS256)?,
            TestSigner::hmac("h384", b"secret".to_vec(), jwa::Algorithm::HS384)?,
            TestSigner::hmac("h512", b"secret".to_vec(), jwa::Algorithm::HS512)?,
            TestSigner::rsa("r256", RsaFixture::K1, jwa::Algorithm::RS256)?,
            TestSigner::rsa("r384", RsaFixture::K1, jwa::Algorithm::RS384)?,
            TestSigner::rsa("r512", RsaFixture::K2, jwa::Algorithm::RS512)?,
            TestSigner::rsa("p256", RsaFixture::K1, jwa::Algorithm::PS256)?,
            TestSigner::rsa("p384", RsaFixture::K2, jwa::Algorithm::PS384)?,
            TestSigner::rsa("p512", RsaFixture::K1, jwa::Algorithm::PS512)?,
            TestSigner::ec("e256", jwa::Algorithm::ES256)?,
            TestSigner::ec("e384", jwa::Algorithm::ES384)?,
        ];

        for signer in &signers {
            let token = signer.sign(&claims())?;
            let _ = token.verify(&signer.signing_key()?, &validator())?;
        }

        Ok(())
    }

    #[test]
    fn published_jwks_parses() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let ec = TestSigner::ec("ec", jwa::Algorithm::ES256)?;
        let jwks: Jwks = serde_json::from_value(TestSigner::jwks([&k1, &ec]))?;
        assert_eq!(jwks.keys().len(), 2);
        Ok(())
    }

    #[test]
    fn other_fixture_does_not_verify() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let forged = TestSigner::k2()?.with_key_id("k1");

        let token = forged.sign(&claims())?;
        let decomposed = token.decompose()?;
        let err = k1
            .signing_key()?
            .verify(
                jwa::Algorithm::RS256,
                decomposed.message().as_bytes(),
                decomposed.signature(),
            )
            .unwrap_err();
        assert!(matches!(err, error::KeyVerifyError::SignatureMismatch(_)));
        Ok(())
    }

    #[test]
    fn refuses_mismatched_family() {
        assert!(TestSigner::rsa("x", RsaFixture::K1, jwa::Algorithm::HS256).is_err());
        assert!(TestSigner::hmac("x", b"s".to_vec(), jwa::Algorithm::ES256).is_err());
        assert!(TestSigner::ec("x", jwa::Algorithm::PS256).is_err());
    }

    #[test]
    fn keycloak_certs_fixture_matches_k1() -> Result<()> {
        let jwks: Jwks = serde_json::from_str(KEYCLOAK_CERTS)?;
        let published = &jwks.keys()[0];
        assert_eq!(published, &TestSigner::k1()?.signing_key()?);
        Ok(())
    }
}
