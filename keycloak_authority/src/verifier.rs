use std::{fmt, sync::Arc};

use keycloak_jose::{
    clock::{Clock, System},
    jwt::{AudienceRef, IssuerRef, Validator},
    Claims, JwtRef,
};

use crate::{cache::KeySetCache, config::VerifierConfig, error::VerifyError, source::KeySource};

struct Inner {
    keys: KeySetCache,
    validator: Validator,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Inner")
            .field("keys", &self.keys)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

/// Verifies bearer tokens against the signing keys of a provider
///
/// A token is accepted only if it is a well-formed compact JWS, names an
/// approved algorithm and a key the provider publishes, the key is of the
/// family that algorithm requires, the signature verifies, and the claims
/// pass validation.
///
/// The only point at which verification waits is when the cached keys must
/// be fetched. Cloning is cheap and yields a handle to the same verifier.
#[derive(Clone, Debug)]
#[must_use]
pub struct TokenVerifier {
    inner: Arc<Inner>,
}

impl TokenVerifier {
    /// A verifier using `keys` and the rules of `validator`
    pub fn new(keys: KeySetCache, validator: Validator) -> Self {
        Self::with_clock(keys, validator, Arc::new(System))
    }

    /// A verifier checking token lifetimes against `clock`
    pub fn with_clock(keys: KeySetCache, validator: Validator, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                keys,
                validator,
                clock,
            }),
        }
    }

    /// A verifier for the settings in `config`, fetching keys over HTTP
    ///
    /// # Errors
    ///
    /// The HTTP client could not be built.
    #[cfg(feature = "reqwest")]
    #[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
    pub fn from_config(config: &VerifierConfig) -> Result<Self, crate::KeyFetchError> {
        let source = crate::source::RemoteKeySource::new(config.jwks_url.clone())?;
        Ok(Self::from_config_with_source(config, source))
    }

    /// A verifier for the settings in `config`, reading keys from `source`
    ///
    /// The `jwks_url` of the configuration is not used.
    pub fn from_config_with_source(
        config: &VerifierConfig,
        source: impl KeySource + 'static,
    ) -> Self {
        Self::from_config_with_clock(config, source, Arc::new(System))
    }

    /// As [`from_config_with_source()`][Self::from_config_with_source], with
    /// a specific clock for both token lifetimes and key set age
    pub fn from_config_with_clock(
        config: &VerifierConfig,
        source: impl KeySource + 'static,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let keys = KeySetCache::builder(source)
            .ttl(config.cache_ttl())
            .fetch_timeout(config.fetch_timeout())
            .refresh_cooldown(config.refresh_cooldown())
            .stale_policy(config.stale_policy)
            .clock(Arc::clone(&clock))
            .build();

        let validator = config.validator(config.issuer.clone(), config.audience.clone());

        Self::with_clock(keys, validator, clock)
    }

    /// The key cache backing this verifier
    #[must_use]
    pub fn keys(&self) -> &KeySetCache {
        &self.inner.keys
    }

    /// The rules tokens are validated against
    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.inner.validator
    }

    /// Verifies `token` against the configured issuer and audience
    ///
    /// # Errors
    ///
    /// The token was rejected. See [`VerifyError`] for the reasons.
    pub async fn verify(&self, token: &JwtRef) -> Result<Claims, VerifyError> {
        self.verify_against(token, &self.inner.validator).await
    }

    /// Verifies `token`, requiring exactly `expected_issuer` and an audience
    /// including `expected_audience`
    ///
    /// All other rules are those of the configured validator.
    ///
    /// # Errors
    ///
    /// The token was rejected. See [`VerifyError`] for the reasons.
    pub async fn verify_with(
        &self,
        token: &JwtRef,
        expected_issuer: &IssuerRef,
        expected_audience: &AudienceRef,
    ) -> Result<Claims, VerifyError> {
        let validator = self
            .inner
            .validator
            .clone()
            .require_issuer(expected_issuer.to_owned())
            .require_audience(expected_audience.to_owned());

        self.verify_against(token, &validator).await
    }

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(jwt.alg = tracing::field::Empty, jwk.kid = tracing::field::Empty)
    )]
    async fn verify_against(
        &self,
        token: &JwtRef,
        validator: &Validator,
    ) -> Result<Claims, VerifyError> {
        let span = tracing::Span::current();
        let decomposed = token.decompose().map_err(|err| {
            tracing::debug!(reason = err.reason(), "rejecting malformed token");
            err
        })?;

        let header = decomposed.untrusted_header();
        if let Some(alg) = header.alg() {
            span.record("jwt.alg", alg);
        }

        // The algorithm is settled before any key is fetched
        let alg = validator.check_algorithm(header).map_err(|err| {
            tracing::debug!(error = %err, "rejecting token algorithm");
            err
        })?;

        let kid = match header.kid() {
            Some(kid) => kid.to_owned(),
            None => {
                tracing::debug!("token header names no key");
                return Err(VerifyError::UnknownKey { kid: None });
            }
        };
        span.record("jwk.kid", kid.as_str());

        let mut keys = self.inner.keys.keys().await?;
        if keys.get(&kid).is_none() {
            tracing::debug!("key not in cached key set; refreshing");
            keys = self.inner.keys.refresh().await?;
        }

        let key = keys.get(&kid).ok_or_else(|| {
            tracing::debug!("unable to find matching key");
            VerifyError::UnknownKey {
                kid: Some(kid.clone()),
            }
        })?;

        key.check_algorithm(alg).map_err(|err| {
            tracing::debug!(error = %err, "token algorithm does not fit key");
            err
        })?;

        let claims = decomposed
            .verify(key, alg, validator, &*self.inner.clock)
            .map_err(VerifyError::from)
            .map_err(|err| {
                tracing::debug!(error = %err, "token rejected");
                err
            })?;

        tracing::trace!("token verified");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
        time::Duration,
    };

    use color_eyre::Result;
    use keycloak_jose::{
        clock::{TestClock, UnixTime},
        error::UnsupportedAlgorithm,
        jwa::Algorithm,
        jwt::{Audience, Issuer},
        testing::{RsaFixture, TestSigner},
        Jwks,
    };
    use serde_json::{json, Value};

    use super::*;
    use crate::error::KeyFetchError;

    const NOW: u64 = 1_700_000_000;
    const ISSUER: &str = "https://sso.example.com/realms/demo";
    const AUDIENCE: &str = "account";

    #[derive(Debug)]
    struct Provider {
        jwks: Mutex<Value>,
        fetches: AtomicUsize,
        delay: Duration,
    }

    impl Provider {
        fn publishing<'a>(signers: impl IntoIterator<Item = &'a TestSigner>) -> Arc<Self> {
            Arc::new(Self {
                jwks: Mutex::new(TestSigner::jwks(signers)),
                fetches: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }

        fn slow(self: Arc<Self>, delay: Duration) -> Arc<Self> {
            let jwks = self.jwks.lock().map(|j| j.clone()).unwrap_or_default();
            Arc::new(Self {
                jwks: Mutex::new(jwks),
                fetches: AtomicUsize::new(0),
                delay,
            })
        }

        fn publish<'a>(&self, signers: impl IntoIterator<Item = &'a TestSigner>) {
            if let Ok(mut jwks) = self.jwks.lock() {
                *jwks = TestSigner::jwks(signers);
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl KeySource for Provider {
        async fn fetch(&self) -> Result<Jwks, KeyFetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let jwks = self
                .jwks
                .lock()
                .map(|j| j.clone())
                .map_err(|_| KeyFetchError::Status(500))?;
            serde_json::from_value(jwks).map_err(KeyFetchError::decode)
        }
    }

    fn config() -> VerifierConfig {
        VerifierConfig::new(
            Issuer::from_static(ISSUER),
            Audience::from_static(AUDIENCE),
            "unused",
        )
        .with_refresh_cooldown(Duration::ZERO)
    }

    fn verifier(provider: &Arc<Provider>, config: &VerifierConfig) -> (TokenVerifier, Arc<TestClock>) {
        let clock = Arc::new(TestClock::new(UnixTime(NOW)));
        let verifier =
            TokenVerifier::from_config_with_clock(config, Arc::clone(provider), clock.clone());
        (verifier, clock)
    }

    fn claims() -> Value {
        json!({
            "iss": ISSUER,
            "aud": AUDIENCE,
            "sub": "f8a3c2d1",
            "exp": NOW + 300,
            "iat": NOW,
            "preferred_username": "alice",
        })
    }

    #[tokio::test]
    async fn accepts_token_signed_by_published_key() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let verified = verifier.verify(&k1.sign(&claims())?).await?;

        assert_eq!(verified.sub(), Some("f8a3c2d1"));
        assert_eq!(verified.get("preferred_username"), Some(&json!("alice")));
        assert_eq!(provider.fetches(), 1);

        let again = verifier.verify(&k1.sign(&claims())?).await?;
        assert_eq!(again.sub(), Some("f8a3c2d1"));
        assert_eq!(provider.fetches(), 1, "second token uses cached keys");
        Ok(())
    }

    #[tokio::test]
    async fn every_family_verifies() -> Result<()> {
        let signers = [
            TestSigner::rsa("rs384", RsaFixture::K1, Algorithm::RS384)?,
            TestSigner::rsa("ps256", RsaFixture::K2, Algorithm::PS256)?,
            TestSigner::ec("es256", Algorithm::ES256)?,
            TestSigner::ec("es384", Algorithm::ES384)?,
            TestSigner::hmac("hs512", b"a-shared-secret".to_vec(), Algorithm::HS512)?,
        ];
        let provider = Provider::publishing(&signers);
        let (verifier, _) = verifier(&provider, &config());

        for signer in &signers {
            let verified = verifier.verify(&signer.sign(&claims())?).await?;
            assert_eq!(verified.sub(), Some("f8a3c2d1"));
        }
        assert_eq!(provider.fetches(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_key_after_forced_refresh() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let k2 = TestSigner::k2()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let err = verifier.verify(&k2.sign(&claims())?).await.unwrap_err();

        match err {
            VerifyError::UnknownKey { kid: Some(kid) } => assert_eq!(kid.as_str(), "k2"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(provider.fetches(), 2, "one fetch plus one forced refresh");
        Ok(())
    }

    #[tokio::test]
    async fn rotated_key_is_picked_up_by_refresh() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let k2 = TestSigner::k2()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let _ = verifier.verify(&k1.sign(&claims())?).await?;

        provider.publish([&k1, &k2]);
        let _ = verifier.verify(&k2.sign(&claims())?).await?;
        assert_eq!(provider.fetches(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn key_rotated_just_after_a_fetch_is_picked_up() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let k2 = TestSigner::k2()?;
        let provider = Provider::publishing([&k1]);
        let config = VerifierConfig::new(
            Issuer::from_static(ISSUER),
            Audience::from_static(AUDIENCE),
            "unused",
        );
        let (verifier, clock) = verifier(&provider, &config);

        let _ = verifier.verify(&k1.sign(&claims())?).await?;

        provider.publish([&k1, &k2]);
        clock.advance(Duration::from_secs(5));

        let verified = verifier.verify(&k2.sign(&claims())?).await?;
        assert_eq!(verified.sub(), Some("f8a3c2d1"));
        assert_eq!(provider.fetches(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_cooldown_limits_unknown_key_fetches() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let config = config().with_refresh_cooldown(Duration::from_secs(10));
        let (verifier, clock) = verifier(&provider, &config);

        let _ = verifier.verify(&k1.sign(&claims())?).await?;
        clock.advance(Duration::from_secs(30));

        for kid in ["r1", "r2", "r3"] {
            let signer = TestSigner::k1()?.with_key_id(kid);
            let err = verifier.verify(&signer.sign(&claims())?).await.unwrap_err();
            assert!(err.is_unknown_key());
        }
        assert_eq!(provider.fetches(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn token_without_kid_is_unknown_key() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let token = k1.sign_with_header(&json!({ "alg": "RS256" }), &claims())?;
        let err = verifier.verify(&token).await.unwrap_err();

        assert!(matches!(err, VerifyError::UnknownKey { kid: None }));
        assert_eq!(provider.fetches(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn header_that_is_not_json_is_malformed() -> Result<()> {
        let provider = Provider::publishing([&TestSigner::k1()?]);
        let (verifier, _) = verifier(&provider, &config());

        // "bm90LWpzb24" is "not-json"
        let token = JwtRef::from_str("bm90LWpzb24.eyJzdWIiOiJ4In0.c2lnbmF0dXJl");
        let err = verifier.verify(token).await.unwrap_err();

        assert!(err.is_malformed_token());
        assert_eq!(provider.fetches(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn structural_defects_are_malformed() -> Result<()> {
        let provider = Provider::publishing([&TestSigner::k1()?]);
        let (verifier, _) = verifier(&provider, &config());

        for token in ["", "a.b", "a.b.c.d", "eyJhbGciOiJSUzI1NiJ9..c2ln", "a.b.!!!"] {
            let err = verifier.verify(JwtRef::from_str(token)).await.unwrap_err();
            assert!(err.is_malformed_token(), "{token:?} gave {err:?}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn alg_none_is_unsupported() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let token = k1.sign_with_header(&json!({ "alg": "none", "kid": "k1" }), &claims())?;
        let err = verifier.verify(&token).await.unwrap_err();

        assert!(matches!(
            err,
            VerifyError::UnsupportedAlgorithm(UnsupportedAlgorithm::Unknown(ref alg)) if alg == "none"
        ));
        assert_eq!(provider.fetches(), 0, "rejected before any key lookup");
        Ok(())
    }

    #[tokio::test]
    async fn disallowed_algorithm_is_unsupported() -> Result<()> {
        let ps = TestSigner::rsa("k1", RsaFixture::K1, Algorithm::PS256)?;
        let provider = Provider::publishing([&ps]);
        let config = config().with_algorithms([Algorithm::RS256]);
        let (verifier, _) = verifier(&provider, &config);

        let err = verifier.verify(&ps.sign(&claims())?).await.unwrap_err();

        assert!(matches!(
            err,
            VerifyError::UnsupportedAlgorithm(UnsupportedAlgorithm::NotApproved(Algorithm::PS256))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn empty_algorithm_list_refuses_every_token() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let config = config().with_algorithms(Vec::new());
        let (verifier, _) = verifier(&provider, &config);

        let err = verifier.verify(&k1.sign(&claims())?).await.unwrap_err();

        assert!(matches!(
            err,
            VerifyError::UnsupportedAlgorithm(UnsupportedAlgorithm::NotApproved(Algorithm::RS256))
        ));
        assert_eq!(provider.fetches(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn hmac_token_against_rsa_key_is_refused() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let forger = TestSigner::hmac("k1", b"public-key-bytes".to_vec(), Algorithm::HS256)?;
        let err = verifier.verify(&forger.sign(&claims())?).await.unwrap_err();

        assert!(err.is_unsupported_algorithm(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn algorithm_other_than_the_key_declares_is_refused() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let pss = TestSigner::rsa("k1", RsaFixture::K1, Algorithm::PS256)?;
        let err = verifier.verify(&pss.sign(&claims())?).await.unwrap_err();

        assert!(matches!(
            err,
            VerifyError::UnsupportedAlgorithm(UnsupportedAlgorithm::KeyAlgorithmMismatch { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unrelated_key_with_same_kid_is_signature_invalid() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let impostor = TestSigner::k2()?.with_key_id("k1");
        let err = verifier.verify(&impostor.sign(&claims())?).await.unwrap_err();

        assert!(err.is_signature_invalid(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn tampered_payload_is_signature_invalid() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let token = k1.sign(&claims())?;
        let mut parts: Vec<&str> = token.as_str().split('.').collect();
        let other = k1.sign(&json!({ "iss": ISSUER, "aud": AUDIENCE, "exp": NOW + 9_999 }))?;
        parts[1] = other.as_str().split('.').nth(1).unwrap_or_default();
        let tampered = JwtRef::from_str(&parts.join(".")).to_owned();

        let err = verifier.verify(&tampered).await.unwrap_err();
        assert!(err.is_signature_invalid(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_rejected() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, clock) = verifier(&provider, &config());

        let token = k1.sign(&claims())?;
        clock.advance(Duration::from_secs(300));

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(err.is_token_expired(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn leeway_tolerates_clock_skew() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let config = config().with_leeway(Duration::from_secs(60));
        let (verifier, clock) = verifier(&provider, &config);

        let token = k1.sign(&claims())?;
        clock.advance(Duration::from_secs(330));
        let _ = verifier.verify(&token).await?;

        clock.advance(Duration::from_secs(30));
        assert!(verifier.verify(&token).await.unwrap_err().is_token_expired());
        Ok(())
    }

    #[tokio::test]
    async fn missing_exp_is_expired() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let token = k1.sign(&json!({ "iss": ISSUER, "aud": AUDIENCE }))?;
        assert!(verifier.verify(&token).await.unwrap_err().is_token_expired());
        Ok(())
    }

    #[tokio::test]
    async fn future_nbf_is_rejected_when_checked() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let mut claims = claims();
        claims["nbf"] = json!(NOW + 120);
        let token = k1.sign(&claims)?;

        let (lenient, _) = verifier(&provider, &config());
        let _ = lenient.verify(&token).await?;

        let (strict, _) = verifier(&provider, &config().check_not_before());
        assert!(strict.verify(&token).await.unwrap_err().is_token_not_yet_valid());
        Ok(())
    }

    #[tokio::test]
    async fn issuer_and_audience_must_match() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let mut foreign = claims();
        foreign["iss"] = json!("https://sso.example.com/realms/other");
        let err = verifier.verify(&k1.sign(&foreign)?).await.unwrap_err();
        assert!(err.is_issuer_mismatch(), "{err:?}");

        let mut misaddressed = claims();
        misaddressed["aud"] = json!(["broker", "realm-management"]);
        let err = verifier.verify(&k1.sign(&misaddressed)?).await.unwrap_err();
        assert!(err.is_audience_mismatch(), "{err:?}");

        let mut unaddressed = claims();
        if let Some(members) = unaddressed.as_object_mut() {
            members.remove("aud");
        }
        let err = verifier.verify(&k1.sign(&unaddressed)?).await.unwrap_err();
        assert!(err.is_audience_mismatch(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn audience_may_be_one_of_many() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let mut claims = claims();
        claims["aud"] = json!(["broker", AUDIENCE]);
        let verified = verifier.verify(&k1.sign(&claims)?).await?;
        assert_eq!(verified.aud().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn verify_with_uses_given_issuer_and_audience() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        let (verifier, _) = verifier(&provider, &config());

        let mut claims = claims();
        claims["iss"] = json!("https://sso.example.com/realms/other");
        claims["aud"] = json!("billing");
        let token = k1.sign(&claims)?;

        let verified = verifier
            .verify_with(
                &token,
                IssuerRef::from_str("https://sso.example.com/realms/other"),
                AudienceRef::from_str("billing"),
            )
            .await?;
        assert_eq!(verified.sub(), Some("f8a3c2d1"));

        let err = verifier
            .verify_with(
                &token,
                IssuerRef::from_str("https://sso.example.com/realms/other"),
                AudienceRef::from_str(AUDIENCE),
            )
            .await
            .unwrap_err();
        assert!(err.is_audience_mismatch());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_verifications_share_one_fetch() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]).slow(Duration::from_millis(50));
        let (verifier, _) = verifier(&provider, &config());

        let first = k1.sign(&claims())?;
        let second = k1.sign(&claims())?;
        let (a, b) = tokio::join!(verifier.verify(&first), verifier.verify(&second));
        let (a, b) = (a?, b?);
        assert_eq!(a.sub(), b.sub());

        assert_eq!(provider.fetches(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unavailable_provider_is_key_fetch_error() -> Result<()> {
        let k1 = TestSigner::k1()?;
        let provider = Provider::publishing([&k1]);
        if let Ok(mut jwks) = provider.jwks.lock() {
            *jwks = json!({ "not": "a key set" });
        }
        let (verifier, _) = verifier(&provider, &config());

        let err = verifier.verify(&k1.sign(&claims())?).await.unwrap_err();
        assert!(err.is_key_fetch(), "{err:?}");
        Ok(())
    }
}
