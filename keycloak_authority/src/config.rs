//! Verifier settings

use std::time::Duration;

use keycloak_jose::{
    jwa::Algorithm,
    jwt::{Audience, Issuer, Validator},
};
use serde::{Deserialize, Serialize};

use crate::cache::StaleKeyPolicy;

/// Everything needed to verify the tokens of one Keycloak client
///
/// Deserializable from any `serde` format. Only `issuer`, `audience` and
/// `jwks_url` are required:
///
/// ```
/// # use keycloak_authority::VerifierConfig;
/// let config: VerifierConfig = serde_json::from_str(r#"{
///     "issuer": "https://sso.example.com/realms/demo",
///     "audience": "account",
///     "jwks_url": "https://sso.example.com/realms/demo/protocol/openid-connect/certs",
///     "leeway_secs": 30
/// }"#).unwrap();
///
/// assert_eq!(config.cache_ttl().as_secs(), 86_400);
/// assert_eq!(config.leeway().as_secs(), 30);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifierConfig {
    /// The `iss` every token must carry
    pub issuer: Issuer,

    /// The audience every token must be addressed to
    pub audience: Audience,

    /// Where the provider publishes its signing keys
    pub jwks_url: String,

    /// Seconds a fetched key set is used before it is fetched again
    #[serde(default = "defaults::cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Seconds a single key fetch may take
    #[serde(default = "defaults::fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Minimum seconds between refreshes forced by unknown keys
    #[serde(default = "defaults::refresh_cooldown_secs")]
    pub refresh_cooldown_secs: u64,

    /// Clock skew tolerated when checking `exp` and `nbf`
    #[serde(default)]
    pub leeway_secs: u64,

    /// Whether to reject tokens whose `nbf` lies in the future
    #[serde(default)]
    pub check_not_before: bool,

    /// Behavior when refreshing the keys fails
    #[serde(default)]
    pub stale_policy: StaleKeyPolicy,

    /// Algorithms tokens may be signed with; an empty list refuses every token
    #[serde(default = "defaults::algorithms")]
    pub algorithms: Vec<Algorithm>,
}

mod defaults {
    use keycloak_jose::jwa::Algorithm;

    pub(super) fn cache_ttl_secs() -> u64 {
        crate::cache::DEFAULT_TTL.as_secs()
    }

    pub(super) fn fetch_timeout_secs() -> u64 {
        crate::cache::DEFAULT_FETCH_TIMEOUT.as_secs()
    }

    pub(super) fn refresh_cooldown_secs() -> u64 {
        crate::cache::DEFAULT_REFRESH_COOLDOWN.as_secs()
    }

    pub(super) fn algorithms() -> Vec<Algorithm> {
        Algorithm::SUPPORTED.to_vec()
    }
}

impl VerifierConfig {
    /// Settings with defaults for everything but the required values
    pub fn new(issuer: Issuer, audience: Audience, jwks_url: impl Into<String>) -> Self {
        Self {
            issuer,
            audience,
            jwks_url: jwks_url.into(),
            cache_ttl_secs: defaults::cache_ttl_secs(),
            fetch_timeout_secs: defaults::fetch_timeout_secs(),
            refresh_cooldown_secs: defaults::refresh_cooldown_secs(),
            leeway_secs: 0,
            check_not_before: false,
            stale_policy: StaleKeyPolicy::default(),
            algorithms: defaults::algorithms(),
        }
    }

    /// Settings for a Keycloak realm, using the standard endpoint layout
    ///
    /// The issuer is `{server_url}/realms/{realm}` and the keys are read
    /// from the realm's `protocol/openid-connect/certs` endpoint. Tokens
    /// must be addressed to `client_id`.
    pub fn for_realm(server_url: &str, realm: &str, client_id: &str) -> Self {
        let issuer = format!("{}/realms/{realm}", server_url.trim_end_matches('/'));
        let jwks_url = format!("{issuer}/protocol/openid-connect/certs");

        Self::new(Issuer::new(issuer), Audience::from(client_id), jwks_url)
    }

    /// Sets the time-to-live of cached key sets
    pub fn with_cache_ttl(self, ttl: Duration) -> Self {
        Self {
            cache_ttl_secs: ttl.as_secs(),
            ..self
        }
    }

    /// Sets the timeout of a single key fetch
    pub fn with_fetch_timeout(self, timeout: Duration) -> Self {
        Self {
            fetch_timeout_secs: timeout.as_secs(),
            ..self
        }
    }

    /// Sets the minimum interval between forced refreshes
    pub fn with_refresh_cooldown(self, cooldown: Duration) -> Self {
        Self {
            refresh_cooldown_secs: cooldown.as_secs(),
            ..self
        }
    }

    /// Sets the clock skew tolerance
    pub fn with_leeway(self, leeway: Duration) -> Self {
        Self {
            leeway_secs: leeway.as_secs(),
            ..self
        }
    }

    /// Rejects tokens whose `nbf` lies in the future
    pub fn check_not_before(self) -> Self {
        Self {
            check_not_before: true,
            ..self
        }
    }

    /// Sets the behavior when refreshing the keys fails
    pub fn with_stale_policy(self, stale_policy: StaleKeyPolicy) -> Self {
        Self {
            stale_policy,
            ..self
        }
    }

    /// Restricts the algorithms tokens may be signed with
    ///
    /// An empty list approves nothing, so every token is refused.
    pub fn with_algorithms(self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        Self {
            algorithms: algorithms.into_iter().collect(),
            ..self
        }
    }

    /// Time-to-live of cached key sets
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Timeout of a single key fetch
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Minimum interval between forced refreshes
    #[must_use]
    pub fn refresh_cooldown(&self) -> Duration {
        Duration::from_secs(self.refresh_cooldown_secs)
    }

    /// Clock skew tolerance
    #[must_use]
    pub fn leeway(&self) -> Duration {
        Duration::from_secs(self.leeway_secs)
    }

    /// The validator enforcing these settings for `issuer` and `audience`
    pub(crate) fn validator(&self, issuer: Issuer, audience: Audience) -> Validator {
        let validator = Validator::default()
            .with_leeway_secs(self.leeway_secs)
            .extend_approved_algorithms(self.algorithms.iter().copied())
            .require_issuer(issuer)
            .require_audience(audience);

        if self.check_not_before {
            validator.check_not_before()
        } else {
            validator
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    #[test]
    fn realm_layout() {
        let config = VerifierConfig::for_realm("https://sso.example.com/", "demo", "account");

        assert_eq!(config.issuer.as_str(), "https://sso.example.com/realms/demo");
        assert_eq!(config.audience.as_str(), "account");
        assert_eq!(
            config.jwks_url,
            "https://sso.example.com/realms/demo/protocol/openid-connect/certs"
        );
    }

    #[test]
    fn defaults_apply_when_omitted() -> Result<()> {
        let config: VerifierConfig = serde_json::from_str(
            r#"{
                "issuer": "https://sso.example.com/realms/demo",
                "audience": "account",
                "jwks_url": "https://sso.example.com/certs"
            }"#,
        )?;

        assert_eq!(
            config,
            VerifierConfig::new(
                Issuer::from_static("https://sso.example.com/realms/demo"),
                Audience::from_static("account"),
                "https://sso.example.com/certs",
            )
        );
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.refresh_cooldown(), Duration::from_secs(10));
        assert_eq!(config.leeway(), Duration::ZERO);
        assert_eq!(config.stale_policy, StaleKeyPolicy::ServeStale);
        assert_eq!(config.algorithms, Algorithm::SUPPORTED);
        Ok(())
    }

    #[test]
    fn overrides_are_read() -> Result<()> {
        let config: VerifierConfig = serde_json::from_str(
            r#"{
                "issuer": "https://sso.example.com/realms/demo",
                "audience": "account",
                "jwks_url": "https://sso.example.com/certs",
                "cache_ttl_secs": 300,
                "stale_policy": "fail",
                "algorithms": ["RS256", "PS256"]
            }"#,
        )?;

        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.stale_policy, StaleKeyPolicy::Fail);
        assert_eq!(config.algorithms, [Algorithm::RS256, Algorithm::PS256]);
        Ok(())
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let result = serde_json::from_str::<VerifierConfig>(
            r#"{
                "issuer": "https://sso.example.com/realms/demo",
                "audience": "account",
                "jwks_url": "https://sso.example.com/certs",
                "algorithms": ["none"]
            }"#,
        );

        assert!(result.is_err());
    }
}
