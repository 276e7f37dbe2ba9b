use std::time::Duration;

use clap::Parser;
use keycloak_authority::{discovery, StaleKeyPolicy, TokenVerifier, VerifierConfig};
use keycloak_jose::{jwt, Jwt};

#[derive(Debug, Parser)]
#[command(about = "Verifies a bearer token issued by a Keycloak realm")]
struct Opts {
    /// Base URL of the Keycloak server
    #[arg(long, env = "KEYCLOAK_SERVER_URL")]
    server_url: String,

    /// The realm issuing the tokens
    #[arg(long, env = "KEYCLOAK_REALM")]
    realm: String,

    /// The client the tokens must be addressed to
    #[arg(long, env = "KEYCLOAK_CLIENT_ID")]
    client_id: String,

    /// Read the issuer and JWKS location from the realm's metadata
    #[arg(long)]
    discover: bool,

    /// Tolerated clock skew, in seconds
    #[arg(long, env = "KEYCLOAK_LEEWAY_SECS", default_value_t = 0)]
    leeway_secs: u64,

    /// Reject tokens when the keys cannot be refreshed, even if older keys are held
    #[arg(long)]
    fail_on_stale_keys: bool,

    /// The bearer token to verify
    #[arg(env = "KEYCLOAK_TOKEN", hide_env_values = true)]
    token: Jwt,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let mut config = VerifierConfig::for_realm(&opts.server_url, &opts.realm, &opts.client_id)
        .with_leeway(Duration::from_secs(opts.leeway_secs));

    if opts.fail_on_stale_keys {
        config = config.with_stale_policy(StaleKeyPolicy::Fail);
    }

    if opts.discover {
        let realm_url = config.issuer.to_string();
        let metadata = discovery::discover(&realm_url).await?;
        tracing::info!(
            issuer = %metadata.issuer,
            jwks_uri = %metadata.jwks_uri,
            "realm discovered"
        );
        config.issuer = metadata.issuer;
        config.jwks_url = metadata.jwks_uri;
    }

    let verifier = TokenVerifier::from_config(&config)?;

    match verifier.verify(&opts.token).await {
        Ok(claims) => {
            let audiences: Vec<&str> = claims
                .aud()
                .into_iter()
                .map(jwt::AudienceRef::as_str)
                .collect();
            tracing::info!(
                sub = claims.sub(),
                aud = ?audiences,
                exp = claims.exp().map(|t| t.0),
                "token verified"
            );
            println!("{}", serde_json::to_string_pretty(claims.as_map())?);
        }
        Err(err) => {
            tracing::error!(error = %err, "token rejected");
            return Err(err.into());
        }
    }

    Ok(())
}
