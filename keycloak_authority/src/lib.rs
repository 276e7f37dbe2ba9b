//! Verification of bearer tokens issued by a Keycloak realm
//!
//! A [`TokenVerifier`] checks a compact JWT against the signing keys the
//! realm publishes. Keys are held by a [`KeySetCache`], which fetches them
//! through a [`KeySource`] when the cached set has aged past its
//! time-to-live, and once more when a token names a key the cached set does
//! not hold.
//!
//! ```no_run
//! use keycloak_authority::{TokenVerifier, VerifierConfig};
//! use keycloak_jose::JwtRef;
//!
//! # async fn check(bearer: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = VerifierConfig::for_realm("https://sso.example.com", "demo", "account");
//! let verifier = TokenVerifier::from_config(&config)?;
//!
//! let claims = verifier.verify(JwtRef::from_str(bearer)).await?;
//! println!("authenticated {}", claims.sub().unwrap_or("<anonymous>"));
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
//!
//! When using this crate and the `reqwest` feature to fetch keys from the
//! realm, this crate does not automatically enable TLS support in `reqwest`
//! itself. If your application already uses `reqwest` with some TLS
//! settings (native/OpenSSL/rustls), then this crate will use those settings
//! automatically. However, if the only reason you are using `reqwest` is
//! transitively through this crate, you may need to enable the `default-tls`
//! or `rustls-tls` feature to enable support for calling out to an HTTPS
//! endpoint.
//!
//! Without the `reqwest` feature, keys must be provided through a custom
//! [`KeySource`] or a [`StaticKeySource`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod cache;
mod config;
#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub mod discovery;
pub mod error;
pub mod source;
mod verifier;

pub use cache::{KeySetCache, StaleKeyPolicy};
pub use config::VerifierConfig;
pub use error::{KeyFetchError, VerifyError};
#[cfg(feature = "reqwest")]
pub use source::RemoteKeySource;
pub use source::{KeySource, StaticKeySource};
pub use verifier::TokenVerifier;
