//! Verification primitives for the JOSE tokens issued by Keycloak
//!
//! This crate covers the parts of the JOSE standards needed to check a
//! bearer token against the keys an identity provider publishes:
//!
//! * JSON Web Signature (JWS): [RFC7515][]
//! * JSON Web Key (JWK): [RFC7517][]
//! * JSON Web Algorithms (JWA): [RFC7518][]
//! * JSON Web Token (JWT): [RFC7519][]
//!
//! Only verification is offered. Minting tokens is limited to the
//! `test-util` feature, which exists so that dependent crates can test
//! against tokens signed by known keys.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7517]: https://tools.ietf.org/html/rfc7517
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```
//! use keycloak_jose::{clock::UnixTime, jwt, Jwks, JwtRef, KeySet};
//!
//! let jwks: Jwks = serde_json::from_str(r#"{
//!     "keys": [{ "kid": "shared", "kty": "oct", "alg": "HS256", "k": "c2VjcmV0" }]
//! }"#).unwrap();
//! let keys = KeySet::new(jwks, UnixTime(0));
//!
//! let token = JwtRef::from_str(concat!(
//!     "eyJhbGciOiJIUzI1NiIsImtpZCI6InNoYXJlZCJ9.",
//!     "eyJpc3MiOiJodHRwczovL3Nzby5leGFtcGxlLmNvbS9yZWFsbXMvZGVtbyIsImF1ZCI6",
//!     "ImFjY291bnQiLCJleHAiOjQxMDI0NDQ4MDB9.",
//!     "BZtWEnZHbX6LQWUl5qAF8ZVwkj35XrGHtA8HEhR8gSk"
//! ));
//!
//! let validator = jwt::Validator::default()
//!     .require_issuer(jwt::Issuer::from_static("https://sso.example.com/realms/demo"))
//!     .add_allowed_audience(jwt::Audience::from_static("account"));
//!
//! let decomposed = token.decompose().unwrap();
//! let alg = validator.check_algorithm(decomposed.untrusted_header()).unwrap();
//! let key = keys.get(decomposed.untrusted_header().kid().unwrap()).unwrap();
//!
//! let claims = decomposed
//!     .verify(key, alg, &validator, &keycloak_jose::clock::System)
//!     .unwrap();
//! assert_eq!(claims.aud()[0].as_str(), "account");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod clock;
pub mod error;
pub mod jwa;
pub mod jwk;
mod jwks;
pub mod jws;
pub mod jwt;

#[cfg(feature = "test-util")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod testing;

#[doc(inline)]
pub use jwk::SigningKey;
#[doc(inline)]
pub use jwks::{Jwks, KeySet};
#[doc(inline)]
pub use jwt::{Claims, Jwt, JwtRef};
