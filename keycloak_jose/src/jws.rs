//! Signature checks for JSON Web Signature (JWS) compact tokens
//!
//! Described by [RFC7515][]. Only the verifying side is provided.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515

use std::error::Error as StdError;

/// Key material able to check a JWS signature
///
/// The signed message is the encoded header and payload joined by a `.`,
/// exactly as they appear in the token. The signature is the decoded third
/// section.
pub trait Verifier {
    /// The algorithm identifier understood by this key
    type Algorithm;

    /// Reason a signature was not accepted
    type Error: StdError + Send + Sync + 'static;

    /// Whether this key can check signatures made with `alg`
    fn can_verify(&self, alg: Self::Algorithm) -> bool;

    /// Checks `signature` over `message` under `alg`
    fn verify(
        &self,
        alg: Self::Algorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error>;
}
