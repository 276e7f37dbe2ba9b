//! Base64url buffers for JOSE values
//!
//! Every segment of a compact token and most JSON Web Key members are encoded
//! with the URL-safe base64 alphabet. The JOSE specifications drop the trailing
//! `=` padding, but some producers keep it, so decoding here restores the
//! padding first (see [`fix_padding()`]) and then decodes canonically. Values
//! are always re-encoded without padding.
//!
//! ```
//! use keycloak_base64::Base64Url;
//!
//! let header = Base64Url::from_encoded("eyJhbGciOiJSUzI1NiJ9").unwrap();
//! assert_eq!(header.as_slice(), br#"{"alg":"RS256"}"#);
//! assert_eq!(header.to_string(), "eyJhbGciOiJSUzI1NiJ9");
//! ```

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
    unused_must_use
)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::{borrow::Cow, error::Error, fmt};

use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};

/// An error while decoding a value which is not properly formatted
/// base64url data
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidBase64Data {
    source: Option<base64::DecodeError>,
}

impl From<base64::DecodeError> for InvalidBase64Data {
    fn from(err: base64::DecodeError) -> Self {
        Self { source: Some(err) }
    }
}

impl fmt::Display for InvalidBase64Data {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid base64url data")
    }
}

impl Error for InvalidBase64Data {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        let source: &(dyn Error + 'static) = self.source.as_ref()?;
        Some(source)
    }
}

/// Restores the `=` padding that the JOSE encoding omits
///
/// Input that is already padded is returned as-is. A length that leaves a
/// single dangling character can never be valid base64 and is rejected.
///
/// ```
/// use keycloak_base64::fix_padding;
///
/// assert_eq!(fix_padding("YQ").unwrap(), "YQ==");
/// assert_eq!(fix_padding("YWI").unwrap(), "YWI=");
/// assert_eq!(fix_padding("YWJj").unwrap(), "YWJj");
/// assert!(fix_padding("YWJjZ").is_err());
/// ```
pub fn fix_padding(enc: &str) -> Result<Cow<'_, str>, InvalidBase64Data> {
    let unpadded = enc.trim_end_matches('=');
    match unpadded.len() % 4 {
        0 if unpadded.len() == enc.len() => Ok(Cow::Borrowed(enc)),
        0 => Ok(Cow::Borrowed(unpadded)),
        1 => Err(InvalidBase64Data { source: None }),
        rem => {
            let mut padded = String::with_capacity(unpadded.len() + 4 - rem);
            padded.push_str(unpadded);
            padded.extend(std::iter::repeat('=').take(4 - rem));
            Ok(Cow::Owned(padded))
        }
    }
}

/// Owned bytes that are represented as unpadded base64url text
///
/// Data is held in its raw form; encoding only happens when the value is
/// displayed or serialized.
#[derive(Clone, Default, Eq, PartialEq, Hash)]
#[repr(transparent)]
#[must_use]
pub struct Base64Url(Vec<u8>);

impl Base64Url {
    /// Wraps raw, already decoded bytes
    #[inline]
    pub fn from_raw(raw: impl Into<Vec<u8>>) -> Self {
        Self(raw.into())
    }

    /// Decodes base64url text, with or without padding
    ///
    /// # Errors
    ///
    /// The input contains characters outside the URL-safe alphabet, has an
    /// impossible length, or carries non-zero trailing bits.
    pub fn from_encoded(enc: impl AsRef<str>) -> Result<Self, InvalidBase64Data> {
        let padded = fix_padding(enc.as_ref())?;
        let data = URL_SAFE.decode(padded.as_bytes())?;
        Ok(Self(data))
    }

    /// The decoded bytes
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Unwraps the decoded bytes
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Number of decoded bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer holds no bytes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the unpadded encoding of this buffer
    #[inline]
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let len = self.0.len();
        (len / 3) * 4 + [0, 2, 3][len % 3]
    }
}

impl From<Vec<u8>> for Base64Url {
    #[inline]
    fn from(buf: Vec<u8>) -> Self {
        Self(buf)
    }
}

impl From<&'_ [u8]> for Base64Url {
    #[inline]
    fn from(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }
}

impl AsRef<[u8]> for Base64Url {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl fmt::Debug for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "`{}`", self)
    }
}

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl serde::Serialize for Base64Url {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl<'de> serde::Deserialize<'de> for Base64Url {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let enc: Cow<'de, str> = serde::Deserialize::deserialize(deserializer)?;
        Self::from_encoded(&*enc).map_err(serde::de::Error::custom)
    }
}
