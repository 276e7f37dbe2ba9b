//! JSON Web Key Sets (JWKS) and the key sets built from them

use std::collections::{hash_map::Entry, HashMap};

use serde::Deserialize;

use crate::{
    clock::UnixTime,
    jwk::{self, SigningKey},
};

/// A JSON Web Key Set (JWKS) as published by the provider
///
/// Keys that cannot be used for verifying signatures are dropped while the
/// document is parsed, with a warning. A provider publishing an encryption
/// key or an algorithm this crate does not know still yields the rest of
/// its keys.
///
/// A document without a `keys` member is rejected rather than read as an
/// empty set, so a misrouted response surfaces as a decode failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Jwks {
    #[serde(deserialize_with = "deserialize_keys")]
    keys: Vec<SigningKey>,
}

impl Jwks {
    /// Adds a key to the set
    pub fn add_key(&mut self, key: SigningKey) {
        self.keys.push(key);
    }

    /// A view of the keys in this set
    #[must_use]
    pub fn keys(&self) -> &[SigningKey] {
        &self.keys
    }
}

impl FromIterator<SigningKey> for Jwks {
    fn from_iter<T: IntoIterator<Item = SigningKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// An immutable snapshot of signing keys indexed by key ID
///
/// A key set is never updated in place. A refresh builds a new one and
/// replaces the old snapshot as a whole.
#[derive(Clone, Debug)]
pub struct KeySet {
    keys: HashMap<jwk::KeyId, SigningKey>,
    fetched_at: UnixTime,
}

impl KeySet {
    /// Indexes the keys of a JWKS by key ID
    ///
    /// When several keys share a key ID, the first one wins.
    #[must_use]
    pub fn new(jwks: Jwks, fetched_at: UnixTime) -> Self {
        let mut keys = HashMap::with_capacity(jwks.keys.len());

        for key in jwks.keys {
            match keys.entry(key.key_id().to_owned()) {
                Entry::Vacant(slot) => {
                    slot.insert(key);
                }
                Entry::Occupied(existing) => {
                    tracing::warn!(
                        jwk.kid = %existing.key(),
                        "ignoring JWK with duplicate key ID"
                    );
                }
            }
        }

        Self { keys, fetched_at }
    }

    /// The key with the given ID
    #[must_use]
    pub fn get(&self, kid: &jwk::KeyIdRef) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    /// When the underlying JWKS was retrieved
    #[must_use]
    pub fn fetched_at(&self) -> UnixTime {
        self.fetched_at
    }

    /// Number of keys in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The IDs of all keys in the set, in no particular order
    pub fn key_ids(&self) -> impl Iterator<Item = &jwk::KeyIdRef> {
        self.keys.keys().map(|k| &**k)
    }
}

fn deserialize_keys<'de, D>(deserializer: D) -> Result<Vec<SigningKey>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct MaybeJwksVisitor;

    impl<'de> serde::de::Visitor<'de> for MaybeJwksVisitor {
        type Value = Vec<SigningKey>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a list of JWK objects")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            let mut values = Vec::with_capacity(seq.size_hint().unwrap_or_default());
            let mut index = 0_usize;

            while let Some(value) = seq.next_element()? {
                match value {
                    MaybeJwk::Jwk(jwk) => values.push(jwk),
                    MaybeJwk::Unknown(key) => {
                        tracing::warn!(
                            jwks.idx = index,
                            jwk.kid = ?key.kid,
                            jwk.kty = ?key.kty,
                            "jwk.use" = ?key.r#use,
                            jwk.alg = ?key.alg,
                            "ignoring JWK not usable for signature verification"
                        );
                    }
                }
                index += 1;
            }

            Ok(values)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MaybeJwk {
        Jwk(SigningKey),
        Unknown(JwkLike),
    }

    #[derive(Deserialize)]
    struct JwkLike {
        #[serde(default)]
        kid: Option<String>,
        #[serde(default)]
        kty: Option<String>,
        #[serde(rename = "use", default)]
        r#use: Option<String>,
        #[serde(default)]
        alg: Option<String>,
    }

    deserializer.deserialize_seq(MaybeJwksVisitor)
}
