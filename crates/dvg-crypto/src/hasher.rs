use dvg_types::digest::DIGEST_LEN;
use dvg_types::Digest;
use serde_json::Value;
use sha1::{Digest as _, Sha1};

use crate::canonical::canonical_text;

/// Key-order independent SHA-1 hasher for JSON values.
///
/// Strings, numbers and booleans hash their canonical text; `null` and
/// containers hash their key-sorted JSON. The empty string hashes as `""`.
/// An absent value hashes to [`Digest::EMPTY`], which keeps "field missing"
/// distinct from "field present but falsy".
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentHasher;

impl ContentHasher {
    /// Hash a value that may be absent.
    pub fn hash(value: Option<&Value>) -> Digest {
        match value {
            Some(v) => Self::hash_value(v),
            None => Digest::EMPTY,
        }
    }

    /// Hash a present value.
    pub fn hash_value(value: &Value) -> Digest {
        Self::hash_bytes(canonical_text(value).as_bytes())
    }

    /// Hash any serializable value through its JSON form.
    pub fn hash_json<T: serde::Serialize>(value: &T) -> HasherResult<Digest> {
        let value =
            serde_json::to_value(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(Self::hash_value(&value))
    }

    /// Raw SHA-1 of a byte string.
    pub fn hash_bytes(data: &[u8]) -> Digest {
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&Sha1::digest(data));
        Digest::from_hash(out)
    }

    /// Verify that a value hashes to the expected hex digest.
    pub fn verify(value: Option<&Value>, expected: &str) -> bool {
        Self::hash(value).matches_hex(expected)
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type HasherResult<T> = Result<T, HasherError>;
