//! Deterministic content hashing for mappings and mapping sequences.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha384};

use crate::errors::{ErrorInfo, LabError};
use crate::serde::to_canonical_json_bytes;

/// Computes a stable SHA-384 hex digest of a serializable value.
///
/// Object keys are sorted recursively before hashing, so two mappings that
/// differ only in key insertion order produce the same digest. A sequence of
/// mappings hashes the concatenation of each element's canonical
/// serialization. The optional `salt` is folded into the digest first.
pub fn dict_hash<T: Serialize>(value: &T, salt: Option<&str>) -> Result<String, LabError> {
    let mut digest = Sha384::new();
    if let Some(salt) = salt {
        digest.update(salt.as_bytes());
    }
    let value = serde_json::to_value(value)
        .map_err(|err| LabError::Serde(ErrorInfo::new("hash_encode", err.to_string())))?;
    match value {
        Value::Array(items) => {
            for item in items {
                digest.update(to_canonical_json_bytes(&item)?);
            }
        }
        other => digest.update(to_canonical_json_bytes(&other)?),
    }
    Ok(format!("{:x}", digest.finalize()))
}
