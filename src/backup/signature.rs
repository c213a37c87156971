//! Backup signatures
//!
//! A backup is signed with the SHA-256 of its canonical JSON: the payload is
//! turned into a `serde_json::Value`, every object has its keys sorted, and
//! the result is written compactly. The digest is lowercase hex.
//!
//! Verification works on the raw parsed document with the `signature` key
//! removed, so a backup written by another tool with a different key order
//! still verifies.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{LedgerError, LedgerResult};

/// Key holding the digest in a signed document
pub const SIGNATURE_KEY: &str = "signature";

/// Digest of `payload` as 64 lowercase hex characters
pub fn sign<T: Serialize>(payload: &T) -> LedgerResult<String> {
    let value = serde_json::to_value(payload)?;
    Ok(digest(&value))
}

/// Whether `signature` is the digest of `payload`
pub fn verify<T: Serialize>(payload: &T, signature: &str) -> LedgerResult<bool> {
    Ok(sign(payload)? == signature)
}

/// Digest of an already-parsed JSON value
pub fn digest(value: &Value) -> String {
    let canonical = canonicalize(value).to_string();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Attach a signature to a payload, producing the document written to disk
pub fn sign_document<T: Serialize>(payload: &T) -> LedgerResult<Value> {
    let mut value = serde_json::to_value(payload)?;
    let signature = digest(&value);

    match value.as_object_mut() {
        Some(object) => {
            object.insert(SIGNATURE_KEY.to_string(), Value::String(signature));
            Ok(value)
        }
        None => Err(LedgerError::Json(
            "backup payload must serialize to a JSON object".into(),
        )),
    }
}

/// Check the `signature` of a parsed document against the rest of it
///
/// The caller is expected to have checked that the key is present;
/// a missing or non-string signature is reported as an integrity failure.
pub fn verify_document(document: &Value) -> LedgerResult<()> {
    let Some(object) = document.as_object() else {
        return Err(LedgerError::Integrity("backup is not a JSON object".into()));
    };

    let expected = object
        .get(SIGNATURE_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::Integrity("backup carries no signature".into()))?;

    let mut unsigned = object.clone();
    unsigned.remove(SIGNATURE_KEY);

    if digest(&Value::Object(unsigned)) == expected {
        Ok(())
    } else {
        Err(LedgerError::Integrity(
            "backup signature does not match its contents".into(),
        ))
    }
}

/// Rebuild `value` with every object's keys in sorted order
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut keys: Vec<&String> = object.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&object[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
