//! Canonical JSON encoding for deterministic hashing and signing.
//!
//! Every event is hashed and signed over its canonical bytes, so two parties
//! must produce identical output for identical logical content:
//! - Object keys sorted by their UTF-8 bytes, recursively
//! - No whitespace between tokens
//! - Strings escaped the way `serde_json` escapes them
//! - Integers only (no floats; there is no portable canonical float form)

use serde::Serialize;
use serde_json::Value;

use crate::error::{CoreError, Result};

/// Encode any serializable value to canonical JSON bytes.
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let tree = serde_json::to_value(value).map_err(|e| CoreError::Encoding(e.to_string()))?;
    canonicalize_value(&tree)
}

/// Encode an already-built JSON tree to canonical bytes.
pub fn canonicalize_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Bool(true) => buf.extend_from_slice(b"true"),
        Value::Bool(false) => buf.extend_from_slice(b"false"),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                buf.extend_from_slice(i.to_string().as_bytes());
            } else if let Some(u) = n.as_u64() {
                buf.extend_from_slice(u.to_string().as_bytes());
            } else {
                return Err(CoreError::Encoding(format!(
                    "non-integral number {} has no canonical form",
                    n
                )));
            }
        }
        Value::String(s) => encode_string(buf, s)?,
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_value_to(buf, item)?;
            }
            buf.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            buf.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_string(buf, key)?;
                buf.push(b':');
                encode_value_to(buf, item)?;
            }
            buf.push(b'}');
        }
    }
    Ok(())
}

/// Encode a JSON string literal, quotes included.
fn encode_string(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    serde_json::to_writer(&mut *buf, s).map_err(|e| CoreError::Encoding(e.to_string()))
}
