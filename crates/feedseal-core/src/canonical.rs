//! Canonical JSON encoding for deterministic serialization.
//!
//! Rules:
//! - Object keys sorted ascending by code point, at every depth
//! - Arrays keep element order
//! - Scalars use standard JSON encoding, except that a float with no
//!   fractional part is written as an integer (`5.0` becomes `5`)
//! - No insignificant whitespace
//!
//! The canonical encoding is what gets signed. Two documents with the same
//! key/value pairs produce identical bytes no matter how they were built, so a
//! signature survives re-encoding by any intermediary.
//!
//! Keys are sorted here explicitly rather than relying on `serde_json::Map`
//! ordering, which changes when the `preserve_order` feature is unified in.

use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::Result;

/// Field holding the enveloped signature of a feed or item.
pub const SIGNATURE_FIELD: &str = "signature";

/// Transient fields stripped before computing signature data.
///
/// `_timestamp` is stamped by chain builders; `_previousHash` and
/// `_chainIndex` carry the signature-chain link.
pub const TRANSIENT_FIELDS: [&str; 3] = ["_timestamp", "_previousHash", "_chainIndex"];

/// Integral floats below this magnitude are written in integer form.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// The kind of document being signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// A whole feed. Item signatures stay inside what the feed signature covers.
    Feed,
    /// A single content item.
    Item,
}

impl DocumentKind {
    /// Lowercase label used in logs and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Feed => "feed",
            DocumentKind::Item => "item",
        }
    }
}

/// Serialize a JSON value canonically.
pub fn serialize(value: &Value) -> String {
    let mut buf = String::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Serialize any `Serialize` value canonically.
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(serialize(&value))
}

/// Build the canonical bytes a signature covers.
///
/// Removes `signature` and the transient chain fields from the top level of
/// `doc`, then canonicalizes. Non-object values are canonicalized unchanged.
pub fn create_signature_data(doc: &Value, kind: DocumentKind) -> String {
    tracing::trace!(kind = kind.as_str(), "computing signature data");
    match doc {
        Value::Object(map) => {
            let mut stripped = map.clone();
            stripped.remove(SIGNATURE_FIELD);
            for field in TRANSIENT_FIELDS {
                stripped.remove(field);
            }
            serialize(&Value::Object(stripped))
        }
        other => serialize(other),
    }
}

/// Check whether a string is already in canonical form.
///
/// Returns false for anything that is not valid JSON.
pub fn is_canonical(s: &str) -> bool {
    match serde_json::from_str::<Value>(s) {
        Ok(value) => serialize(&value) == s,
        Err(_) => false,
    }
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut String, value: &Value) {
    match value {
        Value::Null => buf.push_str("null"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => encode_number(buf, n),
        Value::String(s) => encode_string(buf, s),
        Value::Array(arr) => {
            buf.push('[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                encode_value_to(buf, item);
            }
            buf.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            // `str` ordering is byte ordering, which for UTF-8 is code point ordering
            entries.sort_by(|a, b| a.0.cmp(b.0));

            buf.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                encode_string(buf, key);
                buf.push(':');
                encode_value_to(buf, value);
            }
            buf.push('}');
        }
    }
}

/// Integers as-is; `5.0` as `5` and `-0.0` as `0`, matching `JSON.stringify`.
fn encode_number(buf: &mut String, n: &Number) {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
            buf.push_str(&(f as i64).to_string());
        }
        _ => buf.push_str(&n.to_string()),
    }
}

/// Encode a string with standard JSON escaping.
fn encode_string(buf: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(escaped) => buf.push_str(&escaped),
        // Serializing a `str` cannot fail; keep the fallback total anyway.
        Err(_) => {
            buf.push('"');
            buf.push_str(s);
            buf.push('"');
        }
    }
}
