//! Signature chains: ordered items linked by hashes of their predecessors.
//!
//! Before item *i* is signed it receives `_chainIndex = i` and, for *i > 0*,
//! `_previousHash` = Blake3 hex of the signature data of item *i-1*. Both are
//! transient fields, so they are stripped from the signature data like the
//! signature itself.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::debug;

use crate::canonical::{create_signature_data, DocumentKind, SIGNATURE_FIELD};
use crate::crypto::{verify_canonical, Blake3Hash, Keypair};
use crate::error::{CoreError, Result};

/// Field carrying the hash of the previous link.
pub const PREVIOUS_HASH_FIELD: &str = "_previousHash";

/// Field carrying the zero-based position in the chain.
pub const CHAIN_INDEX_FIELD: &str = "_chainIndex";

/// Field carrying the time the link was stamped.
pub const TIMESTAMP_FIELD: &str = "_timestamp";

/// Blake3 hex of an item's signature data.
pub fn chain_hash(item: &Value) -> String {
    Blake3Hash::hash(create_signature_data(item, DocumentKind::Item).as_bytes()).to_hex()
}

/// Link and sign `items` in order.
///
/// Each input must be a JSON object. Existing signatures and chain fields on
/// the inputs are replaced.
pub fn build_chain(items: &[Value], private_key: &str) -> Result<Vec<Value>> {
    let keypair = Keypair::from_private_envelope(private_key)?;
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut chained: Vec<Value> = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(CoreError::Serialization(format!(
                "chain item {index} is not an object"
            )));
        };

        let mut map = map.clone();
        map.insert(CHAIN_INDEX_FIELD.into(), Value::from(index as u64));
        map.insert(TIMESTAMP_FIELD.into(), Value::String(timestamp.clone()));
        match chained.last() {
            Some(prev) => {
                map.insert(PREVIOUS_HASH_FIELD.into(), Value::String(chain_hash(prev)));
            }
            None => {
                map.remove(PREVIOUS_HASH_FIELD);
            }
        }

        let mut value = Value::Object(map);
        let data = create_signature_data(&value, DocumentKind::Item);
        let signature = keypair.sign(data.as_bytes()).to_envelope();
        if let Value::Object(map) = &mut value {
            map.insert(SIGNATURE_FIELD.into(), Value::String(signature));
        }
        chained.push(value);
    }

    debug!(length = chained.len(), "built signature chain");
    Ok(chained)
}

/// Why a chain failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainBreak {
    /// `_chainIndex` missing or not equal to the item's position.
    IndexMismatch { expected: usize, found: Option<u64> },
    /// `_previousHash` missing or not equal to the predecessor's hash.
    HashMismatch { expected: String, found: Option<String> },
    /// The item has no signature.
    MissingSignature,
    /// The signature does not verify under the given key.
    InvalidSignature,
}

/// Outcome of [`verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    pub valid: bool,
    pub length: usize,
    /// Position of the first broken link.
    pub broken_at: Option<usize>,
    pub reason: Option<ChainBreak>,
}

impl ChainVerification {
    fn ok(length: usize) -> Self {
        Self {
            valid: true,
            length,
            broken_at: None,
            reason: None,
        }
    }

    fn broken(length: usize, at: usize, reason: ChainBreak) -> Self {
        Self {
            valid: false,
            length,
            broken_at: Some(at),
            reason: Some(reason),
        }
    }
}

/// Replay the chain hashing and verify every signature with `public_key`.
///
/// Stops at the first broken link. Never errors: malformed keys and
/// signatures surface as [`ChainBreak::InvalidSignature`].
pub fn verify_chain(items: &[Value], public_key: &str) -> ChainVerification {
    let length = items.len();

    for (index, item) in items.iter().enumerate() {
        let found_index = item.get(CHAIN_INDEX_FIELD).and_then(Value::as_u64);
        if found_index != Some(index as u64) {
            return ChainVerification::broken(
                length,
                index,
                ChainBreak::IndexMismatch {
                    expected: index,
                    found: found_index,
                },
            );
        }

        if index > 0 {
            let expected = chain_hash(&items[index - 1]);
            let found = item
                .get(PREVIOUS_HASH_FIELD)
                .and_then(Value::as_str)
                .map(str::to_string);
            if found.as_deref() != Some(expected.as_str()) {
                return ChainVerification::broken(
                    length,
                    index,
                    ChainBreak::HashMismatch { expected, found },
                );
            }
        }

        let Some(signature) = item.get(SIGNATURE_FIELD).and_then(Value::as_str) else {
            return ChainVerification::broken(length, index, ChainBreak::MissingSignature);
        };
        let data = create_signature_data(item, DocumentKind::Item);
        if !verify_canonical(&data, signature, public_key) {
            return ChainVerification::broken(length, index, ChainBreak::InvalidSignature);
        }
    }

    ChainVerification::ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items() -> Vec<Value> {
        (0..4)
            .map(|i| json!({"id": format!("https://example.com/posts/{i}"), "title": format!("Post {i}")}))
            .collect()
    }

    #[test]
    fn test_build_and_verify() {
        let kp = Keypair::from_seed(&[0x42; 32]);
        let chain = build_chain(&items(), &kp.private_envelope()).unwrap();

        assert_eq!(chain.len(), 4);
        assert!(chain[0].get(PREVIOUS_HASH_FIELD).is_none());
        assert_eq!(chain[2][CHAIN_INDEX_FIELD], json!(2));
        assert_eq!(chain[1][PREVIOUS_HASH_FIELD], json!(chain_hash(&chain[0])));

        let result = verify_chain(&chain, &kp.public_key().to_envelope());
        assert!(result.valid);
        assert_eq!(result.length, 4);
        assert!(result.broken_at.is_none());
    }

    #[test]
    fn test_empty_chain_is_valid() {
        let kp = Keypair::from_seed(&[1; 32]);
        let chain = build_chain(&[], &kp.private_envelope()).unwrap();
        assert!(verify_chain(&chain, &kp.public_key().to_envelope()).valid);
    }

    #[test]
    fn test_tampered_predecessor_breaks_next_link() {
        let kp = Keypair::from_seed(&[0x42; 32]);
        let mut chain = build_chain(&items(), &kp.private_envelope()).unwrap();
        chain[1]["title"] = json!("edited");

        let result = verify_chain(&chain, &kp.public_key().to_envelope());
        assert!(!result.valid);
        // Item 1 is checked before its successor: its own signature fails first
        assert_eq!(result.broken_at, Some(1));
        assert_eq!(result.reason, Some(ChainBreak::InvalidSignature));
    }

    #[test]
    fn test_reordered_chain_detected() {
        let kp = Keypair::from_seed(&[0x42; 32]);
        let mut chain = build_chain(&items(), &kp.private_envelope()).unwrap();
        chain.swap(1, 2);

        let result = verify_chain(&chain, &kp.public_key().to_envelope());
        assert_eq!(result.broken_at, Some(1));
        assert!(matches!(
            result.reason,
            Some(ChainBreak::IndexMismatch { expected: 1, found: Some(2) })
        ));
    }

    #[test]
    fn test_forged_previous_hash_detected() {
        let kp = Keypair::from_seed(&[0x42; 32]);
        let mut chain = build_chain(&items(), &kp.private_envelope()).unwrap();
        chain[3][PREVIOUS_HASH_FIELD] = json!("00");

        let result = verify_chain(&chain, &kp.public_key().to_envelope());
        assert_eq!(result.broken_at, Some(3));
        assert!(matches!(result.reason, Some(ChainBreak::HashMismatch { .. })));
    }

    #[test]
    fn test_wrong_key_detected() {
        let kp = Keypair::from_seed(&[0x42; 32]);
        let other = Keypair::from_seed(&[0x43; 32]);
        let chain = build_chain(&items(), &kp.private_envelope()).unwrap();

        let result = verify_chain(&chain, &other.public_key().to_envelope());
        assert_eq!(result.broken_at, Some(0));
        assert_eq!(result.reason, Some(ChainBreak::InvalidSignature));
    }

    #[test]
    fn test_missing_signature_detected() {
        let kp = Keypair::from_seed(&[0x42; 32]);
        let mut chain = build_chain(&items(), &kp.private_envelope()).unwrap();
        chain[2].as_object_mut().unwrap().remove(SIGNATURE_FIELD);

        let result = verify_chain(&chain, &kp.public_key().to_envelope());
        assert_eq!(result.broken_at, Some(2));
        assert_eq!(result.reason, Some(ChainBreak::MissingSignature));
    }

    #[test]
    fn test_non_object_rejected() {
        let kp = Keypair::from_seed(&[0x42; 32]);
        let err = build_chain(&[json!(1)], &kp.private_envelope()).unwrap_err();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
