//! Golden test vectors for deterministic verification.
//!
//! Any implementation of the protocol must produce the same canonical text
//! and, Ed25519 being deterministic, the same signature for each vector.

use feedseal_core::{create_signature_data, DocumentKind, Keypair};
use serde_json::Value;

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for deterministic key generation.
    pub seed: [u8; 32],
    pub kind: DocumentKind,
    /// Input document, as JSON text in arbitrary key order.
    pub document: &'static str,
    /// Expected signature data.
    pub canonical: &'static str,
    pub public_key: &'static str,
    pub signature: &'static str,
}

impl GoldenVector {
    pub fn keypair(&self) -> Keypair {
        Keypair::from_seed(&self.seed)
    }

    pub fn document_value(&self) -> Value {
        serde_json::from_str(self.document).unwrap_or(Value::Null)
    }

    /// Signature data as computed by this implementation.
    pub fn compute_canonical(&self) -> String {
        create_signature_data(&self.document_value(), self.kind)
    }

    /// Signature envelope as computed by this implementation.
    pub fn compute_signature(&self) -> String {
        self.keypair()
            .sign(self.compute_canonical().as_bytes())
            .to_envelope()
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "nested object",
            seed: [0x42; 32],
            kind: DocumentKind::Item,
            document: r#"{"b": 1, "a": {"d": [3, 2, 1], "c": "x"}}"#,
            canonical: r#"{"a":{"c":"x","d":[3,2,1]},"b":1}"#,
            public_key: "ed25519:IVL40Zt5HSRFMkLhXy6rbLfP+ntqXtMAl5YOBpiB2xI=",
            signature: "ed25519:6XxNgSQUmuLRondjzoSJhTyfsjEF1YQ8Gj3Db3fTzQY6aO2N4zqDgx2ihA64o2Dx9e4y5XECNwGYljtLdvGQCw==",
        },
        GoldenVector {
            name: "item with signature and chain fields",
            seed: [0x42; 32],
            kind: DocumentKind::Item,
            document: r#"{"id": "https://ada.example/1", "url": "https://ada.example/1", "content_text": "hello", "date_published": "2024-01-01T00:00:00Z", "signature": "ed25519:AAAA", "_chainIndex": 0, "_mood": "calm"}"#,
            canonical: r#"{"_mood":"calm","content_text":"hello","date_published":"2024-01-01T00:00:00Z","id":"https://ada.example/1","url":"https://ada.example/1"}"#,
            public_key: "ed25519:IVL40Zt5HSRFMkLhXy6rbLfP+ntqXtMAl5YOBpiB2xI=",
            signature: "ed25519:WsomzYDN9P+Yg3mKmPUO9LnpABpa4nLFldUfCtln28JnvA7B9v46XvSLZywksgdiGdFzpIOfFa0pX5D/xQS/Cw==",
        },
        GoldenVector {
            name: "unicode strings",
            seed: [0x07; 32],
            kind: DocumentKind::Feed,
            document: r#"{"title": "café ☕", "z": null, "a": true}"#,
            canonical: r#"{"a":true,"title":"café ☕","z":null}"#,
            public_key: "ed25519:6kpsY+KcUgq+9VB7Ey7F+ZVHdq6+vnuSQh7qaRRG0iw=",
            signature: "ed25519:yRLGU2QVjFKedxAW27+fn7jMxdbLlQJR91mHJp6s1HLQ5eVKBX9sSCvC1BzJD8nP0NQ4sXJt/cqUl9JFO03bDQ==",
        },
        GoldenVector {
            name: "empty object",
            seed: [0x00; 32],
            kind: DocumentKind::Feed,
            document: "{}",
            canonical: "{}",
            public_key: "ed25519:O2onvM62pC1io6jQKm8Nc2UyFXcd4kOmOsBIoYtZ2ik=",
            signature: "ed25519:tKXJTrpxiFnz7slgFYI1sH9tRbIOsmRcvYcYh6/FNvdn9eQK63t+Nv72W9zUAPb0b2JZT2Dsu0kiuUCY+8X2CA==",
        },
    ]
}

/// Check every vector against this implementation.
///
/// Returns `(name, matches, computed_signature)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let signature = v.compute_signature();
            let matches = v.compute_canonical() == v.canonical
                && v.keypair().public_key().to_envelope() == v.public_key
                && signature == v.signature;
            (v.name.to_string(), matches, signature)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_are_deterministic() {
        for vector in all_vectors() {
            assert_eq!(
                vector.compute_signature(),
                vector.compute_signature(),
                "vector '{}' signed differently on regeneration",
                vector.name
            );
        }
    }

    #[test]
    fn test_documents_parse() {
        for vector in all_vectors() {
            assert!(vector.document_value().is_object(), "{}", vector.name);
        }
    }

    #[test]
    fn test_different_seeds_different_signatures() {
        let vectors = all_vectors();
        let a = &vectors[3];
        let mut b = a.clone();
        b.seed = [0x01; 32];
        assert_eq!(a.compute_canonical(), b.compute_canonical());
        assert_ne!(a.compute_signature(), b.compute_signature());
    }
}
