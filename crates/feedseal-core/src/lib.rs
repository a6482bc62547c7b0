//! # feedseal core
//!
//! Pure primitives for signed content feeds: canonical JSON, Ed25519
//! envelopes, key rotation, signature chains and the typed document model.
//!
//! This crate does no I/O. Everything here is computation over JSON values
//! and key material.
//!
//! ## Key Types
//!
//! - [`Feed`] / [`Item`] - The typed document model
//! - [`Keypair`] / [`PublicKey`] / [`Signature`] - Ed25519 primitives
//! - [`KeyManager`] - Per-owner active keys with rotation history
//! - [`Metrics`] - Counters owned by validators and parsers
//!
//! ## Canonicalization
//!
//! Everything that is signed is first encoded with the canonical JSON rules
//! in [`canonical`]. Signature data never includes `signature` or the
//! transient chain fields.

pub mod canonical;
pub mod chain;
pub mod crypto;
pub mod document;
pub mod error;
pub mod keys;
pub mod metrics;

pub use canonical::{create_signature_data, is_canonical, to_canonical_string, DocumentKind};
pub use chain::{build_chain, chain_hash, verify_chain, ChainBreak, ChainVerification};
pub use crypto::{
    generate_key_pair, sign_canonical, sign_content, verify_canonical, verify_signature,
    Blake3Hash, EncodedKeyPair, Keypair, PublicKey, Signature,
};
pub use document::{Attachment, Author, Extensions, Feed, Interactions, Item, PROTOCOL_VERSION};
pub use error::{CoreError, Result};
pub use keys::{KeyManager, KeyMatch, KeyRecord, RetiredKey, RetirementReason};
pub use metrics::{Metrics, MetricsSnapshot};
