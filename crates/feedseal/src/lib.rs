//! # feedseal
//!
//! Signed, verifiable feed documents.
//!
//! ## Overview
//!
//! - **Canonical JSON**: sorted keys at every depth, no whitespace; the exact
//!   bytes every signature covers
//! - **Signatures**: Ed25519 in `ed25519:<base64>` envelopes, with managed
//!   keys, rotation and hash-linked signature chains
//! - **Validation**: structural checks, business rules and custom extension
//!   schemas, reported as diagnostics rather than errors
//! - **Building**: feeds and items from markdown, HTML or text, signed on the
//!   way out
//! - **Parsing**: validation plus signature verification at a chosen level
//!
//! ## Usage
//!
//! ```rust
//! use feedseal::{Author, FeedMetadata, ItemInput, Protocol};
//!
//! let protocol = Protocol::default();
//! protocol.generate_key_pair("ada").unwrap();
//!
//! let author = Author {
//!     name: "Ada".into(),
//!     public_key: protocol.public_key("ada").unwrap(),
//!     url: None,
//!     avatar: None,
//!     extensions: Default::default(),
//! };
//! let feed = protocol
//!     .create_complete_feed(
//!         FeedMetadata::new("Notes", "https://ada.example", "https://ada.example/feed.json", author),
//!         vec![ItemInput::new("https://ada.example/1").markdown("# Hello")],
//!         "ada",
//!     )
//!     .unwrap();
//!
//! let parsed = protocol.parse(&feed.to_value().unwrap());
//! assert!(parsed.success);
//! assert!(parsed.signatures.unwrap().all_valid);
//! ```
//!
//! ## Re-exports
//!
//! - `feedseal::core` - canonical JSON, crypto, keys, chains, document model
//! - `feedseal::validate` - the validator and diagnostics
//! - `feedseal::builder` - document construction
//! - `feedseal::parser` - parsing and verification

pub mod error;
pub mod protocol;

// Re-export component crates
pub use feedseal_builder as builder;
pub use feedseal_core as core;
pub use feedseal_parser as parser;
pub use feedseal_validate as validate;

pub use error::{Error, Result};
pub use protocol::{Protocol, ProtocolConfig, ProtocolStats};

// Re-export the public contracts
pub use feedseal_builder::{
    add_item, create_complete_feed, create_feed, sign_feed, BuildError, BuilderConfig,
    DocumentBuilder, FeedMetadata, ItemInput,
};
pub use feedseal_core::{
    create_signature_data, generate_key_pair, is_canonical, sign_content, to_canonical_string,
    verify_signature, Attachment, Author, CoreError, DocumentKind, EncodedKeyPair, Feed, Item,
    KeyManager, Keypair,
};
pub use feedseal_parser::{ParseOptions, ParseResult, Parser, SignatureLevel};
pub use feedseal_validate::{
    Diagnostic, DiagnosticCode, ValidationOptions, ValidationResult, Validator,
};
