//! The Protocol: one handle over keys, validation, building and parsing.
//!
//! Feeds are signed with keys held by the protocol's [`KeyManager`], looked
//! up by owner name, so private key material never passes through callers.

use std::sync::Arc;

use feedseal_builder::{BuilderConfig, DocumentBuilder, FeedMetadata, ItemInput};
use feedseal_core::{EncodedKeyPair, Feed, KeyManager, MetricsSnapshot};
use feedseal_parser::{ParseOptions, ParseResult, Parser};
use feedseal_validate::{ValidationOptions, ValidationResult, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;

/// Configuration for the Protocol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Options for [`Protocol::validate`].
    pub validation: ValidationOptions,
    /// Options for [`Protocol::parse`].
    pub parse: ParseOptions,
    pub builder: BuilderConfig,
}

impl ProtocolConfig {
    /// Strict validation and strict, signature-requiring parsing.
    pub fn strict() -> Self {
        Self {
            validation: ValidationOptions::strict(),
            parse: ParseOptions::strict(),
            builder: BuilderConfig::default(),
        }
    }
}

/// Counters of the protocol's validator and parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolStats {
    /// Every validation, including those run by the builder and parser.
    pub validation: MetricsSnapshot,
    pub parse: MetricsSnapshot,
}

/// The main Protocol struct.
///
/// The builder and parser share the protocol's validator, so its schema
/// cache and counters cover all three.
#[derive(Debug)]
pub struct Protocol {
    config: ProtocolConfig,
    validator: Arc<Validator>,
    parser: Parser,
    builder: DocumentBuilder,
    keys: KeyManager,
}

impl Protocol {
    pub fn new(config: ProtocolConfig) -> Self {
        let validator = Arc::new(Validator::new());
        Self {
            parser: Parser::with_validator(Arc::clone(&validator)),
            builder: DocumentBuilder::with_validator(config.builder.clone(), Arc::clone(&validator)),
            validator,
            keys: KeyManager::new(),
            config,
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn builder(&self) -> &DocumentBuilder {
        &self.builder
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Generate and store a key pair for a new owner.
    pub fn generate_key_pair(&self, owner: &str) -> Result<EncodedKeyPair> {
        Ok(self.keys.generate_key_pair(owner)?)
    }

    /// Replace the owner's active key. Signatures by the old key stay
    /// verifiable through the key history.
    pub fn rotate_key(&self, owner: &str) -> Result<EncodedKeyPair> {
        Ok(self.keys.rotate_key(owner)?)
    }

    /// The owner's public key envelope, for use in [`Author::public_key`].
    ///
    /// [`Author::public_key`]: feedseal_core::Author::public_key
    pub fn public_key(&self, owner: &str) -> Option<String> {
        self.keys.active_public_key(owner).map(|k| k.to_envelope())
    }

    fn private_key(&self, owner: &str) -> Result<String> {
        Ok(self.keys.signing_key(owner)?.private_envelope())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn validate(&self, doc: &Value) -> ValidationResult {
        self.validator.validate_document(doc, &self.config.validation)
    }

    pub fn validate_str(&self, input: &str) -> ValidationResult {
        self.validator.validate_str(input, &self.config.validation)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Building
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_feed(&self, metadata: FeedMetadata) -> Result<Feed> {
        Ok(self.builder.create_feed(metadata)?)
    }

    /// Append a signed item, signing with `owner`'s active key.
    pub fn add_item(&self, feed: &Feed, input: ItemInput, owner: &str) -> Result<Feed> {
        let key = self.private_key(owner)?;
        debug!(owner, url = %input.url, "adding item");
        Ok(self.builder.add_item(feed, input, &key)?)
    }

    /// Sign the feed with `owner`'s active key.
    pub fn sign_feed(&self, feed: &Feed, owner: &str) -> Result<Feed> {
        let key = self.private_key(owner)?;
        debug!(owner, items = feed.items.len(), "signing feed");
        Ok(self.builder.sign_feed(feed, &key)?)
    }

    pub fn create_complete_feed(
        &self,
        metadata: FeedMetadata,
        items: Vec<ItemInput>,
        owner: &str,
    ) -> Result<Feed> {
        let key = self.private_key(owner)?;
        debug!(owner, items = items.len(), "building complete feed");
        Ok(self.builder.create_complete_feed(metadata, items, &key)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Parsing
    // ─────────────────────────────────────────────────────────────────────────

    pub fn parse(&self, doc: &Value) -> ParseResult {
        self.parser.parse(doc, &self.config.parse)
    }

    pub fn parse_str(&self, input: &str) -> ParseResult {
        self.parser.parse_str(input, &self.config.parse)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metrics
    // ─────────────────────────────────────────────────────────────────────────

    pub fn stats(&self) -> ProtocolStats {
        ProtocolStats {
            validation: self.validator.metrics(),
            parse: self.parser.metrics(),
        }
    }

    pub fn reset_metrics(&self) {
        self.validator.reset_metrics();
        self.parser.reset_metrics();
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::new(ProtocolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use feedseal_builder::BuildError;
    use feedseal_core::{Author, CoreError, Extensions};

    fn author(protocol: &Protocol, owner: &str) -> Author {
        Author {
            name: owner.to_string(),
            public_key: protocol.public_key(owner).unwrap(),
            url: None,
            avatar: None,
            extensions: Extensions::new(),
        }
    }

    fn metadata(protocol: &Protocol, owner: &str) -> FeedMetadata {
        FeedMetadata::new("Notes", "https://n.example", "https://n.example/feed.json", author(protocol, owner))
    }

    #[test]
    fn test_build_and_parse_with_managed_key() {
        let protocol = Protocol::new(ProtocolConfig::strict());
        protocol.generate_key_pair("ada").unwrap();

        let feed = protocol
            .create_complete_feed(
                metadata(&protocol, "ada"),
                vec![ItemInput::new("https://n.example/1").text("hello")],
                "ada",
            )
            .unwrap();
        let result = protocol.parse(&feed.to_value().unwrap());
        assert!(result.success, "{:?}", result.errors);
        assert!(result.signatures.unwrap().all_valid);
    }

    #[test]
    fn test_unknown_owner() {
        let protocol = Protocol::default();
        let feed = Feed::from_value(serde_json::json!({
            "version": "https://jsonfeed.org/version/1.1",
            "title": "T",
            "home_page_url": "https://n.example",
            "feed_url": "https://n.example/feed.json",
            "author": {"name": "A", "public_key": "ed25519:AAAA"}
        }))
        .unwrap();
        let err = protocol.sign_feed(&feed, "nobody").unwrap_err();
        assert!(matches!(err, Error::Core(CoreError::KeyNotFound(_))));
    }

    #[test]
    fn test_rotation_breaks_author_binding() {
        let protocol = Protocol::default();
        protocol.generate_key_pair("ada").unwrap();
        let feed = protocol.create_feed(metadata(&protocol, "ada")).unwrap();

        protocol.rotate_key("ada").unwrap();
        let err = protocol
            .add_item(&feed, ItemInput::new("https://n.example/1").text("x"), "ada")
            .unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::KeyMismatch { .. })));
        assert_eq!(protocol.keys().key_history("ada").len(), 1);
    }

    #[test]
    fn test_shared_validator_counts_builder_and_parser() {
        let protocol = Protocol::default();
        protocol.generate_key_pair("ada").unwrap();
        let feed = protocol.create_feed(metadata(&protocol, "ada")).unwrap();
        protocol.parse(&feed.to_value().unwrap());

        let stats = protocol.stats();
        assert_eq!(stats.validation.operations, 2);
        assert_eq!(stats.parse.operations, 1);

        protocol.reset_metrics();
        assert_eq!(protocol.stats().validation.operations, 0);
    }

    #[test]
    fn test_config_from_json() {
        let config: ProtocolConfig = serde_json::from_str(
            r#"{"parse": {"signature_level": "items-only"}, "builder": {"max_tags": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.parse.signature_level, feedseal_parser::SignatureLevel::ItemsOnly);
        assert!(config.parse.verify_signatures);
        assert_eq!(config.builder.max_tags, 5);
        assert_eq!(config.builder.summary_length, 200);
    }
}
