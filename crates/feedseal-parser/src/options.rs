//! Parser configuration.

use serde::{Deserialize, Serialize};

/// Which signatures a parse checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureLevel {
    /// Feed and item signatures.
    #[default]
    All,
    /// Only the feed signature.
    FeedOnly,
    /// Only item signatures; the feed signature is ignored.
    ItemsOnly,
}

impl SignatureLevel {
    pub fn checks_feed(self) -> bool {
        matches!(self, SignatureLevel::All | SignatureLevel::FeedOnly)
    }

    pub fn checks_items(self) -> bool {
        matches!(self, SignatureLevel::All | SignatureLevel::ItemsOnly)
    }
}

/// Options for [`Parser::parse`](crate::Parser::parse).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Verify signatures at `signature_level`.
    pub verify_signatures: bool,
    /// Keep `_`-prefixed fields in the returned feed.
    pub preserve_extensions: bool,
    /// Signature failures fail the parse; extension problems are errors.
    pub strict_mode: bool,
    /// Missing signatures at `signature_level` fail the parse.
    pub require_signatures: bool,
    pub signature_level: SignatureLevel,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            verify_signatures: true,
            preserve_extensions: true,
            strict_mode: false,
            require_signatures: false,
            signature_level: SignatureLevel::All,
        }
    }
}

impl ParseOptions {
    /// Strict verification with signatures required.
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            require_signatures: true,
            ..Self::default()
        }
    }

    pub fn level(mut self, level: SignatureLevel) -> Self {
        self.signature_level = level;
        self
    }

    /// Skip all signature work.
    pub fn unverified() -> Self {
        Self {
            verify_signatures: false,
            ..Self::default()
        }
    }
}
