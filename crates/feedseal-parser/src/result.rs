//! Parse results and signature reports.

use feedseal_core::document::Feed;
use feedseal_validate::{Diagnostic, DiagnosticCode};
use serde::{Deserialize, Serialize};

use crate::options::SignatureLevel;

/// Outcome of checking one signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Valid,
    Invalid,
    Missing,
    /// Not checked at the requested level.
    Skipped,
}

/// Signature outcome for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSignature {
    /// Position in the document as received, before sorting.
    pub index: usize,
    pub id: String,
    pub status: SignatureStatus,
    /// The key the signature was checked against.
    pub public_key: Option<String>,
}

/// Counts over every checked signature, feed included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSummary {
    pub valid: usize,
    pub invalid: usize,
    pub missing: usize,
}

impl SignatureSummary {
    pub(crate) fn count(&mut self, status: SignatureStatus) {
        match status {
            SignatureStatus::Valid => self.valid += 1,
            SignatureStatus::Invalid => self.invalid += 1,
            SignatureStatus::Missing => self.missing += 1,
            SignatureStatus::Skipped => {}
        }
    }
}

/// All signature outcomes of one parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureReport {
    pub level: SignatureLevel,
    pub feed: SignatureStatus,
    pub items: Vec<ItemSignature>,
    /// Every checked signature is present and valid.
    pub all_valid: bool,
    pub summary: SignatureSummary,
}

/// Facts about a parse call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseMetadata {
    pub item_count: usize,
    pub size_bytes: usize,
    pub parse_time_ms: f64,
    pub verified: bool,
}

/// Outcome of [`Parser::parse`](crate::Parser::parse).
///
/// On success `feed` is set and `errors` is empty. On failure `feed` is
/// `None` and `errors` says why; `signatures` is still set when the failure
/// came from strict signature checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub success: bool,
    pub feed: Option<Feed>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub signatures: Option<SignatureReport>,
    pub metadata: Option<ParseMetadata>,
}

impl ParseResult {
    pub(crate) fn failure(errors: Vec<Diagnostic>, warnings: Vec<Diagnostic>) -> Self {
        Self {
            success: false,
            feed: None,
            errors,
            warnings,
            signatures: None,
            metadata: None,
        }
    }

    pub fn has_error(&self, code: DiagnosticCode) -> bool {
        self.errors.iter().any(|d| d.code == code)
    }

    pub fn has_warning(&self, code: DiagnosticCode) -> bool {
        self.warnings.iter().any(|d| d.code == code)
    }
}
