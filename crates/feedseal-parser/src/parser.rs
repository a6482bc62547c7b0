//! The parser: validation, signature verification and post-processing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::DateTime;
use feedseal_core::canonical::{create_signature_data, DocumentKind, SIGNATURE_FIELD};
use feedseal_core::crypto::verify_canonical;
use feedseal_core::document::Feed;
use feedseal_core::metrics::{Metrics, MetricsSnapshot};
use feedseal_validate::{
    Diagnostic, DiagnosticCode, DocumentView, ItemView, ValidationOptions, Validator,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::options::ParseOptions;
use crate::result::{
    ItemSignature, ParseMetadata, ParseResult, SignatureReport, SignatureStatus, SignatureSummary,
};
use crate::views::{
    AuthorSummary, ContentResult, ContentType, DateRange, FeedMetadataView, ItemContent,
    MetadataResult,
};

/// Parses and verifies feed documents.
///
/// Every call, including the cheap modes, updates this parser's metrics.
#[derive(Debug, Default)]
pub struct Parser {
    validator: Arc<Validator>,
    metrics: Metrics,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing validator. Validation metrics then accumulate there,
    /// parse metrics here.
    pub fn with_validator(validator: Arc<Validator>) -> Self {
        Self {
            validator,
            metrics: Metrics::new(),
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Validate, verify and post-process a document.
    pub fn parse(&self, doc: &Value, options: &ParseOptions) -> ParseResult {
        let started = Instant::now();
        let size = document_size(doc);
        let result = self.run_parse(doc, options, started, size);
        self.record(result.success, started, size, &result.errors);
        result
    }

    /// Parse a JSON string. Malformed JSON yields a single `INVALID_JSON` error.
    pub fn parse_str(&self, input: &str, options: &ParseOptions) -> ParseResult {
        let started = Instant::now();
        let result = match serde_json::from_str::<Value>(input) {
            Ok(doc) => self.run_parse(&doc, options, started, input.len()),
            Err(e) => ParseResult::failure(
                vec![Diagnostic::new(DiagnosticCode::InvalidJson, "", e.to_string())],
                Vec::new(),
            ),
        };
        self.record(result.success, started, input.len(), &result.errors);
        result
    }

    /// Full parse, then drop every content field except the one for
    /// `content_type`. `TitleOnly` drops all content fields.
    pub fn parse_with_content_filter(
        &self,
        doc: &Value,
        content_type: ContentType,
        options: &ParseOptions,
    ) -> ParseResult {
        let mut result = self.parse(doc, options);
        if let Some(feed) = &mut result.feed {
            let keep = content_type.field();
            for item in &mut feed.items {
                if keep != Some("content_text") {
                    item.content_text = None;
                }
                if keep != Some("content_html") {
                    item.content_html = None;
                }
                if keep != Some("content_markdown") {
                    item.content_markdown = None;
                }
            }
        }
        result
    }

    /// Title, author, date range and signature presence. No content is read
    /// and no signature is checked.
    pub fn parse_metadata_only(&self, doc: &Value) -> MetadataResult {
        let started = Instant::now();
        let result = metadata_only(doc);
        self.record(result.success, started, document_size(doc), &result.errors);
        result
    }

    /// Item content fields and a content-type histogram, after shallow feed
    /// checks.
    pub fn parse_content_only(&self, doc: &Value) -> ContentResult {
        let started = Instant::now();
        let result = content_only(doc);
        self.record(result.success, started, document_size(doc), &result.errors);
        result
    }

    /// Snapshot of this parser's counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn record(&self, success: bool, started: Instant, size: usize, errors: &[Diagnostic]) {
        self.metrics.record(
            success,
            started.elapsed(),
            size,
            errors.iter().map(|d| d.code.as_str()),
        );
    }

    fn run_parse(
        &self,
        doc: &Value,
        options: &ParseOptions,
        started: Instant,
        size: usize,
    ) -> ParseResult {
        // 1. Structural and business validation
        let validation = self.validator.validate_document(
            doc,
            &ValidationOptions {
                strict_mode: options.strict_mode,
                include_warnings: true,
                custom_schema: None,
            },
        );
        if !validation.valid {
            debug!(errors = validation.errors.len(), "parse rejected by validation");
            return ParseResult::failure(validation.errors, validation.warnings);
        }
        let mut warnings = validation.warnings;
        let Some(view) = DocumentView::new(doc) else {
            return ParseResult::failure(
                vec![Diagnostic::new(DiagnosticCode::InvalidType, "", "document must be a JSON object")],
                warnings,
            );
        };

        // 2. Signature presence
        if options.require_signatures {
            let missing = missing_signatures(&view, options);
            if !missing.is_empty() {
                return ParseResult::failure(missing, warnings);
            }
        }

        // 3. Signature verification
        let signatures = if options.verify_signatures {
            let (report, problems) = verify(&view, options);
            if options.strict_mode && !problems.is_empty() {
                let mut failed = ParseResult::failure(problems, warnings);
                failed.signatures = Some(report);
                return failed;
            }
            warnings.extend(problems);
            Some(report)
        } else {
            None
        };

        // 4. Typed model and post-processing
        let mut feed = match Feed::from_value(doc.clone()) {
            Ok(feed) => feed,
            Err(e) => {
                return ParseResult::failure(
                    vec![Diagnostic::new(DiagnosticCode::SchemaViolation, "", e.to_string())],
                    warnings,
                )
            }
        };
        if !options.preserve_extensions {
            feed.strip_extensions();
        }
        sort_newest_first(&mut feed);

        let metadata = ParseMetadata {
            item_count: feed.items.len(),
            size_bytes: size,
            parse_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            verified: signatures.is_some(),
        };
        ParseResult {
            success: true,
            feed: Some(feed),
            errors: Vec::new(),
            warnings,
            signatures,
            metadata: Some(metadata),
        }
    }
}

/// Serialized size in bytes.
fn document_size(doc: &Value) -> usize {
    serde_json::to_vec(doc).map(|v| v.len()).unwrap_or(0)
}

fn has_signature(obj: &Map<String, Value>) -> bool {
    obj.get(SIGNATURE_FIELD).and_then(Value::as_str).is_some()
}

fn missing_signatures(view: &DocumentView<'_>, options: &ParseOptions) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let level = options.signature_level;
    if level.checks_feed() && !has_signature(view.fields()) {
        out.push(
            Diagnostic::new(DiagnosticCode::MissingFeedSignature, SIGNATURE_FIELD, "feed is not signed")
                .suggest("Sign the feed, or parse with require_signatures off"),
        );
    }
    if level.checks_items() {
        for item in view.items().filter(|i| !has_signature(i.fields())) {
            out.push(Diagnostic::new(
                DiagnosticCode::MissingItemSignature,
                item.path(SIGNATURE_FIELD),
                format!("item {:?} is not signed", item.id().unwrap_or_default()),
            ));
        }
    }
    out
}

/// Check every signature at the requested level.
///
/// Returns the report and one diagnostic per invalid signature. Missing
/// signatures are counted but only diagnosed by [`missing_signatures`].
fn verify(view: &DocumentView<'_>, options: &ParseOptions) -> (SignatureReport, Vec<Diagnostic>) {
    let level = options.signature_level;
    let feed_key = view
        .author()
        .and_then(|a| a.get("public_key"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut summary = SignatureSummary::default();
    let mut problems = Vec::new();

    let feed_status = if level.checks_feed() {
        let status = check_one(view.fields(), DocumentKind::Feed, feed_key);
        summary.count(status);
        if status == SignatureStatus::Invalid {
            warn!("feed signature does not verify");
            problems.push(Diagnostic::new(
                DiagnosticCode::InvalidFeedSignature,
                SIGNATURE_FIELD,
                "feed signature does not verify against the feed author key",
            ));
        }
        status
    } else {
        SignatureStatus::Skipped
    };

    let mut items = Vec::new();
    for item in view.items() {
        let key = item_key(&item).unwrap_or(feed_key);
        let status = if level.checks_items() {
            check_one(item.fields(), DocumentKind::Item, key)
        } else {
            SignatureStatus::Skipped
        };
        summary.count(status);
        if status == SignatureStatus::Invalid {
            warn!(id = item.id().unwrap_or_default(), "item signature does not verify");
            problems.push(Diagnostic::new(
                DiagnosticCode::InvalidItemSignature,
                item.path(SIGNATURE_FIELD),
                "item signature does not verify against its author key",
            ));
        }
        items.push(ItemSignature {
            index: item.index().unwrap_or_default(),
            id: item.id().unwrap_or_default().to_string(),
            status,
            public_key: (status != SignatureStatus::Skipped).then(|| key.to_string()),
        });
    }

    debug!(
        valid = summary.valid,
        invalid = summary.invalid,
        missing = summary.missing,
        "verified signatures"
    );
    let report = SignatureReport {
        level,
        feed: feed_status,
        items,
        all_valid: summary.invalid == 0 && summary.missing == 0,
        summary,
    };
    (report, problems)
}

fn item_key<'a>(item: &ItemView<'a>) -> Option<&'a str> {
    item.author()
        .and_then(|a| a.get("public_key"))
        .and_then(Value::as_str)
}

fn check_one(obj: &Map<String, Value>, kind: DocumentKind, public_key: &str) -> SignatureStatus {
    let Some(signature) = obj.get(SIGNATURE_FIELD).and_then(Value::as_str) else {
        return SignatureStatus::Missing;
    };
    let data = create_signature_data(&Value::Object(obj.clone()), kind);
    if verify_canonical(&data, signature, public_key) {
        SignatureStatus::Valid
    } else {
        SignatureStatus::Invalid
    }
}

/// Newest first by `date_published`. Stable, so ties keep document order;
/// unparseable dates sort last.
fn sort_newest_first(feed: &mut Feed) {
    feed.items.sort_by(|a, b| {
        let da = DateTime::parse_from_rfc3339(&a.date_published).ok();
        let db = DateTime::parse_from_rfc3339(&b.date_published).ok();
        db.cmp(&da)
    });
}

fn metadata_only(doc: &Value) -> MetadataResult {
    let fail = |errors| MetadataResult {
        success: false,
        metadata: None,
        errors,
    };
    let Some(view) = DocumentView::new(doc) else {
        return fail(vec![Diagnostic::new(
            DiagnosticCode::InvalidType,
            "",
            "document must be a JSON object",
        )]);
    };

    let mut errors = Vec::new();
    if view.str_field("title").is_none() {
        errors.push(Diagnostic::new(
            DiagnosticCode::MissingRequiredField,
            "title",
            "title is required",
        ));
    }
    if view.author().is_none() {
        errors.push(Diagnostic::new(
            DiagnosticCode::MissingRequiredField,
            "author",
            "author is required",
        ));
    }
    if !errors.is_empty() {
        return fail(errors);
    }

    let text = |name: &str| view.str_field(name).map(str::to_string);
    let author = view.author().map(|a| AuthorSummary {
        name: a.get("name").and_then(Value::as_str).map(str::to_string),
        public_key: a.get("public_key").and_then(Value::as_str).map(str::to_string),
    });

    let mut dates: Vec<(chrono::DateTime<chrono::FixedOffset>, &str)> = Vec::new();
    let mut item_count = 0;
    let mut signed_items = 0;
    for item in view.items() {
        item_count += 1;
        if has_signature(item.fields()) {
            signed_items += 1;
        }
        if let Some(raw) = item.str_field("date_published") {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                dates.push((parsed, raw));
            }
        }
    }
    let date_range = match (dates.iter().min(), dates.iter().max()) {
        (Some(lo), Some(hi)) => Some(DateRange {
            earliest: lo.1.to_string(),
            latest: hi.1.to_string(),
        }),
        _ => None,
    };

    MetadataResult {
        success: true,
        metadata: Some(FeedMetadataView {
            title: text("title").unwrap_or_default(),
            version: text("version"),
            home_page_url: text("home_page_url"),
            feed_url: text("feed_url"),
            description: text("description"),
            language: text("language"),
            author,
            item_count,
            date_range,
            has_feed_signature: has_signature(view.fields()),
            signed_items,
        }),
        errors: Vec::new(),
    }
}

fn content_only(doc: &Value) -> ContentResult {
    let fail = |d: Diagnostic| ContentResult {
        success: false,
        items: Vec::new(),
        content_types: BTreeMap::new(),
        errors: vec![d],
    };
    let Some(view) = DocumentView::new(doc) else {
        return fail(Diagnostic::new(
            DiagnosticCode::InvalidType,
            "",
            "document must be a JSON object",
        ));
    };
    match view.get("items") {
        Some(Value::Array(_)) => {}
        Some(_) => {
            return fail(Diagnostic::new(DiagnosticCode::InvalidType, "items", "items must be an array"))
        }
        None => {
            return fail(Diagnostic::new(
                DiagnosticCode::MissingRequiredField,
                "items",
                "items is required",
            ))
        }
    }

    let mut content_types = BTreeMap::new();
    let items: Vec<ItemContent> = view
        .items()
        .map(|item| {
            let content_type = ContentType::of(item.fields());
            *content_types.entry(content_type).or_insert(0) += 1;
            let text = |name: &str| item.str_field(name).map(str::to_string);
            ItemContent {
                id: text("id"),
                title: text("title"),
                content_type,
                content_text: text("content_text"),
                content_html: text("content_html"),
                content_markdown: text("content_markdown"),
            }
        })
        .collect();

    ContentResult {
        success: true,
        items,
        content_types,
        errors: Vec::new(),
    }
}
