//! The validator: structural pass, business rules, custom schemas, metrics.

use std::time::Instant;

use feedseal_core::metrics::{Metrics, MetricsSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::diagnostic::{Diagnostic, DiagnosticCode, Report};
use crate::rules;
use crate::schema::{check_custom, CustomFields, SchemaCache};
use crate::structural;
use crate::view::{DocumentView, ItemView};

/// Options for one validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Treat extension-field diagnostics as errors.
    pub strict_mode: bool,
    /// Return non-fatal warnings.
    pub include_warnings: bool,
    /// Schema fragment for custom extension namespaces.
    pub custom_schema: Option<Value>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            include_warnings: true,
            custom_schema: None,
        }
    }
}

impl ValidationOptions {
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            ..Self::default()
        }
    }

    pub fn with_custom_schema(mut self, fragment: Value) -> Self {
        self.custom_schema = Some(fragment);
        self
    }
}

/// Outcome of a validation call. `valid` is true exactly when `errors` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationResult {
    fn from_report(report: Report) -> Self {
        Self {
            valid: report.errors.is_empty(),
            errors: report.errors,
            warnings: report.warnings,
        }
    }

    fn invalid_json(message: String) -> Self {
        Self {
            valid: false,
            errors: vec![Diagnostic::new(DiagnosticCode::InvalidJson, "", message)
                .suggest("Check the document is well-formed JSON")],
            warnings: Vec::new(),
        }
    }

    /// Whether any error carries `code`.
    pub fn has_error(&self, code: DiagnosticCode) -> bool {
        self.errors.iter().any(|d| d.code == code)
    }
}

/// Validates feed documents and items.
///
/// Owns its metrics and its cache of compiled custom schemas; share one
/// instance (e.g. behind an `Arc`) to share both.
#[derive(Debug, Default)]
pub struct Validator {
    metrics: Metrics,
    schemas: SchemaCache,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a parsed document. Never panics or errors on bad input.
    pub fn validate_document(&self, doc: &Value, options: &ValidationOptions) -> ValidationResult {
        let started = Instant::now();
        let size = serde_json::to_vec(doc).map(|v| v.len()).unwrap_or(0);
        let result = self.run_document(doc, options);
        self.record(&result, started, size);
        result
    }

    /// Parse and validate a JSON string. Malformed JSON yields a single
    /// `INVALID_JSON` diagnostic.
    pub fn validate_str(&self, input: &str, options: &ValidationOptions) -> ValidationResult {
        let started = Instant::now();
        let result = match serde_json::from_str::<Value>(input) {
            Ok(doc) => self.run_document(&doc, options),
            Err(e) => ValidationResult::invalid_json(e.to_string()),
        };
        self.record(&result, started, input.len());
        result
    }

    /// Validate one item on its own. Field paths are relative to the item.
    pub fn validate_item(&self, item: &Value, options: &ValidationOptions) -> ValidationResult {
        let started = Instant::now();
        let size = serde_json::to_vec(item).map(|v| v.len()).unwrap_or(0);

        let custom = custom_fields(options);
        let mut report = Report::default();
        structural::check_item(item, "", &custom, &mut report);
        if let Some(view) = ItemView::standalone(item) {
            route(rules::check_item(&view), options, &mut report);
        }

        let result = finish(report, options);
        self.record(&result, started, size);
        result
    }

    /// Validate many documents. Results come back in input order, one per
    /// document.
    pub fn validate_batch(&self, docs: &[Value], options: &ValidationOptions) -> Vec<ValidationResult> {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(docs.len().max(1));
        if workers <= 1 {
            return docs.iter().map(|d| self.validate_document(d, options)).collect();
        }

        let chunk = docs.len().div_ceil(workers);
        debug!(documents = docs.len(), workers, "validating batch");
        std::thread::scope(|s| {
            let handles: Vec<_> = docs
                .chunks(chunk)
                .map(|part| {
                    s.spawn(move || {
                        part.iter()
                            .map(|d| self.validate_document(d, options))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .zip(docs.chunks(chunk))
                .flat_map(|(handle, part)| {
                    handle.join().unwrap_or_else(|_| {
                        warn!(documents = part.len(), "validation worker panicked");
                        part.iter()
                            .map(|_| Self::aborted())
                            .collect()
                    })
                })
                .collect()
        })
    }

    /// Snapshot of this validator's counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Number of compiled custom schemas held.
    pub fn cached_schemas(&self) -> usize {
        self.schemas.len()
    }

    fn run_document(&self, doc: &Value, options: &ValidationOptions) -> ValidationResult {
        let custom = custom_fields(options);
        let mut report = Report::default();
        structural::check_document(doc, &custom, &mut report);

        if let Some(view) = DocumentView::new(doc) {
            route(rules::check_document(&view), options, &mut report);

            if let Some(fragment) = &options.custom_schema {
                match self.schemas.get_or_compile(fragment) {
                    Ok(compiled) => report.errors.extend(check_custom(&compiled, doc)),
                    Err(diagnostic) => report.error(diagnostic),
                }
            }
        }

        finish(report, options)
    }

    fn record(&self, result: &ValidationResult, started: Instant, size: usize) {
        let elapsed = started.elapsed();
        if !result.valid {
            debug!(
                errors = result.errors.len(),
                first = %result.errors[0],
                "document failed validation"
            );
        }
        self.metrics.record(
            result.valid,
            elapsed,
            size,
            result.errors.iter().map(|d| d.code.as_str()),
        );
    }

    fn aborted() -> ValidationResult {
        ValidationResult {
            valid: false,
            errors: vec![Diagnostic::new(
                DiagnosticCode::SchemaViolation,
                "",
                "validation aborted",
            )],
            warnings: Vec::new(),
        }
    }
}

fn custom_fields(options: &ValidationOptions) -> CustomFields {
    options
        .custom_schema
        .as_ref()
        .map(CustomFields::from_fragment)
        .unwrap_or_default()
}

/// Extension diagnostics are errors only in strict mode.
fn route(found: Vec<Diagnostic>, options: &ValidationOptions, report: &mut Report) {
    for d in found {
        if d.code.is_extension() && !options.strict_mode {
            report.warn(d);
        } else {
            report.error(d);
        }
    }
}

fn finish(mut report: Report, options: &ValidationOptions) -> ValidationResult {
    if !options.include_warnings {
        report.warnings.clear();
    }
    ValidationResult::from_report(report)
}
