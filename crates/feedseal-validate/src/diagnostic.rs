//! Diagnostics: the single channel for every validation and parse problem.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed taxonomy of diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Structural
    InvalidJson,
    MissingRequiredField,
    InvalidType,
    InvalidFormat,
    InvalidPattern,
    UnknownField,
    NoContent,
    TooManyTags,
    SchemaViolation,
    InvalidSchema,

    // Business rules
    DuplicateItemId,
    InvalidDateOrder,
    SelfReply,
    InvalidFileSize,
    InvalidImageDimensions,
    InvalidDuration,
    InvalidExtensionFieldName,
    InvalidExtensionFieldValue,

    // Signatures
    MissingFeedSignature,
    MissingItemSignature,
    InvalidFeedSignature,
    InvalidItemSignature,

    // Warnings
    MissingDescription,
    MissingIcon,
    MissingLanguage,
    MissingAltText,
    MissingTitle,
    MissingSummary,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        use DiagnosticCode::*;
        match self {
            InvalidJson => "INVALID_JSON",
            MissingRequiredField => "MISSING_REQUIRED_FIELD",
            InvalidType => "INVALID_TYPE",
            InvalidFormat => "INVALID_FORMAT",
            InvalidPattern => "INVALID_PATTERN",
            UnknownField => "UNKNOWN_FIELD",
            NoContent => "NO_CONTENT",
            TooManyTags => "TOO_MANY_TAGS",
            SchemaViolation => "SCHEMA_VIOLATION",
            InvalidSchema => "INVALID_SCHEMA",
            DuplicateItemId => "DUPLICATE_ITEM_ID",
            InvalidDateOrder => "INVALID_DATE_ORDER",
            SelfReply => "SELF_REPLY",
            InvalidFileSize => "INVALID_FILE_SIZE",
            InvalidImageDimensions => "INVALID_IMAGE_DIMENSIONS",
            InvalidDuration => "INVALID_DURATION",
            InvalidExtensionFieldName => "INVALID_EXTENSION_FIELD_NAME",
            InvalidExtensionFieldValue => "INVALID_EXTENSION_FIELD_VALUE",
            MissingFeedSignature => "MISSING_FEED_SIGNATURE",
            MissingItemSignature => "MISSING_ITEM_SIGNATURE",
            InvalidFeedSignature => "INVALID_FEED_SIGNATURE",
            InvalidItemSignature => "INVALID_ITEM_SIGNATURE",
            MissingDescription => "MISSING_DESCRIPTION",
            MissingIcon => "MISSING_ICON",
            MissingLanguage => "MISSING_LANGUAGE",
            MissingAltText => "MISSING_ALT_TEXT",
            MissingTitle => "MISSING_TITLE",
            MissingSummary => "MISSING_SUMMARY",
        }
    }

    /// Extension-field codes are warnings unless strict mode is on.
    pub fn is_extension(self) -> bool {
        matches!(
            self,
            DiagnosticCode::InvalidExtensionFieldName | DiagnosticCode::InvalidExtensionFieldValue
        )
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem found in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    /// Path to the offending field, e.g. `items[0].attachments[1].width`.
    /// Empty for the document root.
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            field: field.into(),
            message: message.into(),
            details: Value::Null,
            suggestions: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "[{}] {}", self.code, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.code, self.field, self.message)
        }
    }
}

/// Join a field name onto a parent path.
pub fn field_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

/// Append an array index to a path.
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Convert a JSON pointer (`/items/0/title`) to a field path (`items[0].title`).
pub fn pointer_to_path(pointer: &str) -> String {
    let mut path = String::new();
    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if let Ok(index) = segment.parse::<usize>() {
            path = index_path(&path, index);
        } else {
            path = field_path(&path, &segment);
        }
    }
    path
}

/// Errors and warnings collected by a validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Report {
    pub fn error(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
    }

    pub fn warn(&mut self, diagnostic: Diagnostic) {
        self.warnings.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&DiagnosticCode::DuplicateItemId).unwrap();
        assert_eq!(json, "\"DUPLICATE_ITEM_ID\"");
        assert_eq!(DiagnosticCode::InvalidExtensionFieldValue.as_str(), "INVALID_EXTENSION_FIELD_VALUE");
    }

    #[test]
    fn test_as_str_matches_serde() {
        use DiagnosticCode::*;
        for code in [InvalidJson, NoContent, SelfReply, MissingAltText, InvalidItemSignature] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json.as_str(), Some(code.as_str()));
        }
    }

    #[test]
    fn test_paths() {
        assert_eq!(field_path("", "title"), "title");
        assert_eq!(field_path(&index_path("items", 2), "url"), "items[2].url");
        assert_eq!(pointer_to_path("/items/0/attachments/1/width"), "items[0].attachments[1].width");
        assert_eq!(pointer_to_path(""), "");
        assert_eq!(pointer_to_path("/a~1b"), "a/b");
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::new(DiagnosticCode::MissingRequiredField, "title", "title is required");
        assert_eq!(d.to_string(), "[MISSING_REQUIRED_FIELD] title: title is required");
    }
}
