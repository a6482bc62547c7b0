//! Structural checks: required fields, types, formats, patterns, unknown fields.
//!
//! Every check reports into a [`Report`]; nothing here returns early on bad
//! input beyond skipping the children of a value with the wrong type.

use std::collections::BTreeSet;

use chrono::DateTime;
use feedseal_core::crypto::{PublicKey, ENVELOPE_PREFIX};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};
use url::Url;
use uuid::Uuid;

use crate::diagnostic::{field_path, index_path, Diagnostic, DiagnosticCode, Report};
use crate::schema::CustomFields;

lazy_static! {
    static ref LANGUAGE_RE: Regex =
        Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]+)*$").expect("language pattern");
    static ref MIME_RE: Regex = Regex::new(r"^[a-z]+/[a-z0-9.+-]+$").expect("mime pattern");
    static ref ENVELOPE_RE: Regex =
        Regex::new(r"^ed25519:[A-Za-z0-9+/]+={0,2}$").expect("envelope pattern");
}

pub const FEED_FIELDS: &[&str] = &[
    "version",
    "title",
    "home_page_url",
    "feed_url",
    "description",
    "icon",
    "language",
    "author",
    "items",
    "signature",
];

pub const ITEM_FIELDS: &[&str] = &[
    "id",
    "url",
    "uuid",
    "title",
    "summary",
    "date_published",
    "date_modified",
    "tags",
    "in_reply_to",
    "content_text",
    "content_html",
    "content_markdown",
    "author",
    "attachments",
    "interactions",
    "signature",
];

pub const AUTHOR_FIELDS: &[&str] = &["name", "public_key", "url", "avatar"];

pub const ATTACHMENT_FIELDS: &[&str] = &[
    "url",
    "mime_type",
    "title",
    "size_in_bytes",
    "width",
    "height",
    "duration_in_seconds",
    "alt_text",
];

pub const INTERACTION_FIELDS: &[&str] = &[
    "replies_count",
    "likes_count",
    "shares_count",
    "replies_url",
    "likes_url",
    "shares_url",
];

const CONTENT_FIELDS: &[&str] = &["content_text", "content_html", "content_markdown"];

/// Check a whole feed document.
pub fn check_document(root: &Value, custom: &CustomFields, report: &mut Report) {
    let Some(obj) = root.as_object() else {
        report.error(
            Diagnostic::new(DiagnosticCode::InvalidType, "", "document must be a JSON object")
                .with_details(json!({"expected": "object", "found": type_name(root)})),
        );
        return;
    };

    for name in ["version", "title", "home_page_url", "feed_url", "author", "items"] {
        require(obj, "", name, report);
    }
    for name in &custom.feed_required {
        require(obj, "", name, report);
    }
    check_unknown(obj, "", FEED_FIELDS, &custom.feed_properties, report);

    if let Some(version) = string_field(obj, "", "version", report) {
        check_uri(version, "version", report);
    }
    if let Some(title) = string_field(obj, "", "title", report) {
        non_empty(title, "title", report);
    }
    for name in ["home_page_url", "feed_url", "icon"] {
        if let Some(url) = string_field(obj, "", name, report) {
            check_https(url, name, report);
        }
    }
    string_field(obj, "", "description", report);
    if let Some(lang) = string_field(obj, "", "language", report) {
        if !LANGUAGE_RE.is_match(lang) {
            report.error(
                Diagnostic::new(
                    DiagnosticCode::InvalidPattern,
                    "language",
                    format!("{lang:?} is not a language tag"),
                )
                .suggest("Use a lowercase tag such as \"en\" or \"en-US\""),
            );
        }
    }
    // Signature bytes are judged by the verifier, not here
    string_field(obj, "", "signature", report);

    match obj.get("author") {
        Some(Value::Object(author)) => check_author(author, "author", report),
        Some(other) => report.error(wrong_type("author", "object", other)),
        None => {}
    }

    match obj.get("items") {
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                check_item(item, &index_path("items", i), custom, report);
            }
        }
        Some(other) => report.error(wrong_type("items", "array", other)),
        None => {}
    }

    for (name, code, message) in [
        ("description", DiagnosticCode::MissingDescription, "feed has no description"),
        ("icon", DiagnosticCode::MissingIcon, "feed has no icon"),
        ("language", DiagnosticCode::MissingLanguage, "feed has no language"),
    ] {
        if !obj.contains_key(name) {
            report.warn(Diagnostic::new(code, name, message));
        }
    }
}

/// Check one item. `base` is its path prefix, empty for a standalone item.
pub fn check_item(value: &Value, base: &str, custom: &CustomFields, report: &mut Report) {
    let Some(item) = value.as_object() else {
        report.error(wrong_type(base, "object", value));
        return;
    };
    let path = |name: &str| field_path(base, name);

    for name in ["id", "url", "date_published"] {
        require(item, base, name, report);
    }
    for name in &custom.item_required {
        require(item, base, name, report);
    }
    check_unknown(item, base, ITEM_FIELDS, &custom.item_properties, report);

    for name in ["id", "url", "in_reply_to"] {
        if let Some(url) = string_field(item, base, name, report) {
            check_https(url, &path(name), report);
        }
    }
    if let Some(uuid) = string_field(item, base, "uuid", report) {
        if Uuid::parse_str(uuid).is_err() {
            report.error(Diagnostic::new(
                DiagnosticCode::InvalidFormat,
                path("uuid"),
                format!("{uuid:?} is not a UUID"),
            ));
        }
    }
    for name in ["date_published", "date_modified"] {
        if let Some(date) = string_field(item, base, name, report) {
            check_date(date, &path(name), report);
        }
    }
    for name in ["title", "summary"] {
        string_field(item, base, name, report);
    }
    for name in CONTENT_FIELDS {
        string_field(item, base, name, report);
    }
    string_field(item, base, "signature", report);

    let has_content = CONTENT_FIELDS
        .iter()
        .chain(["title"].iter())
        .any(|name| {
            item.get(*name)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty())
        });
    if !has_content {
        report.error(
            Diagnostic::new(
                DiagnosticCode::NoContent,
                base,
                "item has no content_text, content_html, content_markdown or title",
            )
            .suggest("Add at least one content field or a title"),
        );
    }

    match item.get("tags") {
        Some(Value::Array(tags)) => {
            let tags_path = path("tags");
            for (i, tag) in tags.iter().enumerate() {
                if !tag.is_string() {
                    report.error(wrong_type(&index_path(&tags_path, i), "string", tag));
                }
            }
            if tags.len() > feedseal_core::document::MAX_TAGS {
                report.error(
                    Diagnostic::new(
                        DiagnosticCode::TooManyTags,
                        tags_path,
                        format!(
                            "{} tags, at most {} allowed",
                            tags.len(),
                            feedseal_core::document::MAX_TAGS
                        ),
                    )
                    .with_details(json!({"count": tags.len(), "max": feedseal_core::document::MAX_TAGS})),
                );
            }
        }
        Some(other) => report.error(wrong_type(&path("tags"), "array", other)),
        None => {}
    }

    match item.get("author") {
        Some(Value::Object(author)) => check_author(author, &path("author"), report),
        Some(other) => report.error(wrong_type(&path("author"), "object", other)),
        None => {}
    }

    match item.get("attachments") {
        Some(Value::Array(list)) => {
            let list_path = path("attachments");
            for (i, att) in list.iter().enumerate() {
                let att_path = index_path(&list_path, i);
                match att.as_object() {
                    Some(att) => check_attachment(att, &att_path, report),
                    None => report.error(wrong_type(&att_path, "object", att)),
                }
            }
        }
        Some(other) => report.error(wrong_type(&path("attachments"), "array", other)),
        None => {}
    }

    match item.get("interactions") {
        Some(Value::Object(inter)) => check_interactions(inter, &path("interactions"), report),
        Some(other) => report.error(wrong_type(&path("interactions"), "object", other)),
        None => {}
    }

    if !item.contains_key("title") {
        report.warn(Diagnostic::new(
            DiagnosticCode::MissingTitle,
            path("title"),
            "item has no title",
        ));
    }
    if !item.contains_key("summary") {
        report.warn(Diagnostic::new(
            DiagnosticCode::MissingSummary,
            path("summary"),
            "item has no summary",
        ));
    }
}

fn check_author(author: &Map<String, Value>, base: &str, report: &mut Report) {
    require(author, base, "name", report);
    require(author, base, "public_key", report);
    check_unknown(author, base, AUTHOR_FIELDS, &BTreeSet::new(), report);

    if let Some(name) = string_field(author, base, "name", report) {
        non_empty(name, &field_path(base, "name"), report);
    }
    if let Some(key) = string_field(author, base, "public_key", report) {
        let key_path = field_path(base, "public_key");
        if check_envelope_pattern(key, &key_path, report) && PublicKey::from_envelope(key).is_err() {
            report.error(
                Diagnostic::new(
                    DiagnosticCode::InvalidFormat,
                    key_path,
                    "public key must decode to 32 bytes",
                )
                .with_details(json!({"expected_bytes": 32})),
            );
        }
    }
    for name in ["url", "avatar"] {
        if let Some(url) = string_field(author, base, name, report) {
            check_https(url, &field_path(base, name), report);
        }
    }
}

fn check_attachment(att: &Map<String, Value>, base: &str, report: &mut Report) {
    require(att, base, "url", report);
    require(att, base, "mime_type", report);
    check_unknown(att, base, ATTACHMENT_FIELDS, &BTreeSet::new(), report);

    if let Some(url) = string_field(att, base, "url", report) {
        check_https(url, &field_path(base, "url"), report);
    }
    if let Some(mime) = string_field(att, base, "mime_type", report) {
        if !MIME_RE.is_match(mime) {
            report.error(
                Diagnostic::new(
                    DiagnosticCode::InvalidPattern,
                    field_path(base, "mime_type"),
                    format!("{mime:?} is not a MIME type"),
                )
                .suggest("Use a lowercase type/subtype such as \"image/png\""),
            );
        }
    }
    for name in ["title", "alt_text"] {
        string_field(att, base, name, report);
    }
    // Signs and bounds are business rules; only the JSON type is checked here
    for name in ["size_in_bytes", "width", "height"] {
        if let Some(v) = att.get(name) {
            if !(v.is_i64() || v.is_u64()) {
                report.error(wrong_type(&field_path(base, name), "integer", v));
            }
        }
    }
    if let Some(v) = att.get("duration_in_seconds") {
        if !v.is_number() {
            report.error(wrong_type(&field_path(base, "duration_in_seconds"), "number", v));
        }
    }

    let is_image = att
        .get("mime_type")
        .and_then(Value::as_str)
        .is_some_and(|m| m.starts_with("image/"));
    if is_image && !att.contains_key("alt_text") {
        report.warn(
            Diagnostic::new(
                DiagnosticCode::MissingAltText,
                field_path(base, "alt_text"),
                "image attachment has no alt_text",
            )
            .suggest("Describe the image for screen readers"),
        );
    }
}

fn check_interactions(inter: &Map<String, Value>, base: &str, report: &mut Report) {
    check_unknown(inter, base, INTERACTION_FIELDS, &BTreeSet::new(), report);
    for name in ["replies_count", "likes_count", "shares_count"] {
        if let Some(v) = inter.get(name) {
            if !v.is_u64() {
                report.error(wrong_type(&field_path(base, name), "non-negative integer", v));
            }
        }
    }
    for name in ["replies_url", "likes_url", "shares_url"] {
        if let Some(url) = string_field(inter, base, name, report) {
            check_https(url, &field_path(base, name), report);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn wrong_type(path: &str, expected: &str, found: &Value) -> Diagnostic {
    Diagnostic::new(
        DiagnosticCode::InvalidType,
        path,
        format!("expected {expected}, found {}", type_name(found)),
    )
    .with_details(json!({"expected": expected, "found": type_name(found)}))
}

fn require(obj: &Map<String, Value>, base: &str, name: &str, report: &mut Report) {
    if !obj.contains_key(name) {
        let path = field_path(base, name);
        report.error(
            Diagnostic::new(
                DiagnosticCode::MissingRequiredField,
                path.clone(),
                format!("{path} is required"),
            )
            .suggest(format!("Add the `{name}` field")),
        );
    }
}

/// The field as a string, reporting `INVALID_TYPE` if it is something else.
fn string_field<'a>(
    obj: &'a Map<String, Value>,
    base: &str,
    name: &str,
    report: &mut Report,
) -> Option<&'a str> {
    match obj.get(name)? {
        Value::String(s) => Some(s),
        other => {
            report.error(wrong_type(&field_path(base, name), "string", other));
            None
        }
    }
}

fn non_empty(value: &str, path: &str, report: &mut Report) {
    if value.trim().is_empty() {
        report.error(Diagnostic::new(
            DiagnosticCode::MissingRequiredField,
            path,
            format!("{path} must not be empty"),
        ));
    }
}

fn check_unknown(
    obj: &Map<String, Value>,
    base: &str,
    known: &[&str],
    extra: &BTreeSet<String>,
    report: &mut Report,
) {
    for key in obj.keys() {
        if key.starts_with('_') || known.contains(&key.as_str()) || extra.contains(key) {
            continue;
        }
        report.error(
            Diagnostic::new(
                DiagnosticCode::UnknownField,
                field_path(base, key),
                format!("unknown field {key:?}"),
            )
            .suggest(format!("Prefix custom fields with an underscore, e.g. `_{key}`")),
        );
    }
}

fn check_uri(value: &str, path: &str, report: &mut Report) {
    if Url::parse(value).is_err() {
        report.error(Diagnostic::new(
            DiagnosticCode::InvalidFormat,
            path,
            format!("{value:?} is not a valid URI"),
        ));
    }
}

fn check_https(value: &str, path: &str, report: &mut Report) {
    match Url::parse(value) {
        Err(e) => report.error(
            Diagnostic::new(
                DiagnosticCode::InvalidFormat,
                path,
                format!("{value:?} is not a valid URL: {e}"),
            )
            .suggest("Use an absolute https:// URL"),
        ),
        Ok(url) if url.scheme() != "https" => report.error(
            Diagnostic::new(
                DiagnosticCode::InvalidPattern,
                path,
                format!("{path} must use https, found {}", url.scheme()),
            )
            .with_details(json!({"expected": "https", "found": url.scheme()}))
            .suggest(format!(
                "Use {}",
                value.replacen(&format!("{}://", url.scheme()), "https://", 1)
            )),
        ),
        Ok(_) => {}
    }
}

fn check_date(value: &str, path: &str, report: &mut Report) {
    if DateTime::parse_from_rfc3339(value).is_err() {
        report.error(
            Diagnostic::new(
                DiagnosticCode::InvalidFormat,
                path,
                format!("{value:?} is not an RFC 3339 date"),
            )
            .suggest("Use a timestamp such as 2024-01-01T00:00:00Z"),
        );
    }
}

/// Returns whether the pattern matched.
fn check_envelope_pattern(value: &str, path: &str, report: &mut Report) -> bool {
    if ENVELOPE_RE.is_match(value) {
        return true;
    }
    report.error(
        Diagnostic::new(
            DiagnosticCode::InvalidPattern,
            path,
            format!("expected {ENVELOPE_PREFIX}<base64>"),
        )
        .with_details(json!({"expected_prefix": ENVELOPE_PREFIX})),
    );
    false
}
