//! Business rules.
//!
//! Each rule is a pure function over a read-only view that returns the
//! diagnostics it found. Rules never assume the structural pass succeeded:
//! a field with the wrong type is simply skipped.

use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::diagnostic::{field_path, index_path, Diagnostic, DiagnosticCode};
use crate::view::{DocumentView, ItemIndex, ItemView};

lazy_static! {
    static ref EXTENSION_NAME_RE: Regex =
        Regex::new(r"^_[A-Za-z][A-Za-z0-9_]*$").expect("extension name pattern");
}

pub type DocumentRule = fn(&DocumentView<'_>, &ItemIndex<'_>) -> Vec<Diagnostic>;
pub type ItemRule = fn(&ItemView<'_>) -> Vec<Diagnostic>;

/// Rules that look across the whole document.
pub const DOCUMENT_RULES: &[(&str, DocumentRule)] = &[
    ("duplicate_item_ids", duplicate_item_ids),
    ("feed_extensions", feed_extensions),
];

/// Rules that look at one item at a time.
pub const ITEM_RULES: &[(&str, ItemRule)] = &[
    ("date_order", date_order),
    ("self_reply", self_reply),
    ("attachment_size", attachment_size),
    ("attachment_dimensions", attachment_dimensions),
    ("attachment_duration", attachment_duration),
    ("item_extensions", item_extensions),
];

/// Run every rule over a document.
pub fn check_document(doc: &DocumentView<'_>) -> Vec<Diagnostic> {
    let index = ItemIndex::build(doc);
    let mut out: Vec<Diagnostic> = DOCUMENT_RULES
        .iter()
        .flat_map(|(_, rule)| rule(doc, &index))
        .collect();
    for item in doc.items() {
        out.extend(check_item(&item));
    }
    out
}

/// Run the item rules over one item.
pub fn check_item(item: &ItemView<'_>) -> Vec<Diagnostic> {
    ITEM_RULES.iter().flat_map(|(_, rule)| rule(item)).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Document rules
// ─────────────────────────────────────────────────────────────────────────────

fn duplicate_item_ids(_doc: &DocumentView<'_>, index: &ItemIndex<'_>) -> Vec<Diagnostic> {
    index
        .duplicates()
        .into_iter()
        .map(|(id, first, later)| {
            Diagnostic::new(
                DiagnosticCode::DuplicateItemId,
                field_path(&index_path("items", later), "id"),
                format!("item id {id:?} already used by items[{first}]"),
            )
            .with_details(json!({"id": id, "first_index": first}))
            .suggest("Give every item a unique id")
        })
        .collect()
}

fn feed_extensions(doc: &DocumentView<'_>, _index: &ItemIndex<'_>) -> Vec<Diagnostic> {
    let mut out = extension_diagnostics(doc.fields(), "");
    if let Some(author) = doc.author() {
        out.extend(extension_diagnostics(author, "author"));
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Item rules
// ─────────────────────────────────────────────────────────────────────────────

fn parse_date(value: Option<&str>) -> Option<DateTime<FixedOffset>> {
    value.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

fn date_order(item: &ItemView<'_>) -> Vec<Diagnostic> {
    let published = parse_date(item.str_field("date_published"));
    let modified = parse_date(item.str_field("date_modified"));
    match (published, modified) {
        (Some(p), Some(m)) if m < p => vec![Diagnostic::new(
            DiagnosticCode::InvalidDateOrder,
            item.path("date_modified"),
            "date_modified is earlier than date_published",
        )
        .with_details(json!({"date_published": p.to_rfc3339(), "date_modified": m.to_rfc3339()}))],
        _ => Vec::new(),
    }
}

fn self_reply(item: &ItemView<'_>) -> Vec<Diagnostic> {
    match (item.id(), item.str_field("in_reply_to")) {
        (Some(id), Some(target)) if id == target => vec![Diagnostic::new(
            DiagnosticCode::SelfReply,
            item.path("in_reply_to"),
            "item replies to itself",
        )
        .suggest("Point in_reply_to at another item or remove it")],
        _ => Vec::new(),
    }
}

/// Numeric attachment fields matching `bad`, as diagnostics.
fn attachment_numbers(
    item: &ItemView<'_>,
    fields: &[&str],
    code: DiagnosticCode,
    bad: fn(f64) -> bool,
    message: &str,
) -> Vec<Diagnostic> {
    let base = item.path("attachments");
    let mut out = Vec::new();
    for (i, att) in item.attachments() {
        for name in fields {
            let Some(n) = att.get(*name).and_then(Value::as_f64) else {
                continue;
            };
            if bad(n) {
                out.push(
                    Diagnostic::new(
                        code,
                        field_path(&index_path(&base, i), name),
                        format!("{name} {message}, found {n}"),
                    )
                    .with_details(json!({"value": n})),
                );
            }
        }
    }
    out
}

fn attachment_size(item: &ItemView<'_>) -> Vec<Diagnostic> {
    attachment_numbers(
        item,
        &["size_in_bytes"],
        DiagnosticCode::InvalidFileSize,
        |n| n < 0.0,
        "must not be negative",
    )
}

fn attachment_dimensions(item: &ItemView<'_>) -> Vec<Diagnostic> {
    attachment_numbers(
        item,
        &["width", "height"],
        DiagnosticCode::InvalidImageDimensions,
        |n| n <= 0.0 || n > f64::from(u32::MAX),
        "must be a positive pixel count",
    )
}

fn attachment_duration(item: &ItemView<'_>) -> Vec<Diagnostic> {
    attachment_numbers(
        item,
        &["duration_in_seconds"],
        DiagnosticCode::InvalidDuration,
        |n| n < 0.0,
        "must not be negative",
    )
}

fn item_extensions(item: &ItemView<'_>) -> Vec<Diagnostic> {
    let base = item.base_path();
    let mut out = extension_diagnostics(item.fields(), &base);
    if let Some(author) = item.author() {
        out.extend(extension_diagnostics(author, &field_path(&base, "author")));
    }
    let attachments = field_path(&base, "attachments");
    for (i, att) in item.attachments() {
        out.extend(extension_diagnostics(att, &index_path(&attachments, i)));
    }
    if let Some(inter) = item.get("interactions").and_then(Value::as_object) {
        out.extend(extension_diagnostics(inter, &field_path(&base, "interactions")));
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Extension fields
// ─────────────────────────────────────────────────────────────────────────────

/// Check the `_`-prefixed keys of one object. Only names are checked; values
/// are opaque.
pub fn extension_diagnostics(obj: &Map<String, Value>, base: &str) -> Vec<Diagnostic> {
    obj.keys()
        .filter(|k| k.starts_with('_') && !EXTENSION_NAME_RE.is_match(k))
        .map(|key| {
            Diagnostic::new(
                DiagnosticCode::InvalidExtensionFieldName,
                field_path(base, key),
                format!("extension field {key:?} must match _[A-Za-z][A-Za-z0-9_]*"),
            )
            .suggest("Start with an underscore and a letter, then letters, digits or underscores")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(extra: Value) -> Value {
        let mut base = json!({
            "id": "https://a/1",
            "url": "https://a/1",
            "date_published": "2024-01-02T00:00:00Z",
            "title": "t"
        });
        if let (Some(b), Some(e)) = (base.as_object_mut(), extra.as_object()) {
            b.extend(e.clone());
        }
        base
    }

    fn run_item(value: &Value) -> Vec<(DiagnosticCode, String)> {
        let view = ItemView::standalone(value).unwrap();
        check_item(&view).into_iter().map(|d| (d.code, d.field)).collect()
    }

    #[test]
    fn test_duplicate_ids_flag_later_occurrences() {
        let doc = json!({"items": [
            {"id": "https://a/1"}, {"id": "https://a/2"}, {"id": "https://a/1"}
        ]});
        let view = DocumentView::new(&doc).unwrap();
        let found: Vec<_> = check_document(&view)
            .into_iter()
            .filter(|d| d.code == DiagnosticCode::DuplicateItemId)
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field, "items[2].id");
        assert_eq!(found[0].details["first_index"], json!(0));
    }

    #[test]
    fn test_date_order() {
        let bad = item(json!({"date_modified": "2024-01-01T00:00:00Z"}));
        assert_eq!(
            run_item(&bad),
            vec![(DiagnosticCode::InvalidDateOrder, "date_modified".into())]
        );
        // Same instant in a different offset is not earlier
        let same = item(json!({"date_modified": "2024-01-02T01:00:00+01:00"}));
        assert!(run_item(&same).is_empty());
    }

    #[test]
    fn test_self_reply() {
        let value = item(json!({"in_reply_to": "https://a/1"}));
        assert_eq!(run_item(&value), vec![(DiagnosticCode::SelfReply, "in_reply_to".into())]);
    }

    #[test]
    fn test_attachment_numbers() {
        let value = item(json!({"attachments": [
            {"url": "https://a/v", "mime_type": "video/mp4",
             "size_in_bytes": -1, "width": 0, "height": 10, "duration_in_seconds": -2.5}
        ]}));
        assert_eq!(
            run_item(&value),
            vec![
                (DiagnosticCode::InvalidFileSize, "attachments[0].size_in_bytes".into()),
                (DiagnosticCode::InvalidImageDimensions, "attachments[0].width".into()),
                (DiagnosticCode::InvalidDuration, "attachments[0].duration_in_seconds".into()),
            ]
        );
    }

    #[test]
    fn test_extension_names() {
        let value = item(json!({"_ok_name": 1, "_9bad": 2, "__x": 3}));
        let found = run_item(&value);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|(c, _)| *c == DiagnosticCode::InvalidExtensionFieldName));
    }

    #[test]
    fn test_chain_fields_are_valid_extension_names() {
        let value = item(json!({"_chainIndex": 0, "_previousHash": "ab", "_timestamp": "t"}));
        assert!(run_item(&value).is_empty());
    }

    #[test]
    fn test_extension_values_are_opaque() {
        let mut deep = json!(1);
        for _ in 0..64 {
            deep = json!([deep]);
        }
        let big = "x".repeat(256 * 1024);
        let value = item(json!({"_deep": deep, "_big": big, "_null": null}));
        assert!(run_item(&value).is_empty());
    }

    #[test]
    fn test_nested_extension_paths() {
        let doc = json!({
            "author": {"name": "A", "_1": true},
            "items": [{"id": "https://a/1", "attachments": [{"_-x": 1}]}]
        });
        let view = DocumentView::new(&doc).unwrap();
        let fields: Vec<_> = check_document(&view).into_iter().map(|d| d.field).collect();
        assert_eq!(fields, vec!["author._1", "items[0].attachments[0]._-x"]);
    }

    #[test]
    fn test_rules_tolerate_wrong_types() {
        let value = json!({"date_published": 5, "attachments": "nope", "in_reply_to": []});
        assert!(run_item(&value).is_empty());
    }
}
