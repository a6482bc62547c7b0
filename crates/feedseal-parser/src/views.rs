//! Results of the cheap parse modes: metadata only and content only.

use std::collections::BTreeMap;

use feedseal_validate::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primary content type of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Html,
    Markdown,
    /// No content field, only a title.
    TitleOnly,
}

impl ContentType {
    /// Markdown if present, else HTML, else text, else title only.
    pub fn of(item: &Map<String, Value>) -> Self {
        let has = |name: &str| item.get(name).and_then(Value::as_str).is_some();
        if has("content_markdown") {
            ContentType::Markdown
        } else if has("content_html") {
            ContentType::Html
        } else if has("content_text") {
            ContentType::Text
        } else {
            ContentType::TitleOnly
        }
    }

    /// The item field this type keeps, if any.
    pub fn field(self) -> Option<&'static str> {
        match self {
            ContentType::Text => Some("content_text"),
            ContentType::Html => Some("content_html"),
            ContentType::Markdown => Some("content_markdown"),
            ContentType::TitleOnly => None,
        }
    }
}

/// Author name and key, without validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub name: Option<String>,
    pub public_key: Option<String>,
}

/// Earliest and latest `date_published`, as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: String,
    pub latest: String,
}

/// Feed-level facts gathered without reading content or checking signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMetadataView {
    pub title: String,
    pub version: Option<String>,
    pub home_page_url: Option<String>,
    pub feed_url: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub author: Option<AuthorSummary>,
    pub item_count: usize,
    pub date_range: Option<DateRange>,
    pub has_feed_signature: bool,
    pub signed_items: usize,
}

/// Outcome of [`Parser::parse_metadata_only`](crate::Parser::parse_metadata_only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataResult {
    pub success: bool,
    pub metadata: Option<FeedMetadataView>,
    pub errors: Vec<Diagnostic>,
}

/// Content fields of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemContent {
    pub id: Option<String>,
    pub title: Option<String>,
    pub content_type: ContentType,
    pub content_text: Option<String>,
    pub content_html: Option<String>,
    pub content_markdown: Option<String>,
}

/// Outcome of [`Parser::parse_content_only`](crate::Parser::parse_content_only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentResult {
    pub success: bool,
    pub items: Vec<ItemContent>,
    /// Items per primary content type.
    pub content_types: BTreeMap<ContentType, usize>,
    pub errors: Vec<Diagnostic>,
}
