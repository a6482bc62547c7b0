//! Typed document model: feeds, items, authors and attachments.
//!
//! Extension fields (keys starting with `_`) are carried opaquely in a
//! flattened `extensions` map on every object that allows them. Optional
//! fields are skipped when absent so that serializing a value reproduces the
//! exact field set that was signed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::canonical::{create_signature_data, DocumentKind};
use crate::error::Result;

/// Document version URI written by the builder.
pub const PROTOCOL_VERSION: &str = "https://jsonfeed.org/version/1.1";

/// Maximum number of tags on one item.
pub const MAX_TAGS: usize = 20;

/// Opaque `_`-prefixed fields.
pub type Extensions = BTreeMap<String, Value>;

/// The author of a feed or item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    /// `ed25519:<base64>` public key envelope.
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A media attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_in_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Kept as the JSON number it arrived as, so `5` stays `5`.
    pub duration_in_seconds: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Attachment {
    /// Whether the MIME type is an image type.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_in_seconds.as_ref().and_then(Number::as_f64)
    }
}

/// Social interaction counters and endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interactions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_url: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A signed content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub date_published: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactions: Option<Interactions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Item {
    /// Canonical bytes the item signature covers.
    pub fn signature_data(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        Ok(create_signature_data(&value, DocumentKind::Item))
    }

    /// Whether the item has any content field.
    pub fn has_content(&self) -> bool {
        self.content_text.is_some() || self.content_html.is_some() || self.content_markdown.is_some()
    }

    /// Tags, or an empty slice.
    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }

    /// Attachments, or an empty slice.
    pub fn attachments(&self) -> &[Attachment] {
        self.attachments.as_deref().unwrap_or(&[])
    }
}

/// A feed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub version: String,
    pub title: String,
    pub home_page_url: String,
    pub feed_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub author: Author,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Feed {
    /// Convert to a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Convert from a JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Canonical bytes the feed signature covers.
    pub fn signature_data(&self) -> Result<String> {
        Ok(create_signature_data(&self.to_value()?, DocumentKind::Feed))
    }

    /// Remove every `_`-prefixed field, at every level.
    pub fn strip_extensions(&mut self) {
        self.extensions.clear();
        self.author.extensions.clear();
        for item in &mut self.items {
            item.extensions.clear();
            if let Some(author) = &mut item.author {
                author.extensions.clear();
            }
            for attachment in item.attachments.iter_mut().flatten() {
                attachment.extensions.clear();
            }
            if let Some(interactions) = &mut item.interactions {
                interactions.extensions.clear();
            }
        }
    }
}
