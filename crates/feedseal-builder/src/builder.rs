//! Feed and item construction.
//!
//! Feeds are values: [`DocumentBuilder::add_item`] and
//! [`DocumentBuilder::sign_feed`] return a new feed and leave their input
//! untouched. Items are appended in call order.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use feedseal_core::canonical::{create_signature_data, DocumentKind};
use feedseal_core::crypto::Keypair;
use feedseal_core::document::{
    Attachment, Author, Extensions, Feed, Interactions, Item, MAX_TAGS, PROTOCOL_VERSION,
};
use feedseal_validate::{Diagnostic, DiagnosticCode, ValidationOptions, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::content;
use crate::error::{BuildError, Result};
use crate::tags::normalize_tags;

/// Builder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Target length of derived summaries, in characters.
    pub summary_length: usize,
    /// Maximum tags kept per item.
    pub max_tags: usize,
    /// Version URI written into new feeds.
    pub version: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            summary_length: 200,
            max_tags: MAX_TAGS,
            version: PROTOCOL_VERSION.to_string(),
        }
    }
}

/// Metadata for a new feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMetadata {
    pub title: String,
    pub home_page_url: String,
    pub feed_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    pub author: Author,
    /// Extension fields. Keys without a leading `_` get one.
    #[serde(default)]
    pub extensions: Extensions,
}

impl FeedMetadata {
    pub fn new(
        title: impl Into<String>,
        home_page_url: impl Into<String>,
        feed_url: impl Into<String>,
        author: Author,
    ) -> Self {
        Self {
            title: title.into(),
            home_page_url: home_page_url.into(),
            feed_url: feed_url.into(),
            description: None,
            icon: None,
            language: None,
            author,
            extensions: Extensions::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn extension(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(name.into(), value);
        self
    }

    /// Attach any serializable value as an extension.
    pub fn try_extension<T: Serialize>(self, name: impl Into<String>, value: &T) -> Result<Self> {
        let name = name.into();
        let value = extension_value(&name, value)?;
        Ok(self.extension(name, value))
    }
}

/// Input for one item. Only `url` and some content are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemInput {
    /// Defaults to `url`.
    pub id: Option<String>,
    pub url: String,
    /// Defaults to a fresh v4 UUID.
    pub uuid: Option<String>,
    pub title: Option<String>,
    /// Derived from the content when absent.
    pub summary: Option<String>,
    /// Defaults to now.
    pub date_published: Option<String>,
    pub date_modified: Option<String>,
    pub tags: Vec<String>,
    pub in_reply_to: Option<String>,
    pub content_text: Option<String>,
    pub content_html: Option<String>,
    pub content_markdown: Option<String>,
    /// Defaults to the feed author.
    pub author: Option<Author>,
    pub attachments: Vec<Attachment>,
    pub interactions: Option<Interactions>,
    pub extensions: Extensions,
}

impl ItemInput {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn date_published(mut self, date: impl Into<String>) -> Self {
        self.date_published = Some(date.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.content_text = Some(text.into());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.content_html = Some(html.into());
        self
    }

    pub fn markdown(mut self, markdown: impl Into<String>) -> Self {
        self.content_markdown = Some(markdown.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn reply_to(mut self, target: impl Into<String>) -> Self {
        self.in_reply_to = Some(target.into());
        self
    }

    pub fn author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn extension(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(name.into(), value);
        self
    }

    /// Attach any serializable value as an extension.
    pub fn try_extension<T: Serialize>(self, name: impl Into<String>, value: &T) -> Result<Self> {
        let name = name.into();
        let value = extension_value(&name, value)?;
        Ok(self.extension(name, value))
    }
}

/// Builds, validates and signs feeds.
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    config: BuilderConfig,
    validator: Arc<Validator>,
}

impl DocumentBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            config,
            validator: Arc::new(Validator::new()),
        }
    }

    /// Share an existing validator (and its metrics).
    pub fn with_validator(config: BuilderConfig, validator: Arc<Validator>) -> Self {
        Self { config, validator }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Create an empty, unsigned feed.
    pub fn create_feed(&self, metadata: FeedMetadata) -> Result<Feed> {
        let feed = Feed {
            version: self.config.version.clone(),
            title: metadata.title.trim().to_string(),
            home_page_url: metadata.home_page_url.trim().to_string(),
            feed_url: metadata.feed_url.trim().to_string(),
            description: non_blank(metadata.description),
            icon: non_blank(metadata.icon),
            language: non_blank(metadata.language),
            author: normalize_author(metadata.author),
            items: Vec::new(),
            signature: None,
            extensions: normalize_extensions(metadata.extensions),
        };

        let result = self
            .validator
            .validate_document(&feed.to_value()?, &ValidationOptions::default());
        if !result.valid {
            return Err(BuildError::Validation(result.errors));
        }
        debug!(title = %feed.title, "created feed");
        Ok(feed)
    }

    /// Return a copy of `feed` with a new signed item appended.
    ///
    /// The signing key must belong to the item author, or to the feed author
    /// when the item has none. Any feed signature is dropped, since the feed
    /// content changed.
    pub fn add_item(&self, feed: &Feed, input: ItemInput, private_key: &str) -> Result<Feed> {
        let keypair = Keypair::from_private_envelope(private_key)?;
        let author = input.author.map(normalize_author);
        let expected = author
            .as_ref()
            .map_or(feed.author.public_key.as_str(), |a| a.public_key.as_str());
        check_key(&keypair, expected)?;

        let url = input.url.trim().to_string();
        if url.is_empty() {
            return Err(BuildError::InvalidInput("item url is required".into()));
        }

        let content = content::process(
            input.content_text.as_deref(),
            input.content_html.as_deref(),
            input.content_markdown.as_deref(),
        );
        let title = non_blank(input.title);
        let summary = non_blank(input.summary).or_else(|| {
            content
                .text
                .as_deref()
                .map(|t| content::summarize(t, self.config.summary_length))
                .filter(|s| !s.is_empty())
        });
        let tags = normalize_tags(&input.tags, self.config.max_tags);

        let mut item = Item {
            id: non_blank(input.id).unwrap_or_else(|| url.clone()),
            url,
            uuid: Some(non_blank(input.uuid).unwrap_or_else(|| Uuid::new_v4().to_string())),
            title,
            summary,
            date_published: non_blank(input.date_published).unwrap_or_else(now),
            date_modified: non_blank(input.date_modified),
            tags: (!tags.is_empty()).then_some(tags),
            in_reply_to: non_blank(input.in_reply_to),
            content_text: content.text,
            content_html: content.html,
            content_markdown: content.markdown,
            author,
            attachments: (!input.attachments.is_empty()).then_some(input.attachments),
            interactions: input.interactions,
            signature: None,
            extensions: normalize_extensions(input.extensions),
        };

        let value = serde_json::to_value(&item).map_err(feedseal_core::CoreError::from)?;
        let result = self
            .validator
            .validate_item(&value, &ValidationOptions::default());
        if !result.valid {
            return Err(BuildError::Validation(result.errors));
        }

        let data = create_signature_data(&value, DocumentKind::Item);
        item.signature = Some(keypair.sign(data.as_bytes()).to_envelope());

        let mut next = feed.clone();
        next.signature = None;
        debug!(id = %item.id, position = next.items.len(), "appending item");
        next.items.push(item);
        Ok(next)
    }

    /// Return a copy of `feed` carrying a feed signature.
    pub fn sign_feed(&self, feed: &Feed, private_key: &str) -> Result<Feed> {
        let keypair = Keypair::from_private_envelope(private_key)?;
        check_key(&keypair, &feed.author.public_key)?;

        let mut signed = feed.clone();
        signed.signature = None;
        let value = signed.to_value()?;
        let result = self
            .validator
            .validate_document(&value, &ValidationOptions::default());
        if !result.valid {
            return Err(BuildError::Validation(result.errors));
        }

        let data = create_signature_data(&value, DocumentKind::Feed);
        signed.signature = Some(keypair.sign(data.as_bytes()).to_envelope());
        debug!(items = signed.items.len(), "signed feed");
        Ok(signed)
    }

    /// Create a feed, append every item in order, then sign the feed.
    pub fn create_complete_feed(
        &self,
        metadata: FeedMetadata,
        items: Vec<ItemInput>,
        private_key: &str,
    ) -> Result<Feed> {
        let mut feed = self.create_feed(metadata)?;
        for input in items {
            feed = self.add_item(&feed, input, private_key)?;
        }
        self.sign_feed(&feed, private_key)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_author(author: Author) -> Author {
    Author {
        name: author.name.trim().to_string(),
        public_key: author.public_key.trim().to_string(),
        url: non_blank(author.url),
        avatar: non_blank(author.avatar),
        extensions: normalize_extensions(author.extensions),
    }
}

/// Prefix extension names with `_` where missing.
/// Extension values must serialize to JSON.
fn extension_value<T: Serialize>(name: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| {
        BuildError::Validation(vec![Diagnostic::new(
            DiagnosticCode::InvalidExtensionFieldValue,
            name,
            format!("extension value is not serializable to JSON: {e}"),
        )])
    })
}

fn normalize_extensions(extensions: Extensions) -> Extensions {
    extensions
        .into_iter()
        .map(|(k, v)| {
            if k.starts_with('_') {
                (k, v)
            } else {
                (format!("_{k}"), v)
            }
        })
        .collect()
}

fn check_key(keypair: &Keypair, expected: &str) -> Result<()> {
    let found = keypair.public_key().to_envelope();
    if found != expected {
        return Err(BuildError::KeyMismatch {
            expected: expected.to_string(),
            found,
        });
    }
    Ok(())
}

/// [`DocumentBuilder::create_feed`] with default settings.
pub fn create_feed(metadata: FeedMetadata) -> Result<Feed> {
    DocumentBuilder::default().create_feed(metadata)
}

/// [`DocumentBuilder::add_item`] with default settings.
pub fn add_item(feed: &Feed, input: ItemInput, private_key: &str) -> Result<Feed> {
    DocumentBuilder::default().add_item(feed, input, private_key)
}

/// [`DocumentBuilder::sign_feed`] with default settings.
pub fn sign_feed(feed: &Feed, private_key: &str) -> Result<Feed> {
    DocumentBuilder::default().sign_feed(feed, private_key)
}

/// [`DocumentBuilder::create_complete_feed`] with default settings.
pub fn create_complete_feed(
    metadata: FeedMetadata,
    items: Vec<ItemInput>,
    private_key: &str,
) -> Result<Feed> {
    DocumentBuilder::default().create_complete_feed(metadata, items, private_key)
}
