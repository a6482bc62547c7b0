//! Item selection over a parsed feed.

use chrono::{DateTime, FixedOffset};
use feedseal_core::document::{Feed, Item};
use serde::{Deserialize, Serialize};

/// Criteria for [`get_items`]. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemFilter {
    /// Match items carrying any of these tags (case-insensitive).
    pub tags: Vec<String>,
    /// RFC 3339; items published at or after.
    pub since: Option<String>,
    /// RFC 3339; items published at or before.
    pub until: Option<String>,
    /// Author name or public key. Items without an author match on the feed
    /// author.
    pub author: Option<String>,
    pub limit: Option<usize>,
}

impl ItemFilter {
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn since(mut self, date: impl Into<String>) -> Self {
        self.since = Some(date.into());
        self
    }

    pub fn until(mut self, date: impl Into<String>) -> Self {
        self.until = Some(date.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// Items of `feed` matching `filter`, in feed order.
///
/// Unparseable `since`/`until` bounds are ignored; items whose
/// `date_published` does not parse never match a date bound.
pub fn get_items<'a>(feed: &'a Feed, filter: &ItemFilter) -> Vec<&'a Item> {
    let since = filter.since.as_deref().and_then(parse_date);
    let until = filter.until.as_deref().and_then(parse_date);
    let wanted_tags: Vec<String> = filter.tags.iter().map(|t| t.to_lowercase()).collect();

    let matches = |item: &Item| -> bool {
        if !wanted_tags.is_empty()
            && !item
                .tags()
                .iter()
                .any(|t| wanted_tags.contains(&t.to_lowercase()))
        {
            return false;
        }

        if since.is_some() || until.is_some() {
            let Some(published) = parse_date(&item.date_published) else {
                return false;
            };
            if since.is_some_and(|s| published < s) || until.is_some_and(|u| published > u) {
                return false;
            }
        }

        if let Some(wanted) = filter.author.as_deref() {
            let author = item.author.as_ref().unwrap_or(&feed.author);
            if author.name != wanted && author.public_key != wanted {
                return false;
            }
        }
        true
    };

    feed.items
        .iter()
        .filter(|item| matches(*item))
        .take(filter.limit.unwrap_or(usize::MAX))
        .collect()
}
