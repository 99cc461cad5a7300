// planet/src/entry.rs
//! Parsed feed entries and their stable identities

use chrono::{DateTime, Utc};
use search_core::{ContentItem, ContentKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::subscription::Subscription;

/// One item of a parsed feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub permalink: Option<String>,
    /// RSS guid or Atom id
    pub guid: Option<String>,
    pub published: Option<DateTime<Utc>>,
    /// Body, possibly HTML
    pub content: String,
    pub author: String,
    pub categories: Vec<String>,
    pub comment_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

/// An ingested entry as the planet store keeps it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub subscription_id: String,
    pub fingerprint: String,
    pub comment_count: Option<u32>,
    pub item: ContentItem,
}

impl StoredEntry {
    pub fn id(&self) -> &str {
        &self.item.id
    }

    /// Whether `fresh` carries anything the index has not seen
    pub fn differs_from(&self, fresh: &StoredEntry) -> bool {
        self.fingerprint != fresh.fingerprint || self.comment_count != fresh.comment_count
    }
}

/// Hex SHA-256 over the parts, each terminated by a NUL byte
pub(crate) fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

impl FeedEntry {
    /// Permalink, falling back to the guid
    pub fn key(&self) -> Option<&str> {
        self.permalink
            .as_deref()
            .or(self.guid.as_deref())
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Identity of this entry within a subscription. `None` when the entry
    /// has neither a permalink nor a guid.
    pub fn identity(&self, subscription_id: &str) -> Option<String> {
        self.key()
            .map(|key| format!("entry-{}", &digest(&[subscription_id, key])[..32]))
    }

    /// Digest of everything that is indexed
    pub fn fingerprint(&self) -> String {
        let categories = self.categories.join("\u{1f}");
        let published = self.published.map(|p| p.to_rfc3339()).unwrap_or_default();
        digest(&[
            self.title.as_str(),
            self.content.as_str(),
            self.author.as_str(),
            categories.as_str(),
            published.as_str(),
        ])
    }

    /// Record to persist and index, or `None` without a usable key
    pub fn to_stored(&self, subscription: &Subscription, fetched_at: DateTime<Utc>) -> Option<StoredEntry> {
        let id = self.identity(&subscription.id)?;
        let mut item = ContentItem::new(id, ContentKind::FeedEntry, subscription.site_id.clone())
            .with_title(self.title.clone())
            .with_body(self.content.clone())
            .with_author(self.author.clone())
            .with_categories(self.categories.iter().cloned())
            .with_published(self.published.unwrap_or(fetched_at));
        if let Some(key) = self.key() {
            item = item.with_permalink(key);
        }
        Some(StoredEntry {
            subscription_id: subscription.id.clone(),
            fingerprint: self.fingerprint(),
            comment_count: self.comment_count,
            item,
        })
    }
}
