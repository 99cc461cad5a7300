// search-core/src/models.rs
//! 数据模型 - 待索引内容与搜索结果

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of weblog content an item is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    #[default]
    Post,
    Comment,
    /// An entry ingested from a Planet subscription
    FeedEntry,
}

impl ContentKind {
    /// Keyword stored in the index; `kind:` queries match it
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Comment => "comment",
            ContentKind::FeedEntry => "entry",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "post" => Some(ContentKind::Post),
            "comment" => Some(ContentKind::Comment),
            "entry" => Some(ContentKind::FeedEntry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublishStatus {
    #[default]
    Published,
    Draft,
    /// Waiting for moderation or a scheduled publish time
    Pending,
}

/// A post, comment or feed entry as the content repository yields it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub kind: ContentKind,
    pub status: PublishStatus,
    /// Handle of the weblog (or Planet group) the item belongs to
    pub site_id: String,
    pub title: String,
    /// Body text, possibly containing HTML markup
    pub body: String,
    pub author: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub permalink: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

impl ContentItem {
    pub fn new(id: impl Into<String>, kind: ContentKind, site_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            site_id: site_id.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_status(mut self, status: PublishStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permalink(mut self, permalink: impl Into<String>) -> Self {
        self.permalink = Some(permalink.into());
        self
    }

    /// Only published items belong in the index
    pub fn is_searchable(&self) -> bool {
        self.status == PublishStatus::Published
    }
}

/// One ranked hit. Callers resolve the identity against their own store.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    pub kind: Option<ContentKind>,
    pub site_id: String,
}

/// Point-in-time figures for the committed index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub num_docs: u64,
    pub num_segments: usize,
}
