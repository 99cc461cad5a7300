// search-core/src/repository.rs
//! Source of truth for indexable content

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::error::RepositoryError;
use crate::models::ContentItem;

/// Page size used when the default `list_site_content_items` scans everything
const SITE_SCAN_PAGE: usize = 500;

/// Yields content items for indexing. Implemented by the weblog's persistence
/// layer and by the Planet store.
pub trait ContentRepository: Send + Sync {
    /// A page of every item, in a stable order.
    fn list_all_content_items(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ContentItem>, RepositoryError>;

    fn get_content_item(&self, id: &str) -> Result<Option<ContentItem>, RepositoryError>;

    /// A page of the items belonging to one site.
    fn list_site_content_items(
        &self,
        site_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ContentItem>, RepositoryError> {
        let mut matched = Vec::new();
        let mut skipped = 0;
        let mut page_start = 0;
        loop {
            let page = self.list_all_content_items(page_start, SITE_SCAN_PAGE)?;
            let page_len = page.len();
            for item in page.into_iter().filter(|item| item.site_id == site_id) {
                if skipped < offset {
                    skipped += 1;
                } else if matched.len() < limit {
                    matched.push(item);
                }
            }
            if matched.len() >= limit || page_len < SITE_SCAN_PAGE {
                return Ok(matched);
            }
            page_start += page_len;
        }
    }
}

/// In-memory repository keyed by identity
#[derive(Clone, Default)]
pub struct MemoryContentRepository {
    items: Arc<RwLock<BTreeMap<String, ContentItem>>>,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: ContentItem) -> Result<(), RepositoryError> {
        self.write()?.insert(item.id.clone(), item);
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<Option<ContentItem>, RepositoryError> {
        Ok(self.write()?.remove(id))
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, ContentItem>>, RepositoryError>
    {
        self.items
            .write()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".into()))
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, ContentItem>>, RepositoryError>
    {
        self.items
            .read()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".into()))
    }
}

impl FromIterator<ContentItem> for MemoryContentRepository {
    fn from_iter<I: IntoIterator<Item = ContentItem>>(iter: I) -> Self {
        let items = iter.into_iter().map(|item| (item.id.clone(), item)).collect();
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }
}

impl ContentRepository for MemoryContentRepository {
    fn list_all_content_items(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ContentItem>, RepositoryError> {
        Ok(self.read()?.values().skip(offset).take(limit).cloned().collect())
    }

    fn get_content_item(&self, id: &str) -> Result<Option<ContentItem>, RepositoryError> {
        Ok(self.read()?.get(id).cloned())
    }
}
