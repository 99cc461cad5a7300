// search-core/src/operations.rs
//! 索引写操作
//!
//! Each operation opens a write handle, mutates, commits and releases it.
//! Failures roll back; nothing is partially committed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::config::{RetryPolicy, validate_batch_size};
use crate::error::{IndexError, MappingError};
use crate::mapper::map_to_document;
use crate::models::ContentItem;
use crate::repository::ContentRepository;
use crate::schema::SearchDocument;
use crate::store::{IndexStore, WriteHandle};

/// Shared flag a rebuild checks between batches
pub type CancelFlag = Arc<AtomicBool>;

#[derive(Debug, Clone, PartialEq)]
pub enum IndexOperation {
    /// Append without a uniqueness check
    Add(SearchDocument),
    /// Replace every document sharing the identity
    Update(SearchDocument),
    Delete(String),
    RemoveSite(String),
}

impl IndexOperation {
    pub fn execute(&self, store: &IndexStore) -> Result<(), IndexError> {
        let mut handle = store.open_for_write()?;
        self.apply(&mut handle)?;
        handle.commit()
    }

    /// Execute, retrying while the writer is held elsewhere
    pub fn execute_with_retry(
        &self,
        store: &IndexStore,
        policy: &RetryPolicy,
    ) -> Result<(), IndexError> {
        let mut handle = store.open_for_write_with_retry(policy)?;
        self.apply(&mut handle)?;
        handle.commit()
    }

    fn apply(&self, handle: &mut WriteHandle<'_>) -> Result<(), IndexError> {
        match self {
            IndexOperation::Add(doc) => handle.add_document(doc),
            IndexOperation::Update(doc) => {
                let id = doc.identity().ok_or(MappingError::MissingIdentity)?;
                handle.delete_by_identity(id)?;
                handle.add_document(doc)
            }
            IndexOperation::Delete(id) => handle.delete_by_identity(id),
            IndexOperation::RemoveSite(site_id) => handle.delete_by_site(site_id),
        }
    }
}

pub fn add_document(store: &IndexStore, doc: SearchDocument) -> Result<(), IndexError> {
    IndexOperation::Add(doc).execute(store)
}

pub fn update_document(store: &IndexStore, doc: SearchDocument) -> Result<(), IndexError> {
    IndexOperation::Update(doc).execute(store)
}

pub fn delete_by_identity(store: &IndexStore, id: &str) -> Result<(), IndexError> {
    IndexOperation::Delete(id.to_string()).execute(store)
}

pub fn remove_site(store: &IndexStore, site_id: &str) -> Result<(), IndexError> {
    info!(site = site_id, "Removing site from index");
    IndexOperation::RemoveSite(site_id.to_string()).execute(store)
}

/// Update several documents under one handle and one commit.
pub fn update_documents(
    store: &IndexStore,
    docs: &[SearchDocument],
    policy: &RetryPolicy,
) -> Result<usize, IndexError> {
    if docs.is_empty() {
        return Ok(0);
    }
    let mut handle = store.open_for_write_with_retry(policy)?;
    for doc in docs {
        IndexOperation::Update(doc.clone()).apply(&mut handle)?;
    }
    handle.commit()?;
    Ok(docs.len())
}

/// Save hook: index a published item, drop anything else under its identity.
pub fn reindex_item<R>(store: &IndexStore, repo: &R, id: &str) -> Result<(), IndexError>
where
    R: ContentRepository + ?Sized,
{
    let policy = store.config().write_retry;
    match repo.get_content_item(id)? {
        Some(item) if item.is_searchable() => {
            let doc = map_to_document(&item)?;
            IndexOperation::Update(doc).execute_with_retry(store, &policy)
        }
        _ => {
            debug!(id, "Item missing or unpublished, removing from index");
            IndexOperation::Delete(id.to_string()).execute_with_retry(store, &policy)
        }
    }
}

/// Delete hook
pub fn remove_item(store: &IndexStore, id: &str) -> Result<(), IndexError> {
    let policy = store.config().write_retry;
    IndexOperation::Delete(id.to_string()).execute_with_retry(store, &policy)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildProgress {
    pub batches: usize,
    pub indexed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub batches: usize,
    pub indexed: usize,
    /// Unpublished items and items the mapper rejected
    pub skipped: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy)]
enum RebuildScope<'a> {
    All,
    Site(&'a str),
}

/// Clear the index and re-add every published item from the repository.
///
/// Commits once per batch. When `cancel` is raised the rebuild stops after
/// the current batch and the store keeps reporting `needs_rebuild`.
pub fn rebuild_all<R, F>(
    store: &IndexStore,
    repo: &R,
    cancel: &AtomicBool,
    progress: F,
) -> Result<RebuildReport, IndexError>
where
    R: ContentRepository + ?Sized,
    F: FnMut(RebuildProgress),
{
    rebuild(store, repo, RebuildScope::All, cancel, progress)
}

/// Remove one site's documents and re-add its published items.
pub fn rebuild_site<R, F>(
    store: &IndexStore,
    repo: &R,
    site_id: &str,
    cancel: &AtomicBool,
    progress: F,
) -> Result<RebuildReport, IndexError>
where
    R: ContentRepository + ?Sized,
    F: FnMut(RebuildProgress),
{
    rebuild(store, repo, RebuildScope::Site(site_id), cancel, progress)
}

fn rebuild<R, F>(
    store: &IndexStore,
    repo: &R,
    scope: RebuildScope<'_>,
    cancel: &AtomicBool,
    mut progress: F,
) -> Result<RebuildReport, IndexError>
where
    R: ContentRepository + ?Sized,
    F: FnMut(RebuildProgress),
{
    let batch_size = store.config().rebuild_batch_size;
    validate_batch_size(batch_size)?;

    let mut handle = store.open_for_write_with_retry(&store.config().write_retry)?;
    store.set_rebuild_marker(true)?;
    info!(?scope, batch_size, "Index rebuild started");

    match scope {
        RebuildScope::All => handle.delete_all()?,
        RebuildScope::Site(site_id) => handle.delete_by_site(site_id)?,
    }

    let mut report = RebuildReport::default();
    let mut offset = 0;
    loop {
        if cancel.load(Ordering::Acquire) {
            handle.commit()?;
            report.cancelled = true;
            warn!(indexed = report.indexed, "Index rebuild cancelled, index is incomplete");
            return Ok(report);
        }

        let items = match scope {
            RebuildScope::All => repo.list_all_content_items(offset, batch_size)?,
            RebuildScope::Site(site_id) => {
                repo.list_site_content_items(site_id, offset, batch_size)?
            }
        };
        let fetched = items.len();
        if fetched == 0 && report.batches > 0 {
            break;
        }
        offset += fetched;

        add_batch(&mut handle, &items, &mut report)?;
        handle.checkpoint()?;
        report.batches += 1;
        progress(RebuildProgress {
            batches: report.batches,
            indexed: report.indexed,
            skipped: report.skipped,
        });

        if fetched < batch_size {
            break;
        }
    }

    handle.commit()?;
    store.set_rebuild_marker(false)?;
    info!(
        batches = report.batches,
        indexed = report.indexed,
        skipped = report.skipped,
        "Index rebuild finished"
    );
    Ok(report)
}

fn add_batch(
    handle: &mut WriteHandle<'_>,
    items: &[ContentItem],
    report: &mut RebuildReport,
) -> Result<(), IndexError> {
    for item in items {
        if !item.is_searchable() {
            report.skipped += 1;
            continue;
        }
        match map_to_document(item) {
            Ok(doc) => {
                handle.add_document(&doc)?;
                report.indexed += 1;
            }
            Err(e) => {
                warn!(id = %item.id, error = %e, "Skipping unmappable item");
                report.skipped += 1;
            }
        }
    }
    Ok(())
}
