// search-core/src/store.rs
//! 索引存储模块
//!
//! `IndexStore` owns the index directory, the analyzer, the single writer and
//! the shared reader. Writers are handed out one at a time as `WriteHandle`s;
//! readers get point-in-time `ReadHandle` snapshots.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use tantivy::collector::Count;
use tantivy::directory::MmapDirectory;
use tantivy::query::TermQuery;
use tantivy::schema::IndexRecordOption;
use tantivy::tokenizer::TextAnalyzer;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, Term};
use tracing::{debug, error, info, warn};

use crate::config::{IndexConfig, RetryPolicy};
use crate::error::IndexError;
use crate::models::IndexStats;
use crate::schema::{SchemaFields, SearchDocument, build_schema, register_analyzer};

/// Left in the index directory while a rebuild is under way
pub const REBUILD_MARKER_FILE: &str = ".rebuild-in-progress";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Open,
    /// A write handle is outstanding
    Writing,
    Closed,
}

enum WriterSlot {
    /// No handle is out. The writer, and tantivy's directory lock with it,
    /// only exists while a `WriteHandle` is held.
    Vacant,
    Ready(IndexWriter),
    Closed,
}

pub struct IndexStore {
    index: Index,
    reader: IndexReader,
    fields: SchemaFields,
    analyzer: TextAnalyzer,
    writer: Mutex<WriterSlot>,
    closed: AtomicBool,
    config: IndexConfig,
    /// None for in-memory indexes
    location: Option<PathBuf>,
    /// Rebuild marker for in-memory indexes
    rebuilding: AtomicBool,
}

impl IndexStore {
    /// Open the index at `config.storage_path`, creating it when missing.
    pub fn open(config: IndexConfig) -> Result<Self, IndexError> {
        config.validate()?;
        let path = config.storage_path.clone();
        std::fs::create_dir_all(&path)?;

        let index = Index::open_or_create(MmapDirectory::open(&path)?, build_schema())?;
        let shown = path.display().to_string();
        let store = Self::from_index(index, config, Some(path))?;
        info!(path = %shown, docs = store.stats().num_docs, "Opened search index");
        Ok(store)
    }

    /// An index that lives only as long as the store
    pub fn create_in_ram(config: IndexConfig) -> Result<Self, IndexError> {
        config.validate()?;
        let index = Index::create_in_ram(build_schema());
        Self::from_index(index, config, None)
    }

    fn from_index(
        index: Index,
        config: IndexConfig,
        location: Option<PathBuf>,
    ) -> Result<Self, IndexError> {
        let analyzer = register_analyzer(&index, config.tokenizer);
        let fields = SchemaFields::from_schema(&index.schema())?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            fields,
            analyzer,
            writer: Mutex::new(WriterSlot::Vacant),
            closed: AtomicBool::new(false),
            config,
            location,
            rebuilding: AtomicBool::new(false),
        })
    }

    pub fn fields(&self) -> &SchemaFields {
        &self.fields
    }

    pub fn analyzer(&self) -> &TextAnalyzer {
        &self.analyzer
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn state(&self) -> StoreState {
        if self.closed.load(Ordering::Acquire) {
            return StoreState::Closed;
        }
        match self.writer.try_lock() {
            Ok(_) => StoreState::Open,
            Err(TryLockError::WouldBlock) => StoreState::Writing,
            Err(TryLockError::Poisoned(_)) => StoreState::Open,
        }
    }

    /// Take the writer. Fails with `Locked` rather than waiting.
    pub fn open_for_write(&self) -> Result<WriteHandle<'_>, IndexError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(IndexError::Closed);
        }
        let mut guard = match self.writer.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(IndexError::Locked),
            Err(TryLockError::Poisoned(poisoned)) => {
                warn!("Index writer mutex poisoned, recovering");
                poisoned.into_inner()
            }
        };

        if matches!(*guard, WriterSlot::Closed) {
            return Err(IndexError::Closed);
        }
        if matches!(*guard, WriterSlot::Vacant) {
            let writer = self
                .index
                .writer_with_num_threads(self.config.writer_threads, self.config.writer_memory)?;
            debug!(threads = self.config.writer_threads, "Created index writer");
            *guard = WriterSlot::Ready(writer);
        }

        Ok(WriteHandle {
            store: self,
            guard,
            finished: false,
        })
    }

    /// `open_for_write`, sleeping between attempts while the index is locked.
    pub fn open_for_write_with_retry(
        &self,
        policy: &RetryPolicy,
    ) -> Result<WriteHandle<'_>, IndexError> {
        let attempts = policy.attempts.max(1);
        let mut retry = 0;
        loop {
            match self.open_for_write() {
                Err(e) if e.is_retryable() && retry + 1 < attempts => {
                    let delay = policy.backoff(retry);
                    debug!(retry, ?delay, "Index locked, backing off");
                    std::thread::sleep(delay);
                    retry += 1;
                }
                other => return other,
            }
        }
    }

    /// A snapshot of the last commit
    pub fn open_for_read(&self) -> Result<ReadHandle, IndexError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(IndexError::Closed);
        }
        Ok(ReadHandle {
            reader: self.reader.clone(),
            searcher: self.reader.searcher(),
        })
    }

    /// Wait for any active writer, release the writer and its directory lock,
    /// and refuse further handles.
    pub fn close(&self) -> Result<(), IndexError> {
        let mut guard = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.closed.store(true, Ordering::Release);
        match std::mem::replace(&mut *guard, WriterSlot::Closed) {
            WriterSlot::Ready(writer) => {
                writer.wait_merging_threads()?;
                info!("Search index closed");
            }
            WriterSlot::Vacant | WriterSlot::Closed => {}
        }
        Ok(())
    }

    pub fn stats(&self) -> IndexStats {
        let searcher = self.reader.searcher();
        IndexStats {
            num_docs: searcher.num_docs(),
            num_segments: searcher.segment_readers().len(),
        }
    }

    /// True when a rebuild started and never completed
    pub fn needs_rebuild(&self) -> bool {
        match &self.location {
            Some(dir) => dir.join(REBUILD_MARKER_FILE).exists(),
            None => self.rebuilding.load(Ordering::Acquire),
        }
    }

    pub(crate) fn set_rebuild_marker(&self, on: bool) -> Result<(), IndexError> {
        self.rebuilding.store(on, Ordering::Release);
        let Some(dir) = &self.location else {
            return Ok(());
        };
        let marker = dir.join(REBUILD_MARKER_FILE);
        if on {
            std::fs::write(&marker, chrono::Utc::now().to_rfc3339())?;
        } else if marker.exists() {
            std::fs::remove_file(&marker)?;
        }
        Ok(())
    }

    fn reload_reader(&self) -> Result<(), IndexError> {
        self.reader.reload()?;
        Ok(())
    }
}

/// Exclusive write access. Commit or roll back; dropping an unfinished handle
/// rolls back.
pub struct WriteHandle<'a> {
    store: &'a IndexStore,
    guard: MutexGuard<'a, WriterSlot>,
    finished: bool,
}

impl WriteHandle<'_> {
    fn writer(&mut self) -> Result<&mut IndexWriter, IndexError> {
        match &mut *self.guard {
            WriterSlot::Ready(writer) => Ok(writer),
            WriterSlot::Vacant | WriterSlot::Closed => Err(IndexError::Closed),
        }
    }

    pub fn add_document(&mut self, doc: &SearchDocument) -> Result<(), IndexError> {
        let tdoc = doc.to_tantivy(&self.store.index.schema())?;
        self.writer()?.add_document(tdoc)?;
        Ok(())
    }

    /// Delete every document with this identity. Zero matches is fine.
    pub fn delete_by_identity(&mut self, id: &str) -> Result<(), IndexError> {
        let term = Term::from_field_text(self.store.fields.id, id);
        self.writer()?.delete_term(term);
        Ok(())
    }

    pub fn delete_by_site(&mut self, site_id: &str) -> Result<(), IndexError> {
        let term = Term::from_field_text(self.store.fields.site, site_id);
        self.writer()?.delete_term(term);
        Ok(())
    }

    pub fn delete_all(&mut self) -> Result<(), IndexError> {
        self.writer()?.delete_all_documents()?;
        Ok(())
    }

    /// Commit pending changes and keep the handle for more work.
    ///
    /// On failure the pending changes are rolled back.
    pub fn checkpoint(&mut self) -> Result<(), IndexError> {
        let result = self.writer()?.commit();
        match result {
            Ok(opstamp) => {
                debug!(opstamp, "Index commit");
                self.store.reload_reader()
            }
            Err(e) => {
                error!(error = %e, "Index commit failed, rolling back");
                self.discard();
                Err(e.into())
            }
        }
    }

    /// Commit and release the writer.
    pub fn commit(mut self) -> Result<(), IndexError> {
        let result = self.checkpoint();
        self.finished = true;
        let released = self.release();
        result.and(released)
    }

    /// Drop pending changes and release the writer.
    pub fn rollback(mut self) -> Result<(), IndexError> {
        self.finished = true;
        let WriterSlot::Ready(mut writer) = std::mem::replace(&mut *self.guard, WriterSlot::Vacant)
        else {
            return Ok(());
        };
        writer.rollback()?;
        writer.wait_merging_threads()?;
        Ok(())
    }

    /// 释放 writer 及其目录锁，下一个 handle 重新创建
    fn release(&mut self) -> Result<(), IndexError> {
        if let WriterSlot::Ready(writer) = std::mem::replace(&mut *self.guard, WriterSlot::Vacant) {
            writer.wait_merging_threads()?;
        }
        Ok(())
    }

    /// Roll back after a failure. A writer that cannot roll back is dropped so
    /// the next handle starts from a fresh one.
    fn discard(&mut self) {
        let rolled_back = match &mut *self.guard {
            WriterSlot::Ready(writer) => writer.rollback().is_ok(),
            WriterSlot::Vacant | WriterSlot::Closed => true,
        };
        if !rolled_back {
            warn!("Index writer rollback failed, discarding writer");
            *self.guard = WriterSlot::Vacant;
        }
    }
}

impl Drop for WriteHandle<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Write handle dropped without commit, rolling back");
            self.discard();
            // Dropping the writer releases the directory lock
            if matches!(*self.guard, WriterSlot::Ready(_)) {
                *self.guard = WriterSlot::Vacant;
            }
        }
    }
}

/// 只读快照，固定在某一次提交
pub struct ReadHandle {
    reader: IndexReader,
    searcher: Searcher,
}

impl ReadHandle {
    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    /// Move to the most recent commit
    pub fn refresh(&mut self) {
        self.searcher = self.reader.searcher();
    }

    pub fn num_docs(&self) -> u64 {
        self.searcher.num_docs()
    }

    /// Number of live documents carrying this identity
    pub fn count_identity(&self, fields: &SchemaFields, id: &str) -> Result<usize, IndexError> {
        let query = TermQuery::new(
            Term::from_field_text(fields.id, id),
            IndexRecordOption::Basic,
        );
        Ok(self.searcher.search(&query, &Count)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::map_to_document;
    use crate::models::{ContentItem, ContentKind};
    use rstest::*;
    use tempfile::TempDir;

    #[fixture]
    fn store() -> IndexStore {
        IndexStore::create_in_ram(IndexConfig::default()).unwrap()
    }

    fn doc(id: &str) -> SearchDocument {
        map_to_document(&ContentItem::new(id, ContentKind::Post, "main").with_body("hello"))
            .unwrap()
    }

    #[rstest]
    fn test_second_writer_is_locked(store: IndexStore) {
        let first = store.open_for_write().unwrap();
        assert_eq!(store.state(), StoreState::Writing);
        assert!(matches!(store.open_for_write(), Err(IndexError::Locked)));
        drop(first);
        assert_eq!(store.state(), StoreState::Open);
        assert!(store.open_for_write().is_ok());
    }

    #[rstest]
    fn test_read_snapshot_until_refresh(store: IndexStore) {
        let mut before = store.open_for_read().unwrap();

        let mut writer = store.open_for_write().unwrap();
        writer.add_document(&doc("a")).unwrap();
        writer.commit().unwrap();

        assert_eq!(before.num_docs(), 0);
        assert_eq!(store.open_for_read().unwrap().num_docs(), 1);
        before.refresh();
        assert_eq!(before.num_docs(), 1);
    }

    #[rstest]
    fn test_drop_rolls_back(store: IndexStore) {
        {
            let mut writer = store.open_for_write().unwrap();
            writer.add_document(&doc("a")).unwrap();
        }
        let mut writer = store.open_for_write().unwrap();
        writer.add_document(&doc("b")).unwrap();
        writer.commit().unwrap();

        let reader = store.open_for_read().unwrap();
        assert_eq!(reader.count_identity(store.fields(), "a").unwrap(), 0);
        assert_eq!(reader.count_identity(store.fields(), "b").unwrap(), 1);
    }

    #[rstest]
    fn test_explicit_rollback(store: IndexStore) {
        let mut writer = store.open_for_write().unwrap();
        writer.add_document(&doc("a")).unwrap();
        writer.rollback().unwrap();
        assert_eq!(store.open_for_read().unwrap().num_docs(), 0);
    }

    #[rstest]
    fn test_close_refuses_new_handles(store: IndexStore) {
        store.close().unwrap();
        assert_eq!(store.state(), StoreState::Closed);
        assert!(matches!(store.open_for_write(), Err(IndexError::Closed)));
        assert!(matches!(store.open_for_read(), Err(IndexError::Closed)));
    }

    #[rstest]
    fn test_retry_gives_up_while_locked(store: IndexStore) {
        let _held = store.open_for_write().unwrap();
        let policy = RetryPolicy {
            attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        };
        assert!(matches!(
            store.open_for_write_with_retry(&policy),
            Err(IndexError::Locked)
        ));
    }

    #[rstest]
    fn test_retry_does_not_wait_on_closed_store(store: IndexStore) {
        store.close().unwrap();
        let policy = RetryPolicy {
            attempts: 10,
            initial_backoff_ms: 5_000,
            max_backoff_ms: 5_000,
        };
        let started = std::time::Instant::now();
        assert!(matches!(
            store.open_for_write_with_retry(&policy),
            Err(IndexError::Closed)
        ));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_reopen_persists_commits() {
        let dir = TempDir::new().unwrap();
        let config = IndexConfig::default().with_storage_path(dir.path());
        {
            let store = IndexStore::open(config.clone()).unwrap();
            let mut writer = store.open_for_write().unwrap();
            writer.add_document(&doc("a")).unwrap();
            writer.commit().unwrap();
            store.close().unwrap();
        }
        let store = IndexStore::open(config).unwrap();
        assert_eq!(store.stats().num_docs, 1);
    }

    #[test]
    fn test_second_store_on_same_directory_is_locked() {
        let dir = TempDir::new().unwrap();
        let config = IndexConfig::default().with_storage_path(dir.path());
        let first = IndexStore::open(config.clone()).unwrap();
        let second = IndexStore::open(config).unwrap();

        let writer = first.open_for_write().unwrap();
        assert!(matches!(second.open_for_write(), Err(IndexError::Locked)));

        writer.commit().unwrap();
        let mut taken = second.open_for_write().unwrap();
        taken.add_document(&doc("from-second")).unwrap();
        taken.commit().unwrap();
        assert!(matches!(first.open_for_write(), Ok(_)));
    }

    #[rstest]
    #[case::rollback(true)]
    #[case::dropped(false)]
    fn test_abandoned_handle_releases_directory_lock(#[case] explicit: bool) {
        let dir = TempDir::new().unwrap();
        let config = IndexConfig::default().with_storage_path(dir.path());
        let first = IndexStore::open(config.clone()).unwrap();
        let second = IndexStore::open(config).unwrap();

        let mut writer = first.open_for_write().unwrap();
        writer.add_document(&doc("pending")).unwrap();
        if explicit {
            writer.rollback().unwrap();
        } else {
            drop(writer);
        }
        assert!(second.open_for_write().is_ok());
    }

    #[test]
    fn test_rebuild_marker_file() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::open(IndexConfig::default().with_storage_path(dir.path())).unwrap();
        assert!(!store.needs_rebuild());
        store.set_rebuild_marker(true).unwrap();
        assert!(dir.path().join(REBUILD_MARKER_FILE).exists());
        assert!(store.needs_rebuild());
        store.set_rebuild_marker(false).unwrap();
        assert!(!store.needs_rebuild());
    }

    #[rstest]
    fn test_stats(store: IndexStore) {
        let mut writer = store.open_for_write().unwrap();
        writer.add_document(&doc("a")).unwrap();
        writer.add_document(&doc("b")).unwrap();
        writer.commit().unwrap();
        let stats = store.stats();
        assert_eq!(stats.num_docs, 2);
        assert!(stats.num_segments >= 1);
    }
}
