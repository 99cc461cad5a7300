// planet/src/updater.rs
//! One fetch-then-index pass over a single subscription

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use search_core::{IndexStore, map_to_document, update_documents};
use tracing::{debug, error, info, warn};

use crate::config::PlanetConfig;
use crate::decode::decode_feed;
use crate::entry::{ParsedFeed, StoredEntry};
use crate::error::{FeedFetchError, PlanetError};
use crate::fetch::{FeedFetcher, FetchOutcome};
use crate::format::parse_feed;
use crate::store::PlanetStore;
use crate::subscription::{Subscription, Validators};

/// 单个订阅一次更新的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    NotModified,
    Updated {
        /// Entries in the feed after the per-fetch cap
        fetched: usize,
        /// New or changed entries written to the index
        indexed: usize,
        /// Entries without identity or rejected by the mapper
        skipped: usize,
    },
    /// Fetch or parse failure, already counted against the subscription
    Failed { error: String, now_failed: bool },
}

pub struct FeedUpdater<F, S> {
    fetcher: Arc<F>,
    store: Arc<S>,
    index: Arc<IndexStore>,
    config: PlanetConfig,
}

impl<F, S> FeedUpdater<F, S>
where
    F: FeedFetcher + 'static,
    S: PlanetStore + 'static,
{
    pub fn new(fetcher: Arc<F>, store: Arc<S>, index: Arc<IndexStore>, config: PlanetConfig) -> Self {
        Self {
            fetcher,
            store,
            index,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &PlanetConfig {
        &self.config
    }

    /// Fetch, parse and index one subscription, then persist its new state.
    ///
    /// Network and format problems are reported as `UpdateOutcome::Failed`.
    /// `Err` means the planet store or the index failed; in the latter case
    /// the validators are dropped so the next pass downloads the feed again.
    pub async fn update(
        &self,
        mut subscription: Subscription,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, PlanetError> {
        let (feed, validators) = match self.download(&subscription).await {
            Ok(Some(downloaded)) => downloaded,
            Ok(None) => {
                let validators = subscription.validators.clone();
                subscription.record_success(now, validators);
                self.store.save_subscription(&subscription)?;
                return Ok(UpdateOutcome::NotModified);
            }
            Err(e @ (PlanetError::Fetch(_) | PlanetError::Parse(_))) => {
                let now_failed = subscription.record_failure(self.config.failure_threshold);
                self.store.save_subscription(&subscription)?;
                warn!(
                    subscription = %subscription.id,
                    url = %subscription.url,
                    failures = subscription.failure_count,
                    error = %e,
                    "Feed update failed"
                );
                return Ok(UpdateOutcome::Failed {
                    error: e.to_string(),
                    now_failed,
                });
            }
            Err(e) => return Err(e),
        };

        if subscription.title == subscription.url
            && let Some(title) = &feed.title
        {
            subscription.title = title.clone();
        }

        let fetched = feed.entries.len();
        let (changed, mut skipped) = self.changed_entries(&subscription, &feed, now)?;

        let mut accepted = Vec::with_capacity(changed.len());
        let mut docs = Vec::with_capacity(changed.len());
        for entry in changed {
            match map_to_document(&entry.item) {
                Ok(doc) => {
                    docs.push(doc);
                    accepted.push(entry);
                }
                Err(e) => {
                    skipped += 1;
                    warn!(subscription = %subscription.id, entry = entry.id(), error = %e, "Skipping feed entry");
                }
            }
        }

        let index = Arc::clone(&self.index);
        let policy = index.config().write_retry;
        let written = tokio::task::spawn_blocking(move || update_documents(&index, &docs, &policy)).await?;
        let indexed = match written {
            Ok(indexed) => indexed,
            Err(e) => {
                subscription.validators = Validators::default();
                self.store.save_subscription(&subscription)?;
                error!(subscription = %subscription.id, error = %e, "Indexing feed entries failed");
                return Err(e.into());
            }
        };

        self.store.save_entries(&accepted)?;
        subscription.record_success(now, validators);
        self.store.save_subscription(&subscription)?;
        info!(
            subscription = %subscription.id,
            fetched,
            indexed,
            skipped,
            "Feed updated"
        );
        Ok(UpdateOutcome::Updated {
            fetched,
            indexed,
            skipped,
        })
    }

    /// `None` when the server reports the feed unchanged
    async fn download(
        &self,
        subscription: &Subscription,
    ) -> Result<Option<(ParsedFeed, Validators)>, PlanetError> {
        let timeout = self.config.fetch_timeout();
        let fetch = self.fetcher.fetch(&subscription.url, &subscription.validators);
        let fetched = match tokio::time::timeout(timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => return Err(FeedFetchError::Timeout(timeout).into()),
        };
        let fetched = match fetched {
            FetchOutcome::NotModified => return Ok(None),
            FetchOutcome::Fetched(fetched) => fetched,
        };

        let content_type = fetched.content_type.as_deref();
        let body = decode_feed(&fetched.body, content_type);
        let mut feed = parse_feed(content_type, &body)?;
        if feed.entries.len() > self.config.max_entries_per_fetch {
            debug!(
                subscription = %subscription.id,
                entries = feed.entries.len(),
                cap = self.config.max_entries_per_fetch,
                "Truncating feed"
            );
            feed.entries.truncate(self.config.max_entries_per_fetch);
        }
        Ok(Some((feed, fetched.validators)))
    }

    /// Entries whose permalink is unknown, or whose content or comment count
    /// changed since they were last indexed
    fn changed_entries(
        &self,
        subscription: &Subscription,
        feed: &ParsedFeed,
        now: DateTime<Utc>,
    ) -> Result<(Vec<StoredEntry>, usize), PlanetError> {
        let mut seen = HashSet::new();
        let mut changed = Vec::new();
        let mut skipped = 0;
        for entry in &feed.entries {
            let Some(fresh) = entry.to_stored(subscription, now) else {
                skipped += 1;
                warn!(subscription = %subscription.id, title = %entry.title, "Feed entry has no permalink or guid");
                continue;
            };
            if !seen.insert(fresh.id().to_string()) {
                continue;
            }
            match self.store.get_entry(fresh.id())? {
                Some(known) if !known.differs_from(&fresh) => {}
                _ => changed.push(fresh),
            }
        }
        Ok((changed, skipped))
    }
}
