// planet/src/store.rs
//! 持久化模块 - 订阅与已抓取条目
//!
//! Ingested entries are content in their own right, so both stores also act
//! as a `ContentRepository` and rebuilds pick them up.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use search_core::{ContentItem, ContentRepository, RepositoryError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sled::{Db, Tree};
use tracing::info;

use crate::config::PlanetConfig;
use crate::entry::StoredEntry;
use crate::error::StoreError;
use crate::subscription::Subscription;

const SUBSCRIPTIONS_TREE: &str = "subscriptions";
const ENTRIES_TREE: &str = "entries";

pub trait PlanetStore: Send + Sync {
    /// All subscriptions ordered by identity
    fn subscriptions(&self) -> Result<Vec<Subscription>, StoreError>;

    fn get_subscription(&self, id: &str) -> Result<Option<Subscription>, StoreError>;

    fn save_subscription(&self, subscription: &Subscription) -> Result<(), StoreError>;

    fn get_entry(&self, id: &str) -> Result<Option<StoredEntry>, StoreError>;

    fn save_entries(&self, entries: &[StoredEntry]) -> Result<(), StoreError>;

    /// Entries ordered by identity
    fn entries_page(&self, offset: usize, limit: usize) -> Result<Vec<StoredEntry>, StoreError>;

    fn entry_count(&self) -> Result<usize, StoreError>;
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Codec {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Codec {
        key: String::from_utf8_lossy(key).into_owned(),
        message: e.to_string(),
    })
}

/// sled 数据库，每类记录一棵 tree，值使用 bincode 编码
pub struct SledPlanetStore {
    db: Db,
    subscriptions: Tree,
    entries: Tree,
}

impl SledPlanetStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let store = Self::from_db(db)?;
        info!(
            path = %path.display(),
            subscriptions = store.subscriptions.len(),
            entries = store.entries.len(),
            "Planet store opened"
        );
        Ok(store)
    }

    /// Throw-away database for tests and dry runs
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        Ok(Self {
            subscriptions: db.open_tree(SUBSCRIPTIONS_TREE)?,
            entries: db.open_tree(ENTRIES_TREE)?,
            db,
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(tree: &Tree, id: &str) -> Result<Option<T>, StoreError> {
        tree.get(id.as_bytes())?
            .map(|bytes| decode(id.as_bytes(), &bytes))
            .transpose()
    }
}

impl PlanetStore for SledPlanetStore {
    fn subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        self.subscriptions
            .iter()
            .map(|kv| {
                let (key, value) = kv?;
                decode(&key, &value)
            })
            .collect()
    }

    fn get_subscription(&self, id: &str) -> Result<Option<Subscription>, StoreError> {
        Self::get(&self.subscriptions, id)
    }

    fn save_subscription(&self, subscription: &Subscription) -> Result<(), StoreError> {
        let bytes = encode(&subscription.id, subscription)?;
        self.subscriptions.insert(subscription.id.as_bytes(), bytes)?;
        self.subscriptions.flush()?;
        Ok(())
    }

    fn get_entry(&self, id: &str) -> Result<Option<StoredEntry>, StoreError> {
        Self::get(&self.entries, id)
    }

    fn save_entries(&self, entries: &[StoredEntry]) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for entry in entries {
            batch.insert(entry.id().as_bytes(), encode(entry.id(), entry)?);
        }
        self.entries.apply_batch(batch)?;
        self.entries.flush()?;
        Ok(())
    }

    fn entries_page(&self, offset: usize, limit: usize) -> Result<Vec<StoredEntry>, StoreError> {
        self.entries
            .iter()
            .skip(offset)
            .take(limit)
            .map(|kv| {
                let (key, value) = kv?;
                decode(&key, &value)
            })
            .collect()
    }

    fn entry_count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.len())
    }
}

/// In-memory store
#[derive(Clone, Default)]
pub struct MemoryPlanetStore {
    subscriptions: Arc<RwLock<BTreeMap<String, Subscription>>>,
    entries: Arc<RwLock<BTreeMap<String, StoredEntry>>>,
}

impl MemoryPlanetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlanetStore for MemoryPlanetStore {
    fn subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        let subscriptions = self.subscriptions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(subscriptions.values().cloned().collect())
    }

    fn get_subscription(&self, id: &str) -> Result<Option<Subscription>, StoreError> {
        let subscriptions = self.subscriptions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(subscriptions.get(id).cloned())
    }

    fn save_subscription(&self, subscription: &Subscription) -> Result<(), StoreError> {
        self.subscriptions
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(subscription.id.clone(), subscription.clone());
        Ok(())
    }

    fn get_entry(&self, id: &str) -> Result<Option<StoredEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(id).cloned())
    }

    fn save_entries(&self, entries: &[StoredEntry]) -> Result<(), StoreError> {
        let mut stored = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        for entry in entries {
            stored.insert(entry.id().to_string(), entry.clone());
        }
        Ok(())
    }

    fn entries_page(&self, offset: usize, limit: usize) -> Result<Vec<StoredEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.values().skip(offset).take(limit).cloned().collect())
    }

    fn entry_count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.read().map_err(|_| StoreError::Poisoned)?.len())
    }
}

macro_rules! content_repository {
    ($store:ty) => {
        impl ContentRepository for $store {
            fn list_all_content_items(
                &self,
                offset: usize,
                limit: usize,
            ) -> Result<Vec<ContentItem>, RepositoryError> {
                Ok(self
                    .entries_page(offset, limit)?
                    .into_iter()
                    .map(|entry| entry.item)
                    .collect())
            }

            fn get_content_item(&self, id: &str) -> Result<Option<ContentItem>, RepositoryError> {
                Ok(self.get_entry(id)?.map(|entry| entry.item))
            }
        }
    };
}

content_repository!(SledPlanetStore);
content_repository!(MemoryPlanetStore);

/// Return a subscription to `Active` with a zero failure count
pub fn reset_subscription<S>(store: &S, id: &str) -> Result<Subscription, StoreError>
where
    S: PlanetStore + ?Sized,
{
    let mut subscription = store
        .get_subscription(id)?
        .ok_or_else(|| StoreError::UnknownSubscription(id.to_string()))?;
    subscription.reset();
    store.save_subscription(&subscription)?;
    info!(subscription = id, url = %subscription.url, "Subscription reset");
    Ok(subscription)
}

/// Add subscriptions declared in the configuration that the store does not
/// know yet and refresh title, site and interval of the known ones. Returns
/// the number of newly added subscriptions.
pub fn register_declared<S>(store: &S, config: &PlanetConfig) -> Result<usize, StoreError>
where
    S: PlanetStore + ?Sized,
{
    let mut added = 0;
    for declared in &config.subscriptions {
        let fresh = Subscription::from_declared(declared, config.default_interval_secs);
        let subscription = match store.get_subscription(&fresh.id)? {
            Some(mut known) => {
                known.apply_declared(declared, config.default_interval_secs);
                known
            }
            None => {
                added += 1;
                info!(subscription = %fresh.id, url = %fresh.url, site = %fresh.site_id, "Subscription added");
                fresh
            }
        };
        store.save_subscription(&subscription)?;
    }
    Ok(added)
}
