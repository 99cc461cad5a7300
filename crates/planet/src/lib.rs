// planet/src/lib.rs
//! Planet 订阅聚合：把远程博客 feed 拉取进搜索索引
//!
//! - `subscription` holds per-feed polling state
//! - `fetch`, `decode` and `format` turn a url into parsed entries
//! - `store` persists subscriptions and ingested entries in sled
//! - `updater` runs fetch-then-index for one subscription
//! - `scheduler` polls due subscriptions on a timer

pub mod config;
pub mod decode;
pub mod entry;
pub mod error;
pub mod fetch;
pub mod format;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod subscription;
pub mod updater;

pub use config::{DeclaredSubscription, PlanetConfig};
pub use decode::decode_feed;
pub use entry::{FeedEntry, ParsedFeed, StoredEntry};
pub use error::{FeedFetchError, FeedParseError, PlanetError, StoreError};
pub use fetch::{FeedFetcher, FetchOutcome, FetchedFeed, HttpFeedFetcher};
pub use format::{FeedFormat, parse_feed};
pub use registry::{InFlightGuard, InFlightRegistry};
pub use scheduler::{CycleReport, PlanetScheduler};
pub use store::{MemoryPlanetStore, PlanetStore, SledPlanetStore, register_declared, reset_subscription};
pub use subscription::{Subscription, SubscriptionStatus, Validators, subscription_id};
pub use updater::{FeedUpdater, UpdateOutcome};
