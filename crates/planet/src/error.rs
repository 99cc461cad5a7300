// planet/src/error.rs
//! Error types for fetching, parsing and persisting feeds

use std::time::Duration;

use search_core::{IndexError, MappingError, RepositoryError};
use thiserror::Error;

/// A feed could not be downloaded. Counts as a subscription failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedFetchError {
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("server answered with HTTP status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("feed body is larger than {limit} bytes")]
    TooLarge { limit: u64 },
}

/// A feed was downloaded but is not a feed we understand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedParseError {
    #[error("unsupported content type {0:?}")]
    UnsupportedContentType(String),

    #[error("malformed feed: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("planet database error: {0}")]
    Database(String),

    #[error("cannot decode planet record {key:?}: {message}")]
    Codec { key: String, message: String },

    #[error("no subscription with id {0:?}")]
    UnknownSubscription(String),

    #[error("planet store lock poisoned")]
    Poisoned,
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<StoreError> for RepositoryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Codec { .. } => RepositoryError::Corrupt(e.to_string()),
            other => RepositoryError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlanetError {
    #[error(transparent)]
    Fetch(#[from] FeedFetchError),

    #[error(transparent)]
    Parse(#[from] FeedParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("invalid planet configuration: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for PlanetError {
    fn from(e: tokio::task::JoinError) -> Self {
        PlanetError::Task(e.to_string())
    }
}
