// search-core/src/error.rs
//! 错误类型

use std::ops::Range;

use tantivy::TantivyError;
use tantivy::directory::error::OpenDirectoryError;
use thiserror::Error;

/// A content item that cannot become a search document. The item is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("content item has no identity")]
    MissingIdentity,

    #[error("identity {0:?} contains control characters or surrounding whitespace")]
    InvalidIdentity(String),

    /// Site handles are matched exactly by site deletes and rebuilds
    #[error("site handle {0:?} is blank or has surrounding whitespace")]
    InvalidSite(String),
}

/// Failure reported by a content repository
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("content repository unavailable: {0}")]
    Unavailable(String),

    #[error("content repository returned corrupt data: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    /// Another writer holds the index, in this process or another one.
    #[error("index is locked by another writer")]
    Locked,

    #[error("index store is closed")]
    Closed,

    #[error("index I/O failure: {0}")]
    Io(String),

    #[error("document rejected: {0}")]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("invalid index configuration: {0}")]
    Config(String),
}

impl IndexError {
    /// Writer contention clears up on its own; everything else is surfaced.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IndexError::Locked)
    }
}

impl From<TantivyError> for IndexError {
    fn from(e: TantivyError) -> Self {
        match e {
            TantivyError::LockFailure(..) => IndexError::Locked,
            other => IndexError::Io(other.to_string()),
        }
    }
}

impl From<OpenDirectoryError> for IndexError {
    fn from(e: OpenDirectoryError) -> Self {
        IndexError::Io(e.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e.to_string())
    }
}

/// A query string the DSL rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid query: {message} (at position {}..{})", .span.start, .span.end)]
pub struct QueryParseError {
    pub message: String,
    pub span: Range<usize>,
}

impl From<query::QueryError> for QueryParseError {
    fn from(e: query::QueryError) -> Self {
        Self {
            message: e.message,
            span: e.span,
        }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Parse(#[from] QueryParseError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl From<TantivyError> for SearchError {
    fn from(e: TantivyError) -> Self {
        SearchError::Index(e.into())
    }
}
