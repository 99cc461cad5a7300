// search-core/src/lib.rs
//! 博客全文搜索核心库
//!
//! - `mapper` turns content items into search documents
//! - `store` owns the tantivy index, its single writer and shared reader
//! - `operations` are the discrete write operations, including rebuilds
//! - `search` parses the query DSL and ranks results

pub mod config;
pub mod error;
pub mod mapper;
pub mod models;
pub mod operations;
pub mod query_executor;
pub mod repository;
pub mod schema;
pub mod search;
pub mod store;

pub use config::{IndexConfig, RetryPolicy, TokenizerKind};
pub use error::{IndexError, MappingError, QueryParseError, RepositoryError, SearchError};
pub use mapper::{map_to_document, strip_markup};
pub use models::{ContentItem, ContentKind, IndexStats, PublishStatus, SearchResult};
pub use operations::{
    CancelFlag, IndexOperation, RebuildProgress, RebuildReport, add_document, delete_by_identity,
    rebuild_all, rebuild_site, reindex_item, remove_item, remove_site, update_document,
    update_documents,
};
pub use repository::{ContentRepository, MemoryContentRepository};
pub use schema::{SearchDocument, build_schema};
pub use search::{SearchRequest, search, search_request};
pub use store::{IndexStore, ReadHandle, StoreState, WriteHandle};
