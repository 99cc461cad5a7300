// search-core/src/schema/mod.rs
//! 索引 Schema 模块：字段表、tantivy schema、分词器与文档

pub mod analyzer;
pub mod builder;
pub mod document;
pub mod fields;

pub use analyzer::{analyze, build_analyzer, register_analyzer};
pub use builder::{SchemaFields, build_schema};
pub use document::{FieldValue, SearchDocument, SearchField};
pub use fields::*;
