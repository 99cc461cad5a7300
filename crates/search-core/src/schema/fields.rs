// search-core/src/schema/fields.rs
//! 字段定义 - 字段名及其索引方式

/// Analyzer registered on the index for every tokenized field
pub const ANALYZER_NAME: &str = "weblog";

/// Item identity, unique per domain entity
pub const FIELD_ID: &str = "id";
/// `post`, `comment` or `entry`
pub const FIELD_KIND: &str = "kind";
/// Owning weblog or Planet group
pub const FIELD_SITE: &str = "site";
pub const FIELD_TITLE: &str = "title";
/// Body text with markup stripped
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_AUTHOR: &str = "author";
/// One value per category, matched verbatim
pub const FIELD_CATEGORY: &str = "category";
/// One value per tag
pub const FIELD_TAGS: &str = "tags";
pub const FIELD_PERMALINK: &str = "permalink";
/// Publish timestamp
pub const FIELD_PUBLISHED: &str = "published";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Kept for display, never searched
    StoredOnly,
    /// Searchable through the analyzer, not kept
    Tokenized,
    StoredAndTokenized,
    /// Stored and indexed as a single untokenized term
    Keyword,
    /// Stored, indexed and fast, for range filters
    Date,
}

impl IndexMode {
    pub fn is_stored(&self) -> bool {
        !matches!(self, IndexMode::Tokenized)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub mode: IndexMode,
}

pub static FIELD_SPECS: &[FieldSpec] = &[
    FieldSpec { name: FIELD_ID, mode: IndexMode::Keyword },
    FieldSpec { name: FIELD_KIND, mode: IndexMode::Keyword },
    FieldSpec { name: FIELD_SITE, mode: IndexMode::Keyword },
    FieldSpec { name: FIELD_TITLE, mode: IndexMode::StoredAndTokenized },
    FieldSpec { name: FIELD_CONTENT, mode: IndexMode::Tokenized },
    FieldSpec { name: FIELD_AUTHOR, mode: IndexMode::StoredAndTokenized },
    FieldSpec { name: FIELD_CATEGORY, mode: IndexMode::Keyword },
    FieldSpec { name: FIELD_TAGS, mode: IndexMode::StoredAndTokenized },
    FieldSpec { name: FIELD_PERMALINK, mode: IndexMode::StoredOnly },
    FieldSpec { name: FIELD_PUBLISHED, mode: IndexMode::Date },
];

/// Indexing mode of a known field
pub fn mode_of(name: &str) -> Option<IndexMode> {
    FIELD_SPECS.iter().find(|spec| spec.name == name).map(|spec| spec.mode)
}
