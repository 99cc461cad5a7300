// search-core/src/schema/builder.rs
//! Schema 构建器
//!
//! Builds the tantivy schema from the field table in `fields.rs`.

use tantivy::TantivyError;
use tantivy::schema::*;

use super::fields::*;

/// Build the tantivy schema. Every tokenized field uses the `weblog` analyzer.
pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    let tokenized = TextFieldIndexing::default()
        .set_tokenizer(ANALYZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);

    for spec in FIELD_SPECS {
        match spec.mode {
            IndexMode::StoredOnly => {
                schema_builder.add_text_field(spec.name, STORED);
            }
            IndexMode::Tokenized => {
                schema_builder.add_text_field(
                    spec.name,
                    TextOptions::default().set_indexing_options(tokenized.clone()),
                );
            }
            IndexMode::StoredAndTokenized => {
                schema_builder.add_text_field(
                    spec.name,
                    TextOptions::default()
                        .set_indexing_options(tokenized.clone())
                        .set_stored(),
                );
            }
            IndexMode::Keyword => {
                schema_builder.add_text_field(spec.name, STRING | STORED);
            }
            IndexMode::Date => {
                schema_builder.add_date_field(
                    spec.name,
                    DateOptions::default().set_indexed().set_stored().set_fast(),
                );
            }
        }
    }

    schema_builder.build()
}

/// Cached field handles
#[derive(Debug, Clone, Copy)]
pub struct SchemaFields {
    pub id: Field,
    pub kind: Field,
    pub site: Field,
    pub title: Field,
    pub content: Field,
    pub author: Field,
    pub category: Field,
    pub tags: Field,
    pub permalink: Field,
    pub published: Field,
}

impl SchemaFields {
    /// Fails when the schema was not produced by `build_schema`, e.g. an
    /// index directory written by something else.
    pub fn from_schema(schema: &Schema) -> Result<Self, TantivyError> {
        Ok(Self {
            id: schema.get_field(FIELD_ID)?,
            kind: schema.get_field(FIELD_KIND)?,
            site: schema.get_field(FIELD_SITE)?,
            title: schema.get_field(FIELD_TITLE)?,
            content: schema.get_field(FIELD_CONTENT)?,
            author: schema.get_field(FIELD_AUTHOR)?,
            category: schema.get_field(FIELD_CATEGORY)?,
            tags: schema.get_field(FIELD_TAGS)?,
            permalink: schema.get_field(FIELD_PERMALINK)?,
            published: schema.get_field(FIELD_PUBLISHED)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_every_field() {
        let schema = build_schema();
        for spec in FIELD_SPECS {
            assert!(schema.get_field(spec.name).is_ok(), "missing {}", spec.name);
        }
        assert!(SchemaFields::from_schema(&schema).is_ok());
    }

    #[test]
    fn test_field_modes_match_schema() {
        let schema = build_schema();
        for spec in FIELD_SPECS {
            let entry = schema.get_field_entry(schema.get_field(spec.name).unwrap());
            assert_eq!(entry.is_stored(), spec.mode.is_stored(), "{}", spec.name);
            let indexed = !matches!(spec.mode, IndexMode::StoredOnly);
            assert_eq!(entry.is_indexed(), indexed, "{}", spec.name);
        }
    }

    #[test]
    fn test_foreign_schema_rejected() {
        let mut builder = Schema::builder();
        builder.add_text_field("path", STRING);
        assert!(SchemaFields::from_schema(&builder.build()).is_err());
    }
}
