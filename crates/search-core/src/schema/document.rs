// search-core/src/schema/document.rs
//! Search documents
//!
//! A `SearchDocument` is the mapper's output: an ordered list of named fields,
//! each carrying its value and indexing mode. It turns into a tantivy document
//! only when written.

use chrono::{DateTime, Utc};
use tantivy::schema::Schema;
use tantivy::{TantivyDocument, TantivyError};

use super::fields::{FIELD_ID, IndexMode, mode_of};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchField {
    pub name: &'static str,
    pub value: FieldValue,
    pub mode: IndexMode,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchDocument {
    fields: Vec<SearchField>,
}

impl SearchDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text value. Names outside the field table are ignored.
    pub fn push_text(&mut self, name: &'static str, value: impl Into<String>) {
        if let Some(mode) = mode_of(name) {
            self.fields.push(SearchField {
                name,
                value: FieldValue::Text(value.into()),
                mode,
            });
        }
    }

    pub fn push_date(&mut self, name: &'static str, value: DateTime<Utc>) {
        if let Some(mode @ IndexMode::Date) = mode_of(name) {
            self.fields.push(SearchField {
                name,
                value: FieldValue::Date(value),
                mode,
            });
        }
    }

    pub fn fields(&self) -> &[SearchField] {
        &self.fields
    }

    /// First text value of a field
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match &f.value {
            FieldValue::Text(s) if f.name == name => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn identity(&self) -> Option<&str> {
        self.text(FIELD_ID)
    }

    pub fn to_tantivy(&self, schema: &Schema) -> Result<TantivyDocument, TantivyError> {
        let mut doc = TantivyDocument::default();
        for field in &self.fields {
            let handle = schema.get_field(field.name)?;
            match &field.value {
                FieldValue::Text(s) => doc.add_text(handle, s),
                FieldValue::Date(dt) => doc.add_date(
                    handle,
                    tantivy::DateTime::from_timestamp_secs(dt.timestamp()),
                ),
            }
        }
        Ok(doc)
    }
}
