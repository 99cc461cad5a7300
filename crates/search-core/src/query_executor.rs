// search-core/src/query_executor.rs
//! Query DSL → tantivy query
//!
//! Turns a validated `query::Query` into a tantivy query tree. Text values go
//! through the same analyzer the index was built with; exact fields match the
//! raw value.

use std::ops::Bound;

use query::{FieldKind, Query, Term, Text, TimeRange};
use tantivy::query::{
    AllQuery, BooleanQuery, EmptyQuery, Occur, PhraseQuery, Query as TantivyQuery, RangeQuery,
    TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::TextAnalyzer;

use crate::schema::{SchemaFields, analyze};

pub struct QueryCompiler<'a> {
    fields: &'a SchemaFields,
    analyzer: &'a TextAnalyzer,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(fields: &'a SchemaFields, analyzer: &'a TextAnalyzer) -> Self {
        Self { fields, analyzer }
    }

    pub fn compile(&self, query: &Query) -> Box<dyn TantivyQuery> {
        match query {
            Query::Term(term) => self.compile_term(term),
            Query::And(items) => {
                let mut clauses: Vec<(Occur, Box<dyn TantivyQuery>)> = items
                    .iter()
                    .map(|item| match item {
                        Query::Not(inner) => (Occur::MustNot, self.compile(inner)),
                        other => (Occur::Must, self.compile(other)),
                    })
                    .collect();
                if clauses.iter().all(|(occur, _)| *occur == Occur::MustNot) {
                    clauses.push((Occur::Must, Box::new(AllQuery)));
                }
                Box::new(BooleanQuery::new(clauses))
            }
            Query::Or(items) => Box::new(BooleanQuery::new(
                items
                    .iter()
                    .map(|item| (Occur::Should, self.compile(item)))
                    .collect(),
            )),
            Query::Not(inner) => Box::new(BooleanQuery::new(vec![
                (Occur::Must, Box::new(AllQuery) as Box<dyn TantivyQuery>),
                (Occur::MustNot, self.compile(inner)),
            ])),
        }
    }

    fn compile_term(&self, term: &Term) -> Box<dyn TantivyQuery> {
        match term {
            // Bare text: content, title, or an exact identity
            Term::KeyWord(text) => Box::new(BooleanQuery::new(vec![
                (Occur::Should, self.analyzed(self.fields.content, text)),
                (Occur::Should, self.analyzed(self.fields.title, text)),
                (Occur::Should, self.exact(self.fields.id, &text.value)),
            ])),
            Term::Field(kind, text) => match self.field_for(*kind) {
                Some(field) if kind.is_exact() => {
                    let value = match kind {
                        FieldKind::Kind => text.value.to_lowercase(),
                        _ => text.value.clone(),
                    };
                    self.exact(field, &value)
                }
                Some(field) => self.analyzed(field, text),
                None => Box::new(EmptyQuery),
            },
            Term::Published(range) => self.published(range),
        }
    }

    fn field_for(&self, kind: FieldKind) -> Option<Field> {
        let f = self.fields;
        match kind {
            FieldKind::Title => Some(f.title),
            FieldKind::Content => Some(f.content),
            FieldKind::Author => Some(f.author),
            FieldKind::Category => Some(f.category),
            FieldKind::Tag => Some(f.tags),
            FieldKind::Site => Some(f.site),
            FieldKind::Kind => Some(f.kind),
            FieldKind::Id => Some(f.id),
            FieldKind::Published => None,
        }
    }

    fn exact(&self, field: Field, value: &str) -> Box<dyn TantivyQuery> {
        Box::new(TermQuery::new(
            tantivy::Term::from_field_text(field, value),
            IndexRecordOption::Basic,
        ))
    }

    /// Words must all match; phrases must match in order.
    fn analyzed(&self, field: Field, text: &Text) -> Box<dyn TantivyQuery> {
        let tokens = analyze(self.analyzer, &text.value);
        match tokens.len() {
            0 => Box::new(EmptyQuery),
            1 => Box::new(TermQuery::new(
                tantivy::Term::from_field_text(field, &tokens[0].1),
                IndexRecordOption::WithFreqs,
            )),
            _ if text.phrase => {
                let first = tokens[0].0;
                Box::new(PhraseQuery::new_with_offset(
                    tokens
                        .into_iter()
                        .map(|(pos, token)| {
                            (pos.saturating_sub(first), tantivy::Term::from_field_text(field, &token))
                        })
                        .collect(),
                ))
            }
            _ => Box::new(BooleanQuery::new(
                tokens
                    .into_iter()
                    .map(|(_, token)| {
                        (
                            Occur::Must,
                            Box::new(TermQuery::new(
                                tantivy::Term::from_field_text(field, &token),
                                IndexRecordOption::WithFreqs,
                            )) as Box<dyn TantivyQuery>,
                        )
                    })
                    .collect(),
            )),
        }
    }

    fn published(&self, range: &TimeRange) -> Box<dyn TantivyQuery> {
        let bound = |ts: Option<i64>| match ts {
            Some(ts) => Bound::Included(tantivy::Term::from_field_date(
                self.fields.published,
                tantivy::DateTime::from_timestamp_secs(ts),
            )),
            None => Bound::Unbounded,
        };
        Box::new(RangeQuery::new(bound(range.min), bound(range.max)))
    }
}
