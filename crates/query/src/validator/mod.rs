mod time;

use crate::parser::{ParsedQuery, ParsedTerm, ParsedTermValue, Span, Spanned};
use chrono::{DateTime, Utc};
use std::fmt;
pub use time::TimeRange;

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Term(Term),
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Bare text, matched against the default fields
    KeyWord(Text),
    /// Text restricted to one field
    Field(FieldKind, Text),
    /// Publish date range (unix seconds, UTC)
    Published(TimeRange),
}

/// A term value. Quoted values are phrases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub value: String,
    pub phrase: bool,
}

impl Text {
    pub fn word(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            phrase: false,
        }
    }

    pub fn phrase(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            phrase: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub span: Span,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(span: Span, kind: ValidationErrorKind) -> Self {
        Self { span, kind }
    }

    /// Get the byte range of the error in the original input
    pub fn range(&self) -> std::ops::Range<usize> {
        self.span.start..self.span.end
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at position {}..{})",
            self.kind, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    UnknownField { field: String },
    InvalidTimeSpec { value: String, reason: String },
    EmptyValue,
    InvalidRange { reason: String },
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationErrorKind::UnknownField { field } => {
                write!(f, "unknown field '{}'", field)
            }
            ValidationErrorKind::InvalidTimeSpec { value, reason } => {
                write!(f, "invalid time '{}': {}", value, reason)
            }
            ValidationErrorKind::EmptyValue => write!(f, "empty value"),
            ValidationErrorKind::InvalidRange { reason } => {
                write!(f, "invalid range: {}", reason)
            }
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a parsed query and convert it to a semantic query.
///
/// Relative dates (`published:>7d`) are resolved against `now`.
pub fn validate_query(query: &Spanned<ParsedQuery>, now: DateTime<Utc>) -> ValidationResult<Query> {
    let (parsed, _span) = query;
    match parsed {
        ParsedQuery::Term(term) => validate_term(term, now).map(Query::Term),
        ParsedQuery::And(items) => items
            .iter()
            .map(|item| validate_query(item, now))
            .collect::<Result<Vec<_>, _>>()
            .map(Query::And),
        ParsedQuery::Or(items) => items
            .iter()
            .map(|item| validate_query(item, now))
            .collect::<Result<Vec<_>, _>>()
            .map(Query::Or),
        ParsedQuery::Not(inner) => validate_query(inner, now).map(|q| Query::Not(Box::new(q))),
    }
}

pub struct FieldDef {
    pub kind: FieldKind,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

impl FieldDef {
    /// Find a field definition by any of its aliases
    pub fn find_by_alias(name: &str) -> Option<&'static FieldDef> {
        let name_lower = name.to_lowercase();
        FIELD_DEFINITIONS
            .iter()
            .find(|def| def.aliases.iter().any(|&a| a == name_lower))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Title,
    Content,
    Author,
    Category,
    Tag,
    Site,
    Kind,
    Id,
    Published,
}

impl FieldKind {
    /// Whether values for this field are matched verbatim rather than analysed.
    pub fn is_exact(&self) -> bool {
        matches!(
            self,
            FieldKind::Category | FieldKind::Site | FieldKind::Kind | FieldKind::Id
        )
    }

    fn parse_value(
        self,
        value: &ParsedTermValue,
        span: Span,
        now: DateTime<Utc>,
    ) -> ValidationResult<Term> {
        match self {
            FieldKind::Published => {
                time::validate_time(&value.unescape(), span, now).map(Term::Published)
            }
            kind => Ok(Term::Field(kind, text_of(value))),
        }
    }
}

pub static FIELD_DEFINITIONS: &[FieldDef] = &[
    FieldDef {
        kind: FieldKind::Title,
        aliases: &["title", "t"],
        description: "Words in the title",
    },
    FieldDef {
        kind: FieldKind::Content,
        aliases: &["content", "body", "text"],
        description: "Words in the body text",
    },
    FieldDef {
        kind: FieldKind::Author,
        aliases: &["author", "by"],
        description: "Author name",
    },
    FieldDef {
        kind: FieldKind::Category,
        aliases: &["category", "cat"],
        description: "Exact category",
    },
    FieldDef {
        kind: FieldKind::Tag,
        aliases: &["tag", "tags"],
        description: "Tag words",
    },
    FieldDef {
        kind: FieldKind::Site,
        aliases: &["site", "blog", "weblog"],
        description: "Exact site handle",
    },
    FieldDef {
        kind: FieldKind::Kind,
        aliases: &["kind", "type"],
        description: "Item kind: post, comment or entry",
    },
    FieldDef {
        kind: FieldKind::Id,
        aliases: &["id"],
        description: "Exact item identity",
    },
    FieldDef {
        kind: FieldKind::Published,
        aliases: &["published", "date", "pubdate"],
        description: "Publish date range",
    },
];

fn text_of(value: &ParsedTermValue) -> Text {
    match value {
        ParsedTermValue::Text(_) => Text::word(value.unescape()),
        ParsedTermValue::QuotedText(_) => Text::phrase(value.unescape()),
    }
}

/// Validate a parsed term and convert it to a semantic term
fn validate_term(term: &ParsedTerm, now: DateTime<Utc>) -> ValidationResult<Term> {
    let (value, value_span) = &term.value;

    if value.unescape().trim().is_empty() {
        return Err(ValidationError::new(
            *value_span,
            ValidationErrorKind::EmptyValue,
        ));
    }

    match &term.field {
        None => Ok(Term::KeyWord(text_of(value))),
        Some((field, field_span)) => match FieldDef::find_by_alias(field) {
            Some(def) => def.kind.parse_value(value, *value_span, now),
            None => Err(ValidationError::new(
                *field_span,
                ValidationErrorKind::UnknownField {
                    field: field.clone(),
                },
            )),
        },
    }
}
