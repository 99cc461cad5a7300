pub mod lexer;
pub mod parser;
pub mod validator;

use chrono::{DateTime, Utc};
use std::fmt;
use std::ops::Range;

pub use lexer::{QueryLexer, Token};
pub use parser::{SyntaxError, parse_query};
pub use validator::{
    FIELD_DEFINITIONS, FieldDef, FieldKind, Query, Term, Text, TimeRange, ValidationError,
    ValidationErrorKind, validate_query,
};

/// Why a query string was rejected
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    pub message: String,
    pub span: Range<usize>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at position {}..{})",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for QueryError {}

impl From<SyntaxError> for QueryError {
    fn from(e: SyntaxError) -> Self {
        Self {
            message: e.message,
            span: e.span,
        }
    }
}

impl From<ValidationError> for QueryError {
    fn from(e: ValidationError) -> Self {
        Self {
            span: e.range(),
            message: e.kind.to_string(),
        }
    }
}

/// Parse and validate a query, resolving relative dates against the current time.
pub fn parse(input: &str) -> Result<Query, QueryError> {
    parse_at(input, Utc::now())
}

/// Parse and validate a query, resolving relative dates against `now`.
///
/// Only the first syntax error is reported.
pub fn parse_at(input: &str, now: DateTime<Utc>) -> Result<Query, QueryError> {
    let parsed = parse_query(input).map_err(|errors| {
        errors
            .into_iter()
            .next()
            .map(QueryError::from)
            .unwrap_or_else(|| QueryError {
                message: "invalid query".to_string(),
                span: 0..input.len(),
            })
    })?;
    Ok(validate_query(&parsed, now)?)
}
