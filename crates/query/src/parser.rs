use chumsky::{input::ValueInput, prelude::*};

use crate::{QueryLexer, lexer::Token};

pub type Span = SimpleSpan;
pub type Spanned<T> = (T, Span);

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedQuery {
    /// `field:value` or a bare `value`
    Term(ParsedTerm),

    And(Vec<Spanned<ParsedQuery>>),

    Or(Vec<Spanned<ParsedQuery>>),

    Not(Box<Spanned<ParsedQuery>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTerm {
    pub field: Option<Spanned<String>>,
    pub value: Spanned<ParsedTermValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTermValue {
    /// Bare word, backslash escapes already resolved by the lexer
    Text(String),

    /// Phrase without its quotes; `\"` is still escaped
    QuotedText(String),
}

impl ParsedTermValue {
    pub fn raw_str(&self) -> &str {
        match self {
            ParsedTermValue::Text(s) | ParsedTermValue::QuotedText(s) => s,
        }
    }

    /// The value with `\"` inside phrases turned into `"`
    pub fn unescape(&self) -> String {
        match self {
            ParsedTermValue::Text(s) => s.clone(),
            ParsedTermValue::QuotedText(s) => s.replace(r#"\""#, r#"""#),
        }
    }
}

type Extra<'t> = extra::Err<Rich<'t, Token>>;

#[derive(Debug, Clone, Copy)]
enum Junction {
    And,
    Or,
}

/// Extend a flat `And`/`Or` node with `rhs`, or start one from `lhs`
fn join(
    junction: Junction,
    lhs: Spanned<ParsedQuery>,
    rhs: Spanned<ParsedQuery>,
) -> Spanned<ParsedQuery> {
    let (query, lhs_span) = lhs;
    let span = SimpleSpan::from(lhs_span.start..rhs.1.end);
    let joined = match (junction, query) {
        (Junction::And, ParsedQuery::And(mut items)) => {
            items.push(rhs);
            ParsedQuery::And(items)
        }
        (Junction::Or, ParsedQuery::Or(mut items)) => {
            items.push(rhs);
            ParsedQuery::Or(items)
        }
        (Junction::And, other) => ParsedQuery::And(vec![(other, lhs_span), rhs]),
        (Junction::Or, other) => ParsedQuery::Or(vec![(other, lhs_span), rhs]),
    };
    (joined, span)
}

/// `field:value`, a bare word or a phrase
fn term<'t, I>() -> impl Parser<'t, I, Spanned<ParsedQuery>, Extra<'t>> + Clone
where
    I: ValueInput<'t, Token = Token, Span = SimpleSpan>,
{
    let value = select! {
        Token::Text(s) => ParsedTermValue::Text(s),
        Token::QuotedText(s) => ParsedTermValue::QuotedText(s),
    }
    .map_with(|v, e| (v, e.span()));

    let fielded = select! { Token::Text(s) => s }
        .map_with(|s, e| (s, e.span()))
        .then_ignore(just(Token::Colon))
        .then(value.clone())
        .map(|(field, value)| ParsedTerm {
            field: Some(field),
            value,
        });
    let bare = value.map(|value| ParsedTerm { field: None, value });

    fielded
        .or(bare)
        .map_with(|t, e| (ParsedQuery::Term(t), e.span()))
}

/// 查询语法（优先级由低到高）
///
/// ```text
/// query    := and_expr (OR and_expr)*
/// and_expr := not_expr ((AND)? not_expr)*
/// not_expr := NOT* atom
/// atom     := term | '(' query ')'
/// term     := (field ':')? value
/// ```
fn parser<'t, I>() -> impl Parser<'t, I, Spanned<ParsedQuery>, Extra<'t>>
where
    I: ValueInput<'t, Token = Token, Span = SimpleSpan>,
{
    recursive(|query| {
        let atom = term().or(query.delimited_by(just(Token::LParen), just(Token::RParen)));

        let negated = just(Token::Not).map_with(|_, e| e.span()).repeated().foldr(
            atom,
            |not_span: SimpleSpan, inner: Spanned<ParsedQuery>| {
                let span = SimpleSpan::from(not_span.start..inner.1.end);
                (ParsedQuery::Not(Box::new(inner)), span)
            },
        );

        let conjunction = negated.clone().foldl(
            just(Token::And).or_not().ignore_then(negated).repeated(),
            |lhs, rhs| join(Junction::And, lhs, rhs),
        );

        conjunction.clone().foldl(
            just(Token::Or).ignore_then(conjunction).repeated(),
            |lhs, rhs| join(Junction::Or, lhs, rhs),
        )
    })
}

/// A syntax error with the byte range it covers in the original input
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub span: std::ops::Range<usize>,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (at position {}..{})",
            self.message, self.span.start, self.span.end
        )
    }
}

/// Lex and parse a query string.
///
/// Lexer failures are reported before any parsing happens.
pub fn parse_query(input: &str) -> Result<Spanned<ParsedQuery>, Vec<SyntaxError>> {
    use chumsky::input::Stream;

    let mut tokens = Vec::new();
    let mut lex_errors = Vec::new();
    for (tok, span) in QueryLexer::new(input).spanned() {
        match tok {
            Ok(tok) => tokens.push((tok, SimpleSpan::from(span))),
            Err(()) => lex_errors.push(SyntaxError {
                message: format!("unexpected input '{}'", &input[span.clone()]),
                span,
            }),
        }
    }
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }

    let token_stream = Stream::from_iter(tokens)
        .map((0..input.len()).into(), |(t, s): (_, _)| (t, s));

    parser().parse(token_stream).into_result().map_err(|errors| {
        errors
            .into_iter()
            .map(|e| SyntaxError {
                message: e.reason().to_string(),
                span: e.span().start..e.span().end,
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_term() {
        let result = parse_query("hello").unwrap();
        let ParsedQuery::Term(term) = &result.0 else {
            panic!("Expected Term");
        };
        assert!(term.field.is_none());
        assert_eq!(term.value.0.raw_str(), "hello");
    }

    #[test]
    fn test_quoted_term() {
        let result = parse_query(r#""hello world""#).unwrap();
        let ParsedQuery::Term(term) = &result.0 else {
            panic!("Expected Term");
        };
        assert!(term.field.is_none());
        assert!(matches!(term.value.0, ParsedTermValue::QuotedText(_)));
        assert_eq!(term.value.0.raw_str(), "hello world");
    }

    #[test]
    fn test_field_term() {
        let result = parse_query("title:hello").unwrap();
        let ParsedQuery::Term(term) = &result.0 else {
            panic!("Expected Term");
        };
        assert_eq!(term.field.as_ref().unwrap().0, "title");
        assert_eq!(term.value.0.raw_str(), "hello");
    }

    #[test]
    fn test_escaped_quote_in_value() {
        let result = parse_query(r#"title:"say \"hi\"""#).unwrap();
        let ParsedQuery::Term(term) = &result.0 else {
            panic!("Expected Term");
        };
        assert_eq!(term.value.0.unescape(), r#"say "hi""#);
    }

    #[test]
    fn test_complex_query_with_spans() {
        let input = r#"(!tag:java || author:"Dave J") site:main"#;
        let result = parse_query(input).unwrap();

        // delimited_by doesn't include the delimiters in the inner expr's span
        assert_eq!(result.1.start, 1);
        assert_eq!(result.1.end, 40);

        let ParsedQuery::And(and_items) = &result.0 else {
            panic!("Expected And at top level");
        };
        assert_eq!(and_items.len(), 2);

        let (or_query, or_span) = &and_items[0];
        assert_eq!((or_span.start, or_span.end), (1, 29));

        let ParsedQuery::Or(or_items) = or_query else {
            panic!("Expected Or as first And item");
        };
        assert_eq!(or_items.len(), 2);

        let (not_query, not_span) = &or_items[0];
        assert_eq!((not_span.start, not_span.end), (1, 10));

        let ParsedQuery::Not(not_inner) = not_query else {
            panic!("Expected Not");
        };
        let ParsedQuery::Term(term) = &not_inner.0 else {
            panic!("Expected Term inside Not");
        };
        let (field_name, field_span) = term.field.as_ref().unwrap();
        assert_eq!(field_name, "tag");
        assert_eq!((field_span.start, field_span.end), (2, 5));
        assert_eq!(term.value.0.raw_str(), "java");
        assert_eq!((term.value.1.start, term.value.1.end), (6, 10));

        let ParsedQuery::Term(author_term) = &or_items[1].0 else {
            panic!("Expected Term for author");
        };
        assert_eq!(author_term.value.0.raw_str(), "Dave J");
        // The span includes the quotes
        assert_eq!((author_term.value.1.start, author_term.value.1.end), (21, 29));

        let (site_query, site_span) = &and_items[1];
        assert_eq!((site_span.start, site_span.end), (31, 40));
        assert!(matches!(site_query, ParsedQuery::Term(t) if t.value.0.raw_str() == "main"));
    }

    #[test]
    fn test_implicit_and() {
        let result = parse_query("foo bar").unwrap();
        assert!(matches!(&result.0, ParsedQuery::And(items) if items.len() == 2));
    }

    #[test]
    fn test_explicit_and() {
        let result = parse_query("foo AND bar && baz").unwrap();
        assert!(matches!(&result.0, ParsedQuery::And(items) if items.len() == 3));
    }

    #[test]
    fn test_or() {
        let result = parse_query("foo OR bar").unwrap();
        assert!(matches!(&result.0, ParsedQuery::Or(items) if items.len() == 2));
    }

    #[test]
    fn test_not() {
        let result = parse_query("NOT foo").unwrap();
        assert!(matches!(&result.0, ParsedQuery::Not(_)));
    }

    #[test]
    fn test_precedence() {
        // "a OR b c" should parse as "a OR (b AND c)"
        let result = parse_query("a OR b c").unwrap();
        let ParsedQuery::Or(items) = &result.0 else {
            panic!("Expected Or at top level");
        };
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0].0, ParsedQuery::Term(_)));
        assert!(matches!(&items[1].0, ParsedQuery::And(_)));
    }

    #[test]
    fn test_nested_parens() {
        let result = parse_query("((a))").unwrap();
        assert!(matches!(&result.0, ParsedQuery::Term(_)));
    }

    #[test]
    fn test_double_not() {
        let result = parse_query("NOT NOT foo").unwrap();
        let ParsedQuery::Not(inner) = &result.0 else {
            panic!("Expected Not at top level");
        };
        assert!(matches!(&inner.0, ParsedQuery::Not(_)));
    }

    #[test]
    fn test_field_without_value_is_error() {
        let errors = parse_query("title:").unwrap_err();
        assert!(!errors.is_empty());
        assert!(errors[0].span.start >= 5);
    }

    #[test]
    fn test_unbalanced_paren_is_error() {
        assert!(parse_query("(roller OR planet").is_err());
    }

    #[test]
    fn test_dangling_operator_is_error() {
        assert!(parse_query("roller AND").is_err());
    }

    #[test]
    fn test_lexer_error_reports_span() {
        let errors = parse_query("rust & java").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span, 5..6);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(parse_query("").is_err());
    }
}
