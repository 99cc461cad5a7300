use logos::{Lexer, Logos};
use std::fmt;

/// Raw tokens used internally by logos
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
    #[token("AND")]
    #[token("&&")]
    And,

    #[token("OR")]
    #[token("||")]
    Or,

    #[token("NOT")]
    #[token("!")]
    Not,

    #[token(":")]
    Colon,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[regex(r#""([^"\\]|\\.)*""#, quoted_text_inner_string)]
    QuotedText(String),

    #[regex(r#"(?:[^ \t\r\n\f:"()!&|\\]|\\[^\r\n])+"#, |lex| unescape_bare(lex.slice()))]
    Text(String),
}

/// `\x` is a literal `x` in bare text, so `urn\:post\:1` stays one term
fn unescape_bare(slice: &str) -> String {
    let mut out = String::with_capacity(slice.len());
    let mut chars = slice.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

fn quoted_text_inner_string(lex: &mut Lexer<RawToken>) -> String {
    let slice = lex.slice();
    slice
        .get(1..slice.len().saturating_sub(1))
        .unwrap_or_default()
        .to_string()
}

/// Value tokens - used after `:` where operators are treated as text.
///
/// Parentheses still end a value so `(title:rust OR java)` groups as written.
#[derive(Logos, Debug, PartialEq, Clone)]
enum ValueToken {
    #[regex(r#""([^"\\]|\\.)*""#)]
    Quoted,

    #[regex(r#"(?:[^ \t\r\n\f"()\\]|\\[^\r\n])+"#)]
    Text,

    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,
}

/// The public token type
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    And,
    Or,
    Not,
    Colon,
    LParen,
    RParen,
    QuotedText(String),
    Text(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Not => write!(f, "NOT"),
            Token::Colon => write!(f, "':'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::QuotedText(s) => write!(f, "\"{}\"", s),
            Token::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// A context-aware query lexer
pub struct QueryLexer<'source> {
    lexer: Lexer<'source, RawToken>,
    after_colon: bool,
    current_span: std::ops::Range<usize>,
}

impl<'source> QueryLexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            lexer: RawToken::lexer(source),
            after_colon: false,
            current_span: 0..0,
        }
    }

    /// Get the span of the last yielded token
    pub fn span(&self) -> std::ops::Range<usize> {
        self.current_span.clone()
    }

    /// Get the slice of the last yielded token
    pub fn slice(&self) -> &'source str {
        &self.lexer.source()[self.current_span.clone()]
    }

    /// Returns an iterator that yields (Result<Token, ()>, Range<usize>)
    pub fn spanned(self) -> SpannedQueryLexer<'source> {
        SpannedQueryLexer { lexer: self }
    }
}

impl<'source> Iterator for QueryLexer<'source> {
    type Item = Result<Token, ()>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.after_colon {
            self.after_colon = false;
            let mut value_lexer: Lexer<'source, ValueToken> = self.lexer.clone().morph();

            let result = match value_lexer.next()? {
                Ok(ValueToken::Quoted) => {
                    let slice = value_lexer.slice();
                    let s = slice
                        .get(1..slice.len().saturating_sub(1))
                        .unwrap_or_default()
                        .to_string();
                    self.current_span = value_lexer.span();
                    self.lexer = value_lexer.morph();
                    Some(Ok(Token::QuotedText(s)))
                }
                Ok(ValueToken::Text) => {
                    let s = unescape_bare(value_lexer.slice());
                    self.current_span = value_lexer.span();
                    self.lexer = value_lexer.morph();
                    Some(Ok(Token::Text(s)))
                }
                Ok(ValueToken::Whitespace) => {
                    // No value after colon, continue in normal mode
                    self.lexer = value_lexer.morph();
                    self.next()
                }
                Err(_) => {
                    self.current_span = value_lexer.span();
                    self.lexer = value_lexer.morph();
                    Some(Err(()))
                }
            };
            return result;
        }

        let result = self.lexer.next()?;
        self.current_span = self.lexer.span();

        match result {
            Ok(RawToken::Colon) => {
                self.after_colon = true;
                Some(Ok(Token::Colon))
            }
            Ok(RawToken::And) => Some(Ok(Token::And)),
            Ok(RawToken::Or) => Some(Ok(Token::Or)),
            Ok(RawToken::Not) => Some(Ok(Token::Not)),
            Ok(RawToken::LParen) => Some(Ok(Token::LParen)),
            Ok(RawToken::RParen) => Some(Ok(Token::RParen)),
            Ok(RawToken::QuotedText(s)) => Some(Ok(Token::QuotedText(s))),
            Ok(RawToken::Text(s)) => Some(Ok(Token::Text(s))),
            Err(_) => Some(Err(())),
        }
    }
}

/// Iterator adapter that yields tokens with their spans
pub struct SpannedQueryLexer<'source> {
    lexer: QueryLexer<'source>,
}

impl<'source> Iterator for SpannedQueryLexer<'source> {
    type Item = (Result<Token, ()>, std::ops::Range<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.lexer.next()?;
        let span = self.lexer.span();
        Some((token, span))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn spanned(input: &str) -> Vec<(Token, std::ops::Range<usize>)> {
        QueryLexer::new(input)
            .spanned()
            .filter_map(|(result, span)| result.ok().map(|t| (t, span)))
            .collect()
    }

    #[test]
    fn test_field_with_quoted_value() {
        let tokens: Vec<_> = QueryLexer::new(r#"title:"hello world""#).collect();
        assert_eq!(tokens, vec![
            Ok(Token::Text("title".into())),
            Ok(Token::Colon),
            Ok(Token::QuotedText("hello world".into()))
        ]);
    }

    #[test]
    fn test_bare_quoted_phrase() {
        let tokens: Vec<_> = QueryLexer::new(r#""release notes""#).collect();
        assert_eq!(tokens, vec![Ok(Token::QuotedText("release notes".into()))]);
    }

    #[test]
    fn test_operators_after_colon_are_text() {
        let tokens: Vec<_> = QueryLexer::new("published:>=2024-01-01").collect();
        assert_eq!(tokens, vec![
            Ok(Token::Text("published".into())),
            Ok(Token::Colon),
            Ok(Token::Text(">=2024-01-01".into())),
        ]);
    }

    #[test]
    fn test_value_stops_at_paren() {
        let tokens: Vec<_> = QueryLexer::new("(tag:rust)").collect();
        assert_eq!(tokens, vec![
            Ok(Token::LParen),
            Ok(Token::Text("tag".into())),
            Ok(Token::Colon),
            Ok(Token::Text("rust".into())),
            Ok(Token::RParen),
        ]);
    }

    #[test]
    fn test_trailing_colon_yields_no_value() {
        let tokens: Vec<_> = QueryLexer::new("title:").collect();
        assert_eq!(tokens, vec![Ok(Token::Text("title".into())), Ok(Token::Colon)]);
    }

    #[test]
    fn test_escaped_specials_stay_in_one_term() {
        let tokens: Vec<_> = QueryLexer::new(r"urn\:post\:1 a\(b\) \NOT").collect();
        assert_eq!(tokens, vec![
            Ok(Token::Text("urn:post:1".into())),
            Ok(Token::Text("a(b)".into())),
            Ok(Token::Text("NOT".into())),
        ]);
    }

    #[test]
    fn test_escaped_paren_in_field_value() {
        let tokens: Vec<_> = QueryLexer::new(r"id:a\(b\) x").collect();
        assert_eq!(tokens, vec![
            Ok(Token::Text("id".into())),
            Ok(Token::Colon),
            Ok(Token::Text("a(b)".into())),
            Ok(Token::Text("x".into())),
        ]);
    }

    #[test]
    fn test_trailing_backslash_is_an_error() {
        let tokens: Vec<_> = QueryLexer::new(r"rust\").collect();
        assert!(tokens.contains(&Err(())));
    }

    #[test]
    fn test_lone_ampersand_is_an_error() {
        let tokens: Vec<_> = QueryLexer::new("rust & java").collect();
        assert!(tokens.contains(&Err(())));
    }

    #[test]
    fn test_spanned_with_operators() {
        assert_eq!(spanned("roller AND planet"), vec![
            (Token::Text("roller".into()), 0..6),
            (Token::And, 7..10),
            (Token::Text("planet".into()), 11..17),
        ]);
    }

    #[test]
    fn test_spanned_complex() {
        assert_eq!(spanned(r#"site:main || author:"Dave J""#), vec![
            (Token::Text("site".into()), 0..4),
            (Token::Colon, 4..5),
            (Token::Text("main".into()), 5..9),
            (Token::Or, 10..12),
            (Token::Text("author".into()), 13..19),
            (Token::Colon, 19..20),
            (Token::QuotedText("Dave J".into()), 20..28),
        ]);
    }

    #[test]
    fn test_spanned_and_as_value() {
        assert_eq!(spanned("title:AND"), vec![
            (Token::Text("title".into()), 0..5),
            (Token::Colon, 5..6),
            (Token::Text("AND".into()), 6..9),
        ]);
    }

    #[test]
    fn test_spanned_verify_slices() {
        let input = "NOT draft AND category:java || !kind:comment";

        // Verify that spans correctly index into original input
        for (token, span) in spanned(input) {
            let slice = &input[span.clone()];
            match token {
                Token::Text(s) | Token::QuotedText(s) => assert_eq!(slice, s),
                Token::And => assert_eq!(slice, "AND"),
                Token::Or => assert!(slice == "OR" || slice == "||"),
                Token::Not => assert!(slice == "NOT" || slice == "!"),
                Token::Colon => assert_eq!(slice, ":"),
                Token::LParen => assert_eq!(slice, "("),
                Token::RParen => assert_eq!(slice, ")"),
            }
        }
    }
}
