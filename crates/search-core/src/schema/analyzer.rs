// search-core/src/schema/analyzer.rs
//! 分词器 - 索引与查询共用

use tantivy::Index;
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, TokenStream};
use tantivy_jieba::JiebaTokenizer;

use super::fields::ANALYZER_NAME;
use crate::config::TokenizerKind;

/// Tokens of this many bytes or more are dropped
const MAX_TOKEN_LEN: usize = 64;

pub fn build_analyzer(kind: TokenizerKind) -> TextAnalyzer {
    match kind {
        TokenizerKind::Standard => TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .build(),
        TokenizerKind::Jieba => TextAnalyzer::builder(JiebaTokenizer {})
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .build(),
    }
}

/// Register the analyzer under the name the schema refers to
pub fn register_analyzer(index: &Index, kind: TokenizerKind) -> TextAnalyzer {
    let analyzer = build_analyzer(kind);
    index.tokenizers().register(ANALYZER_NAME, analyzer.clone());
    analyzer
}

/// Run text through an analyzer, returning (position, token) pairs
pub fn analyze(analyzer: &TextAnalyzer, text: &str) -> Vec<(usize, String)> {
    let mut analyzer = analyzer.clone();
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while stream.advance() {
        let token = stream.token();
        tokens.push((token.position, token.text.clone()));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(kind: TokenizerKind, text: &str) -> Vec<String> {
        analyze(&build_analyzer(kind), text)
            .into_iter()
            .map(|(_, t)| t)
            .collect()
    }

    #[test]
    fn test_standard_lowercases_and_splits() {
        assert_eq!(
            texts(TokenizerKind::Standard, "Roller Weblogger, PLANET-feeds"),
            vec!["roller", "weblogger", "planet", "feeds"]
        );
    }

    #[test]
    fn test_standard_positions_are_sequential() {
        let tokens = analyze(&build_analyzer(TokenizerKind::Standard), "a b c");
        let positions: Vec<_> = tokens.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_long_tokens_are_dropped() {
        let long = "x".repeat(MAX_TOKEN_LEN + 1);
        assert_eq!(texts(TokenizerKind::Standard, &format!("keep {long}")), vec!["keep"]);
    }

    #[test]
    fn test_jieba_segments_chinese() {
        let tokens = texts(TokenizerKind::Jieba, "博客搜索");
        assert!(tokens.len() >= 2, "expected segmentation, got {tokens:?}");
    }
}
