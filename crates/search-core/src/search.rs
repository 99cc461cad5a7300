// search-core/src/search.rs
//! 搜索模块 - 查询执行与排序

use std::cmp::Ordering;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query as TantivyQuery, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{DocAddress, TantivyDocument};
use tracing::debug;

use crate::error::{QueryParseError, SearchError};
use crate::models::{ContentKind, SearchResult};
use crate::query_executor::QueryCompiler;
use crate::store::IndexStore;

/// 搜索请求 - 分页与可选的站点过滤
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    /// Number of ranked results to skip
    pub offset: usize,
    pub site_id: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            max_results,
            offset: 0,
            site_id: None,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn in_site(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }
}

/// Run a query, returning at most `max_results` hits by descending score.
///
/// A malformed query is a `SearchError::Parse`, never an empty result.
pub fn search(
    store: &IndexStore,
    query_text: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>, SearchError> {
    search_request(store, &SearchRequest::new(query_text, max_results))
}

/// Run a request.
///
/// The whole trimmed query also matches as an exact identity, so any id the
/// mapper accepts finds its own document even when it is not valid DSL.
pub fn search_request(
    store: &IndexStore,
    request: &SearchRequest,
) -> Result<Vec<SearchResult>, SearchError> {
    let text = request.query.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let fields = store.fields();
    let identity: Box<dyn TantivyQuery> = Box::new(TermQuery::new(
        tantivy::Term::from_field_text(fields.id, text),
        IndexRecordOption::Basic,
    ));
    let compiled: Box<dyn TantivyQuery> = match query::parse(text) {
        Ok(parsed) => Box::new(BooleanQuery::new(vec![
            (
                Occur::Should,
                QueryCompiler::new(fields, store.analyzer()).compile(&parsed),
            ),
            (Occur::Should, identity),
        ])),
        Err(e) if store.open_for_read()?.count_identity(fields, text)? > 0 => {
            debug!(query = %request.query, error = %e, "Query is not DSL, matching it as an identity");
            identity
        }
        Err(e) => {
            debug!(query = %request.query, error = %e, "Rejected search query");
            return Err(QueryParseError::from(e).into());
        }
    };
    if request.max_results == 0 {
        return Ok(Vec::new());
    }

    let compiled: Box<dyn TantivyQuery> = match &request.site_id {
        Some(site_id) => Box::new(BooleanQuery::new(vec![
            (Occur::Must, compiled),
            (
                Occur::Must,
                Box::new(TermQuery::new(
                    tantivy::Term::from_field_text(fields.site, site_id),
                    IndexRecordOption::Basic,
                )),
            ),
        ])),
        None => compiled,
    };

    let reader = store.open_for_read()?;
    let searcher = reader.searcher();
    let limit = request.offset.saturating_add(request.max_results);
    let mut hits: Vec<(f32, DocAddress)> = searcher.search(compiled.as_ref(), &TopDocs::with_limit(limit))?;
    hits.sort_by(|(score_a, addr_a), (score_b, addr_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| addr_a.cmp(addr_b))
    });

    let mut results = Vec::with_capacity(hits.len().min(request.max_results));
    for (score, address) in hits.into_iter().skip(request.offset).take(request.max_results) {
        let doc: TantivyDocument = searcher.doc(address)?;
        let text = |field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        results.push(SearchResult {
            id: text(fields.id),
            score,
            kind: ContentKind::parse(&text(fields.kind)),
            site_id: text(fields.site),
        });
    }

    debug!(query = %request.query, hits = results.len(), "Search finished");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndexConfig, RetryPolicy};
    use crate::mapper::map_to_document;
    use crate::models::ContentItem;
    use crate::operations::update_documents;
    use chrono::{Duration, Utc};
    use rstest::*;

    #[fixture]
    fn store() -> IndexStore {
        let store = IndexStore::create_in_ram(IndexConfig::default()).unwrap();
        let now = Utc::now();
        let items = vec![
            ContentItem::new("post-1", ContentKind::Post, "main")
                .with_title("Roller release notes")
                .with_body("<p>The new <b>Roller</b> release ships a Planet aggregator.</p>")
                .with_author("Dave Johnson")
                .with_categories(["Java"])
                .with_tags(["release", "planet"])
                .with_published(now - Duration::days(2)),
            ContentItem::new("post-2", ContentKind::Post, "main")
                .with_title("Gardening")
                .with_body("Tomatoes and roller blinds")
                .with_author("Alice")
                .with_categories(["Home"])
                .with_published(now - Duration::days(40)),
            ContentItem::new("comment-1", ContentKind::Comment, "main")
                .with_body("Great release, thanks!")
                .with_author("Bob")
                .with_published(now - Duration::days(1)),
            ContentItem::new("entry-1", ContentKind::FeedEntry, "planet")
                .with_title("Release notes from elsewhere")
                .with_body("Another weblog released something")
                .with_published(now - Duration::days(3)),
        ];
        let docs: Vec<_> = items.iter().map(|i| map_to_document(i).unwrap()).collect();
        update_documents(&store, &docs, &RetryPolicy::none()).unwrap();
        store
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    #[rstest]
    fn test_bare_term_matches_body_and_title(store: IndexStore) {
        let results = search(&store, "roller", 10).unwrap();
        let found = ids(&results);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&"post-1"));
        assert!(found.contains(&"post-2"));
    }

    #[rstest]
    fn test_results_bounded_and_ordered(store: IndexStore) {
        let results = search(&store, "release OR roller OR notes", 2).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[rstest]
    fn test_search_by_identity(store: IndexStore) {
        let results = search(&store, "comment-1", 10).unwrap();
        assert_eq!(ids(&results), vec!["comment-1"]);
        assert_eq!(results[0].kind, Some(ContentKind::Comment));
        assert_eq!(results[0].site_id, "main");
    }

    #[rstest]
    fn test_malformed_query_is_error(store: IndexStore) {
        assert!(matches!(search(&store, "title:", 10), Err(SearchError::Parse(_))));
        assert!(matches!(search(&store, "(roller", 10), Err(SearchError::Parse(_))));
    }

    #[rstest]
    fn test_unparseable_identity_falls_back_to_exact_match(store: IndexStore) {
        let item = ContentItem::new("urn:post:7", ContentKind::Post, "main").with_body("x");
        update_documents(&store, &[map_to_document(&item).unwrap()], &RetryPolicy::none()).unwrap();
        assert_eq!(ids(&search(&store, "urn:post:7", 10).unwrap()), vec!["urn:post:7"]);
        assert!(matches!(search(&store, "urn:post:8", 10), Err(SearchError::Parse(_))));
    }

    #[rstest]
    fn test_no_match_is_empty_ok(store: IndexStore) {
        assert!(search(&store, "zeppelin", 10).unwrap().is_empty());
    }

    #[rstest]
    #[case("title:\"release notes\"", vec!["entry-1", "post-1"])]
    #[case("author:dave", vec!["post-1"])]
    #[case("category:Java", vec!["post-1"])]
    #[case("category:java", vec![])]
    #[case("tag:planet", vec!["post-1"])]
    #[case("tag:PLANET", vec!["post-1"])]
    #[case("kind:comment", vec!["comment-1"])]
    #[case("site:planet", vec!["entry-1"])]
    #[case("release AND NOT kind:comment AND site:main", vec!["post-1"])]
    #[case("published:>7d AND roller", vec!["post-1"])]
    #[case("published:<30d", vec!["post-2"])]
    fn test_field_queries(store: IndexStore, #[case] query: &str, #[case] expected: Vec<&str>) {
        let results = search(&store, query, 10).unwrap();
        let mut found = ids(&results);
        found.sort();
        assert_eq!(found, expected, "query {query}");
    }

    #[rstest]
    fn test_site_restriction_and_offset(store: IndexStore) {
        let all = search_request(&store, &SearchRequest::new("release OR notes", 10)).unwrap();
        let main_only =
            search_request(&store, &SearchRequest::new("release OR notes", 10).in_site("main"))
                .unwrap();
        assert!(main_only.iter().all(|r| r.site_id == "main"));
        assert!(main_only.len() < all.len());

        let page = search_request(
            &store,
            &SearchRequest::new("release OR notes", 10).with_offset(1),
        )
        .unwrap();
        assert_eq!(page.len(), all.len() - 1);
        assert_eq!(page[0], all[1]);
    }

    #[rstest]
    fn test_zero_and_blank(store: IndexStore) {
        assert!(search(&store, "roller", 0).unwrap().is_empty());
        assert!(search(&store, "   ", 10).unwrap().is_empty());
        assert!(matches!(search(&store, "title:", 0), Err(SearchError::Parse(_))));
    }

    #[rstest]
    fn test_repeated_search_is_stable(store: IndexStore) {
        let first = search(&store, "release", 10).unwrap();
        let second = search(&store, "release", 10).unwrap();
        assert_eq!(first, second);
    }
}
