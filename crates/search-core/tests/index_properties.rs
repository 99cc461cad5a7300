use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::thread;

use search_core::{
    ContentItem, ContentKind, IndexConfig, IndexError, IndexStore, MemoryContentRepository,
    SearchError, map_to_document, rebuild_all, search, update_document,
};
use rstest::rstest;
use tempfile::TempDir;

fn on_disk() -> (TempDir, IndexStore) {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(IndexConfig::default().with_storage_path(dir.path())).unwrap();
    (dir, store)
}

fn repository(count: usize) -> MemoryContentRepository {
    (0..count)
        .map(|i| {
            ContentItem::new(format!("post-{i:04}"), ContentKind::Post, "main")
                .with_title(format!("Entry number {i}"))
                .with_body(if i == 617 {
                    "the quokka appears exactly once".to_string()
                } else {
                    format!("ordinary weblog text {i}")
                })
        })
        .collect()
}

#[test]
fn rebuild_all_then_search_finds_known_term() {
    let (_dir, store) = on_disk();
    let repo = repository(1_200);

    let report = rebuild_all(&store, &repo, &AtomicBool::new(false), |_| {}).unwrap();
    assert_eq!(report.indexed, 1_200);
    assert_eq!(report.batches, 3);

    let results = search(&store, "quokka", 10).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "post-0617");
}

#[test]
fn added_item_is_found_by_identity() {
    let (_dir, store) = on_disk();
    let item = ContentItem::new("comment-9", ContentKind::Comment, "main").with_body("hi");
    update_document(&store, map_to_document(&item).unwrap()).unwrap();

    let results = search(&store, "id:comment-9", 5).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "comment-9");
}

#[rstest]
#[case("urn:post:1")]
#[case("NOT")]
#[case("AND")]
#[case("post 7")]
#[case("a(b)")]
#[case("x!y")]
#[case("c++ & d")]
#[case("title:")]
#[case(r#"say "hi""#)]
fn any_accepted_identity_finds_itself(#[case] id: &str) {
    let (_dir, store) = on_disk();
    let item = ContentItem::new(id, ContentKind::Post, "main").with_body("unrelated words");
    let other = ContentItem::new("post-other", ContentKind::Post, "main").with_body("post 7 a b");
    update_document(&store, map_to_document(&item).unwrap()).unwrap();
    update_document(&store, map_to_document(&other).unwrap()).unwrap();

    let results = search(&store, id, 5).unwrap();
    assert!(
        results.iter().any(|r| r.id == id),
        "{id:?} not found in {results:?}"
    );
}

#[test]
fn search_never_exceeds_limit_and_scores_do_not_increase() {
    let (_dir, store) = on_disk();
    rebuild_all(&store, &repository(50), &AtomicBool::new(false), |_| {}).unwrap();

    for n in [1, 5, 49, 50, 100] {
        let results = search(&store, "weblog OR entry", n).unwrap();
        assert!(results.len() <= n);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

#[test]
fn malformed_query_is_distinct_from_no_results() {
    let (_dir, store) = on_disk();
    assert!(matches!(search(&store, "title:", 10), Err(SearchError::Parse(_))));
    assert!(search(&store, "title:nothing", 10).unwrap().is_empty());
}

#[test]
fn concurrent_writer_is_locked_until_first_closes() {
    let (_dir, store) = on_disk();
    let store = Arc::new(store);

    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let holder = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let handle = store.open_for_write().unwrap();
            held_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            handle.commit().unwrap();
        })
    };

    held_rx.recv().unwrap();
    let contender = {
        let store = Arc::clone(&store);
        thread::spawn(move || matches!(store.open_for_write(), Err(IndexError::Locked)))
    };
    assert!(contender.join().unwrap());

    release_tx.send(()).unwrap();
    holder.join().unwrap();
    assert!(store.open_for_write().is_ok());
}

#[test]
fn readers_keep_snapshot_while_writer_commits() {
    let (_dir, store) = on_disk();
    let reader = store.open_for_read().unwrap();

    let item = ContentItem::new("post-1", ContentKind::Post, "main").with_body("fresh");
    update_document(&store, map_to_document(&item).unwrap()).unwrap();

    assert_eq!(reader.num_docs(), 0);
    assert_eq!(search(&store, "fresh", 10).unwrap().len(), 1);
}
