//! Integration tests for athenaeum.
//!
//! These exercise the engine end to end against an on-disk database backed
//! by a temp file: ingest books, build the similarity graph, rank it, and
//! search/suggest/highlight against the result.

use athenaeum::models::{AdminProgress, BookMeta, ProgressSignal, SearchField, SearchParams};
use athenaeum::search::Engine;
use tempfile::NamedTempFile;

/// An on-disk database backing one test's `Engine`. The temp file is
/// created (but left empty) up front and removed when this, and the
/// `Engine` pointing at it, go out of scope.
fn open_engine() -> (Engine, NamedTempFile) {
    let db_file = NamedTempFile::new().unwrap();
    let engine = Engine::open(db_file.path()).unwrap();
    (engine, db_file)
}

fn book(title: &str, author: &str) -> BookMeta {
    BookMeta {
        title: title.into(),
        author: author.into(),
        file_path: format!("/corpus/{title}.txt"),
        cover_image_path: None,
    }
}

fn no_cancel(_: AdminProgress) -> ProgressSignal {
    ProgressSignal::Continue
}

#[test]
fn full_pipeline_index_graph_rank_search() {
    let (engine, _db_file) = open_engine();

    let moby = engine
        .index_book(
            &book("Moby Dick", "Herman Melville"),
            "call me ishmael the great white whale swims through the deep dark sea waves \
             crash against the ship near the shore",
        )
        .unwrap();
    let sea_wolf = engine
        .index_book(
            &book("The Sea Wolf", "Jack London"),
            "a ship sails through the deep dark sea waves the whale surfaces near the shore \
             at dusk",
        )
        .unwrap();
    let finance = engine
        .index_book(
            &book("Principles of Finance", "Eugene Fama"),
            "interest rates and loan terms govern the bank credit market",
        )
        .unwrap();

    engine.update_library_metadata().unwrap();
    assert_eq!(engine.build_graph(no_cancel).unwrap(), 1);

    let metrics = engine.calculate_page_rank().unwrap();
    assert!(metrics.converged);
    assert!((metrics.final_delta).abs() < 1e-4);

    let params = SearchParams {
        query: "whale sea".into(),
        limit: 10,
        ..SearchParams::default()
    };
    let response = engine.search(&params, |_| None).unwrap();
    let returned_ids: Vec<i64> = response.results.iter().map(|r| r.book.id).collect();
    assert!(returned_ids.contains(&moby.id));
    assert!(returned_ids.contains(&sea_wolf.id));
    assert!(!returned_ids.contains(&finance.id));

    // Scores are non-increasing.
    for pair in response.results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let suggestions = engine.get_suggestions(&[moby.id], 5).unwrap();
    assert!(suggestions.iter().any(|s| s.book.id == sea_wolf.id));
    assert!(!suggestions.iter().any(|s| s.book.id == moby.id));
}

#[test]
fn pagination_is_a_stable_slice_of_the_unpaged_ranking() {
    let (engine, _db_file) = open_engine();
    for i in 0..8 {
        engine
            .index_book(&book(&format!("Book {i}"), "Author"), "lighthouse keeper tends the lamp each night")
            .unwrap();
    }

    let unpaged = engine
        .search(
            &SearchParams { query: "lighthouse".into(), limit: 100, ..SearchParams::default() },
            |_| None,
        )
        .unwrap();

    let page = engine
        .search(
            &SearchParams { query: "lighthouse".into(), limit: 3, offset: 2, ..SearchParams::default() },
            |_| None,
        )
        .unwrap();

    let expected: Vec<i64> = unpaged.results[2..5].iter().map(|r| r.book.id).collect();
    let actual: Vec<i64> = page.results.iter().map(|r| r.book.id).collect();
    assert_eq!(expected, actual);
}

#[test]
fn bm25_ranks_higher_term_frequency_first() {
    let (engine, _db_file) = open_engine();
    let heavy = engine
        .index_book(
            &book("Heavy", "Author"),
            &"alpha ".repeat(10).trim().to_string(),
        )
        .unwrap();
    let light = engine
        .index_book(&book("Light", "Author"), "alpha beta gamma delta epsilon").unwrap();

    let response = engine
        .search(&SearchParams { query: "alpha".into(), ..SearchParams::default() }, |_| None)
        .unwrap();

    assert_eq!(response.results[0].book.id, heavy.id);
    assert_eq!(response.results[1].book.id, light.id);
}

#[test]
fn regex_search_matches_against_vocabulary_not_text() {
    let (engine, _db_file) = open_engine();
    engine.index_book(&book("Catalog", "Author"), "a catalog of cats and catfish").unwrap();
    engine.index_book(&book("Dogs", "Author"), "a pack of dogs and birds").unwrap();

    let response = engine
        .search_regex("cat.*", &SearchParams { limit: 10, ..SearchParams::default() }, |_| None)
        .unwrap();

    assert_eq!(response.results.len(), 1);
    assert!(response.matched_terms.contains(&"catalog".to_string()));
    assert!(response.matched_terms.contains(&"catfish".to_string()));
}

#[test]
fn fuzzy_search_expands_to_misspelled_vocabulary() {
    let (engine, _db_file) = open_engine();
    engine.index_book(&book("Greeting", "Author"), "hello world").unwrap();

    let params = SearchParams {
        query: "hallo".into(),
        fuzzy: true,
        fuzzy_max_distance: 1,
        ..SearchParams::default()
    };
    let response = engine.search(&params, |_| None).unwrap();
    assert_eq!(response.results.len(), 1);
}

#[test]
fn title_and_author_fields_are_matched_with_like() {
    let (engine, _db_file) = open_engine();
    let whitman = engine.index_book(&book("Leaves of Grass", "Walt Whitman"), "i celebrate myself").unwrap();
    engine.index_book(&book("Other Poems", "Someone Else"), "unrelated words entirely").unwrap();

    let params = SearchParams {
        query: "whitman".into(),
        fields: vec![SearchField::Author],
        ..SearchParams::default()
    };
    let response = engine.search(&params, |_| None).unwrap();
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].book.id, whitman.id);
}

#[test]
fn highlighted_snippets_wrap_matches_and_add_ellipsis() {
    let (engine, _db_file) = open_engine();
    let text = "The quick brown fox jumps over the lazy dog in the deep forest glade";
    engine.index_book(&book("Fox", "Author"), text).unwrap();

    let params = SearchParams { query: "fox".into(), highlight: true, ..SearchParams::default() };
    let response = engine.search(&params, |_| Some(text.to_string())).unwrap();

    let snippet = &response.results[0].snippets[0];
    assert!(snippet.text.contains("<mark>fox</mark>") || snippet.text.to_lowercase().contains("<mark>fox</mark>"));
}

#[test]
fn reindexing_replaces_postings_without_touching_book_metadata() {
    let (engine, _db_file) = open_engine();
    let book_row = engine.index_book(&book("Draft", "Author"), "first draft content here").unwrap();
    let updated = engine.reindex_book(book_row.id, "second revision entirely different text").unwrap();

    assert_eq!(updated.id, book_row.id);
    assert_eq!(updated.title, "Draft");

    let response = engine
        .search(&SearchParams { query: "first".into(), ..SearchParams::default() }, |_| None)
        .unwrap();
    assert!(response.results.is_empty());

    let response = engine
        .search(&SearchParams { query: "revision".into(), ..SearchParams::default() }, |_| None)
        .unwrap();
    assert_eq!(response.results.len(), 1);
}

#[test]
fn ranking_requires_graph_to_be_built_first() {
    let (engine, _db_file) = open_engine();
    engine.index_book(&book("Solo", "Author"), "a lone unindexed book").unwrap();
    let err = engine.calculate_page_rank().unwrap_err();
    assert!(matches!(err, athenaeum::error::EngineError::PreconditionFailed(_)));
}

#[test]
fn graph_build_requires_at_least_two_books() {
    let (engine, _db_file) = open_engine();
    engine.index_book(&book("Solo", "Author"), "a lone book").unwrap();
    let err = engine.build_graph(no_cancel).unwrap_err();
    assert!(matches!(err, athenaeum::error::EngineError::PreconditionFailed(_)));
}
