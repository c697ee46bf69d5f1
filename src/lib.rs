//! Athenaeum: a self-contained full-text book search engine.
//!
//! Tokenization and inverted-index construction, BM25 scoring fused with a
//! graph-based authority score, IDF-weighted Jaccard similarity, an
//! iterative PageRank/PPR solver, TF-IDF cosine similarity, a regex
//! vocabulary matcher backed by a lazy-DFA cache, fuzzy query expansion via
//! Levenshtein, and highlighted-snippet extraction, all wired behind one
//! `Engine` handle over a SQLite-backed store.
//!
//! # Example
//!
//! ```no_run
//! use athenaeum::prelude::*;
//!
//! let engine = Engine::open_in_memory().unwrap();
//! let meta = BookMeta {
//!     title: "Leaves of Grass".into(),
//!     author: "Walt Whitman".into(),
//!     file_path: "leaves.txt".into(),
//!     cover_image_path: None,
//! };
//! engine.index_book(&meta, "I celebrate myself, and sing myself").unwrap();
//!
//! let params = SearchParams { query: "myself".into(), ..Default::default() };
//! let response = engine.search(&params, |_| None).unwrap();
//! println!("found {} books", response.results.len());
//! ```

pub mod config;
pub mod error;
pub mod fuzzy;
pub mod graph;
pub mod highlight;
pub mod index;
pub mod models;
pub mod pagerank;
pub mod regexmatch;
pub mod scoring;
pub mod search;
pub mod semantic;
pub mod store;
pub mod tokenizer;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{Config, ConfigKey};
    pub use crate::error::{EngineError, EngineResult, StoreError, StoreResult};
    pub use crate::fuzzy::{levenshtein_distance, FuzzyMatcher};
    pub use crate::models::{
        AdminProgress, Book, BookMeta, CorpusState, JaccardEdge, LibraryMetadata, ProgressSignal,
        SearchField, SearchParams, SearchResponse, SearchResult, SimilarBook, Snippet,
        Suggestion, TermStats,
    };
    pub use crate::pagerank::RankMetrics;
    pub use crate::regexmatch::{find_matching_terms, Matcher};
    pub use crate::search::Engine;
    pub use crate::store::Store;
}

pub use models::{Book, BookMeta, SearchParams, SearchResponse};
pub use search::Engine;
