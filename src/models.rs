//! Data structures shared across the search engine pipeline.

use serde::{Deserialize, Serialize};

/// A book row as persisted by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub file_path: String,
    pub cover_image_path: Option<String>,
    pub word_count: i64,
    pub created_at: String,
    pub click_count: i64,
}

/// Metadata supplied by the admin caller when ingesting a new book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMeta {
    pub title: String,
    pub author: String,
    pub file_path: String,
    pub cover_image_path: Option<String>,
}

/// One posting: a term's occurrences within a single book.
///
/// `positions` are strictly increasing character offsets into the book's
/// original text, per the tokenizer's contract -- never token indices.
#[derive(Debug, Clone)]
pub struct Posting {
    pub term: String,
    pub book_id: i64,
    pub term_frequency: u32,
    pub positions: Vec<u32>,
}

/// Denormalized per-term statistics kept consistent by the index builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermStats {
    pub document_frequency: u64,
    pub total_frequency: u64,
}

/// An undirected Jaccard similarity edge in canonical orientation
/// (`book_id_1 < book_id_2`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JaccardEdge {
    pub book_id_1: i64,
    pub book_id_2: i64,
    pub similarity: f64,
}

/// Aggregate library metadata, recomputed by `update_library_metadata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryMetadata {
    pub total_books: i64,
    pub total_terms: i64,
    pub avg_doc_length: f64,
    pub total_words: i64,
    pub jaccard_edges: i64,
    pub pagerank_calculated: bool,
    pub last_gutenberg_id: Option<i64>,
}

/// Lifecycle state of the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CorpusState {
    Empty,
    Indexed,
    Graphed,
    Ranked,
}

/// Which book field a query term should be matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchField {
    Content,
    Title,
    Author,
}

/// Parameters for `Engine::search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub fields: Vec<SearchField>,
    pub fuzzy: bool,
    pub fuzzy_max_distance: usize,
    pub limit: usize,
    pub offset: usize,
    pub author_filter: Option<String>,
    pub min_word_count: Option<i64>,
    pub max_word_count: Option<i64>,
    pub min_authority_score: Option<f64>,
    pub highlight: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            fields: vec![SearchField::Content],
            fuzzy: false,
            fuzzy_max_distance: 2,
            limit: 20,
            offset: 0,
            author_filter: None,
            min_word_count: None,
            max_word_count: None,
            min_authority_score: None,
            highlight: true,
        }
    }
}

/// A highlighted snippet extracted around one or more query-term hits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub text: String,
    pub matched_terms: Vec<String>,
    pub start_offset: usize,
}

/// One scored book in a search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub book: Book,
    pub score: f64,
    pub bm25_score: f64,
    pub authority_score: f64,
    pub snippets: Vec<Snippet>,
}

/// The full response of a search call, including timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub matched_terms: Vec<String>,
    pub total_candidates: usize,
    pub execution_time_ms: f64,
}

/// A suggested related book returned by `get_suggestions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub book: Book,
    pub score: f64,
    pub similarity: f64,
}

/// Result of `find_similar`: a book ranked by TF-IDF cosine similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarBook {
    pub book: Book,
    pub cosine_similarity: f64,
}

/// Progress reported by long-running, cancellable admin operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminProgress {
    pub batches_done: usize,
    pub batches_total: usize,
    pub items_done: usize,
    pub items_total: usize,
}

/// Outcome of a call to an admin operation's progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSignal {
    Continue,
    Cancel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_params_defaults_match_spec() {
        let p = SearchParams::default();
        assert_eq!(p.limit, 20);
        assert_eq!(p.offset, 0);
        assert_eq!(p.fuzzy_max_distance, 2);
        assert_eq!(p.fields, vec![SearchField::Content]);
    }

    #[test]
    fn corpus_state_ordering() {
        assert!(CorpusState::Empty < CorpusState::Indexed);
        assert!(CorpusState::Indexed < CorpusState::Graphed);
        assert!(CorpusState::Graphed < CorpusState::Ranked);
    }
}
