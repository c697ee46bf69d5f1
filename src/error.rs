//! Error types for the storage layer and the search engine.

use thiserror::Error;

/// Errors surfaced by the SQLite-backed store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("book not found: {0}")]
    BookNotFound(i64),
    #[error("invalid posting blob for term {term:?} in book {book_id}")]
    InvalidPostingBlob { term: String, book_id: i64 },
}

/// Errors surfaced by the public engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Empty query after tokenization, negative limit, malformed regex, out-of-range count.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown book ID.
    #[error("not found: {0}")]
    NotFound(String),

    /// A precondition for the operation was not met (e.g. PageRank with no edges).
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Underlying persistence error, always surfaced with cause.
    #[error("store failure: {0}")]
    StoreFailure(#[from] StoreError),

    /// Invariants violated; indicates corruption. Not recovered from.
    #[error("consistency error: {0}")]
    ConsistencyError(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
pub type StoreResult<T> = Result<T, StoreError>;
