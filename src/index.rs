//! Index builder: populates the inverted index and term statistics from
//! book text, keeping writes for one book inside a single transaction.
//!
//! File I/O for book texts is treated as an external collaborator, so these
//! operations take already-loaded text rather than a path; the caller (the
//! admin CLI, or an HTTP handler) is responsible for reading the
//! Gutenberg-fetched file and handing the core its contents.

use crate::config::TokenizerConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{Book, BookMeta, LibraryMetadata, Posting};
use crate::store::Store;
use crate::tokenizer;

/// Default number of postings written per transaction chunk.
pub const DEFAULT_POSTING_BATCH_SIZE: usize = 500;

/// Tokenize `text` and convert the result into per-term postings for
/// `book_id`.
fn postings_from_text(book_id: i64, text: &str, config: &TokenizerConfig) -> (Vec<Posting>, usize) {
    let tokenized = tokenizer::tokenize(text, config);
    let postings = tokenized
        .positions
        .into_iter()
        .map(|(term, positions)| Posting {
            term_frequency: positions.len() as u32,
            term,
            book_id,
            positions,
        })
        .collect();
    (postings, tokenized.total_tokens)
}

/// Insert a book row, tokenize its text, write postings and term statistics
/// atomically, and return the book with its assigned ID and word count
/// filled in.
pub fn index_book(
    store: &mut Store,
    meta: &BookMeta,
    text: &str,
    config: &TokenizerConfig,
) -> EngineResult<Book> {
    let book_id = store.insert_book(meta)?;
    let (postings, total_tokens) = postings_from_text(book_id, text, config);

    store.write_postings(book_id, &postings, DEFAULT_POSTING_BATCH_SIZE)?;
    store.set_book_word_count(book_id, total_tokens as i64)?;

    store
        .get_book(book_id)?
        .ok_or_else(|| EngineError::ConsistencyError(format!("book {book_id} vanished after insert")))
}

/// Rewrite postings and statistics for an existing book, e.g. after
/// changing tokenizer settings. The book row (title, author, etc.) is
/// left untouched.
pub fn reindex_book(
    store: &mut Store,
    book_id: i64,
    text: &str,
    config: &TokenizerConfig,
) -> EngineResult<Book> {
    if store.get_book(book_id)?.is_none() {
        return Err(EngineError::NotFound(format!("book {book_id}")));
    }

    store.clear_postings_for_reindex(book_id)?;
    let (postings, total_tokens) = postings_from_text(book_id, text, config);
    store.write_postings(book_id, &postings, DEFAULT_POSTING_BATCH_SIZE)?;
    store.set_book_word_count(book_id, total_tokens as i64)?;

    store
        .get_book(book_id)?
        .ok_or_else(|| EngineError::ConsistencyError(format!("book {book_id} vanished during reindex")))
}

/// Delete a book's postings, term-stat contributions, graph edges, and
/// cached ranking, in one transaction.
pub fn remove_book(store: &mut Store, book_id: i64) -> EngineResult<()> {
    if store.get_book(book_id)?.is_none() {
        return Err(EngineError::NotFound(format!("book {book_id}")));
    }
    store.remove_book(book_id)?;
    Ok(())
}

/// Recompute aggregate library metadata from the store's current contents.
pub fn update_library_metadata(store: &Store) -> EngineResult<LibraryMetadata> {
    let total_books = store.book_count()?;
    let dfs = store.all_term_document_frequencies()?;
    let total_terms = dfs.len() as i64;

    let book_ids = store.all_book_ids()?;
    let mut total_words: i64 = 0;
    for &id in &book_ids {
        if let Some(book) = store.get_book(id)? {
            total_words += book.word_count;
        }
    }
    let avg_doc_length = if total_books > 0 {
        total_words as f64 / total_books as f64
    } else {
        0.0
    };

    let mut metadata = store.load_library_metadata()?;
    metadata.total_books = total_books;
    metadata.total_terms = total_terms;
    metadata.total_words = total_words;
    metadata.avg_doc_length = avg_doc_length;
    metadata.jaccard_edges = store.all_jaccard_edges()?.len() as i64;
    metadata.pagerank_calculated = !store.pagerank_is_empty()?;

    store.update_library_metadata(&metadata)?;
    Ok(metadata)
}
