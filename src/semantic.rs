//! TF-IDF cosine similarity: finds books whose vocabulary distribution is
//! close to a given book's, independent of the Jaccard graph.
//!
//! Each book's TF-IDF vector is computed once and cached by the caller;
//! ranking a query book against the rest of the corpus is then a pure
//! pairwise scoring pass over those precomputed vectors.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::error::{EngineError, EngineResult};
use crate::store::Store;

/// A book's TF-IDF vector, represented sparsely as term -> weight.
#[derive(Debug, Clone, Default)]
pub struct TfIdfVector {
    pub weights: BTreeMap<String, f64>,
    pub norm: f64,
}

fn build_vector(term_frequencies: &BTreeMap<String, u32>, idf: &BTreeMap<String, f64>) -> TfIdfVector {
    let mut weights = BTreeMap::new();
    for (term, &tf) in term_frequencies {
        if let Some(&term_idf) = idf.get(term) {
            weights.insert(term.clone(), tf as f64 * term_idf);
        }
    }
    let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
    TfIdfVector { weights, norm }
}

/// Compute the corpus-wide IDF for every term in the vocabulary:
/// `ln(N / df(t))`, matching the weighting used by the Jaccard graph and
/// BM25 scorer so the three similarity notions stay comparable.
pub fn corpus_idf(store: &Store) -> EngineResult<BTreeMap<String, f64>> {
    let n = store.book_count()?;
    if n == 0 {
        return Ok(BTreeMap::new());
    }
    let dfs = store.all_term_document_frequencies()?;
    Ok(dfs
        .into_iter()
        .filter(|&(_, df)| df > 0)
        .map(|(term, df)| (term, (n as f64 / df as f64).ln()))
        .collect())
}

/// Build (and cache, via the caller) the TF-IDF vector for one book.
pub fn vector_for_book(store: &Store, book_id: i64, idf: &BTreeMap<String, f64>) -> EngineResult<TfIdfVector> {
    let tf = store.terms_for_book(book_id)?;
    Ok(build_vector(&tf, idf))
}

fn cosine(a: &TfIdfVector, b: &TfIdfVector) -> f64 {
    if a.norm == 0.0 || b.norm == 0.0 {
        return 0.0;
    }
    let (small, large) = if a.weights.len() <= b.weights.len() {
        (&a.weights, &b.weights)
    } else {
        (&b.weights, &a.weights)
    };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, &w)| large.get(term).map(|&w2| w * w2))
        .sum();
    dot / (a.norm * b.norm)
}

/// `findSimilar`: rank every other book in the corpus by TF-IDF cosine
/// similarity to `book_id`. Brute force, parallelized with rayon since the
/// corpus-wide vector set fits comfortably in memory.
pub fn find_similar(
    store: &Store,
    book_id: i64,
    limit: usize,
    min_similarity: f64,
) -> EngineResult<Vec<(i64, f64)>> {
    let idf = corpus_idf(store)?;
    let target = vector_for_book(store, book_id, &idf)?;
    if target.weights.is_empty() {
        return Err(EngineError::PreconditionFailed(format!(
            "book {book_id} has no indexed terms"
        )));
    }

    let all_ids = store.all_book_ids()?;
    let mut scored: Vec<(i64, f64)> = all_ids
        .par_iter()
        .filter(|&&id| id != book_id)
        .filter_map(|&id| {
            let vector = vector_for_book(store, id, &idf).ok()?;
            let sim = cosine(&target, &vector);
            if sim >= min_similarity {
                Some((id, sim))
            } else {
                None
            }
        })
        .collect();

    scored.sort_unstable_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
    scored.truncate(limit);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenizerConfig;
    use crate::index::index_book;
    use crate::models::BookMeta;
    use crate::store::Store;

    fn meta(title: &str) -> BookMeta {
        BookMeta {
            title: title.into(),
            author: "Author".into(),
            file_path: format!("/books/{title}.txt"),
            cover_image_path: None,
        }
    }

    #[test]
    fn identical_books_have_cosine_similarity_near_one() {
        let mut store = Store::open_in_memory().unwrap();
        let cfg = TokenizerConfig {
            min_word_length: 1,
            remove_stop_words: false,
            case_sensitive: false,
            keep_positions: true,
        };
        let a = index_book(&mut store, &meta("A"), "whale sea whale storm", &cfg).unwrap();
        let b = index_book(&mut store, &meta("B"), "whale sea whale storm", &cfg).unwrap();
        index_book(&mut store, &meta("C"), "bank finance loan credit", &cfg).unwrap();

        let results = find_similar(&store, a.id, 10, 0.0).unwrap();
        let (top_id, top_sim) = results[0];
        assert_eq!(top_id, b.id);
        assert!((top_sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unrelated_book_scores_low() {
        let mut store = Store::open_in_memory().unwrap();
        let cfg = TokenizerConfig {
            min_word_length: 1,
            remove_stop_words: false,
            case_sensitive: false,
            keep_positions: true,
        };
        let a = index_book(&mut store, &meta("A"), "whale sea storm wave", &cfg).unwrap();
        index_book(&mut store, &meta("B"), "bank finance loan credit", &cfg).unwrap();

        let results = find_similar(&store, a.id, 10, 0.0).unwrap();
        assert!(results.iter().all(|&(_, sim)| sim < 0.3));
    }

    #[test]
    fn book_with_no_terms_is_a_precondition_failure() {
        let mut store = Store::open_in_memory().unwrap();
        let book = store
            .insert_book(&meta("Empty"))
            .unwrap();
        let err = find_similar(&store, book, 10, 0.0).unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed(_)));
    }
}
