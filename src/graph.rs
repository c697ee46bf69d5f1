//! Jaccard graph builder: builds a k-NN book similarity graph under
//! IDF-weighted Jaccard similarity.
//!
//! Avoids an O(N^2) comparison by indexing candidates through a shared
//! term key, the same trick as a shingle-based near-duplicate index,
//! generalized from n-gram shingles to vocabulary terms.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::JaccardConfig;
use crate::error::EngineResult;
use crate::models::{AdminProgress, JaccardEdge, ProgressSignal};
use crate::store::Store;

/// Per-book scratch state built once per `build_graph`/`add_books_to_graph`
/// call: the set of surviving (non dynamic-stop-word) term ids a book
/// contains, and the IDF mass of that set.
struct Corpus {
    /// term -> interned id, restricted to terms surviving the dynamic
    /// stop-word filter (df(t)/N <= maxTermFrequency).
    term_id: HashMap<String, u32>,
    idf: Vec<f64>,
    book_term_ids: BTreeMap<i64, HashSet<u32>>,
    book_idf_sum: BTreeMap<i64, f64>,
}

fn build_corpus(store: &Store, config: &JaccardConfig) -> EngineResult<Corpus> {
    let n = store.book_count()?.max(0) as u64;
    let dfs = store.all_term_document_frequencies()?;

    let mut term_id = HashMap::new();
    let mut idf = Vec::new();
    if n > 0 {
        for (term, df) in &dfs {
            if *df == 0 {
                continue;
            }
            let ratio = *df as f64 / n as f64;
            if ratio > config.max_term_frequency {
                continue; // dynamic stop-word filter
            }
            let id = idf.len() as u32;
            idf.push((n as f64 / *df as f64).ln());
            term_id.insert(term.clone(), id);
        }
    }

    let mut book_term_ids = BTreeMap::new();
    let mut book_idf_sum = BTreeMap::new();
    for book_id in store.all_book_ids()? {
        let terms = store.terms_for_book(book_id)?;
        let mut ids = HashSet::new();
        let mut sum = 0.0;
        for term in terms.keys() {
            if let Some(&id) = term_id.get(term) {
                if ids.insert(id) {
                    sum += idf[id as usize];
                }
            }
        }
        book_term_ids.insert(book_id, ids);
        book_idf_sum.insert(book_id, sum);
    }

    Ok(Corpus {
        term_id,
        idf,
        book_term_ids,
        book_idf_sum,
    })
}

fn intersection_idf_sum(a: &HashSet<u32>, b: &HashSet<u32>, idf: &[f64]) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter(|id| large.contains(id))
        .map(|&id| idf[id as usize])
        .sum()
}

fn jaccard_sim(corpus: &Corpus, a: i64, b: i64) -> f64 {
    let terms_a = &corpus.book_term_ids[&a];
    let terms_b = &corpus.book_term_ids[&b];
    let inter = intersection_idf_sum(terms_a, terms_b, &corpus.idf);
    let union = corpus.book_idf_sum[&a] + corpus.book_idf_sum[&b] - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Inverted index: surviving term id -> book ids containing it, used to
/// generate candidate pairs without an O(N^2) scan.
fn build_term_postings(corpus: &Corpus) -> HashMap<u32, Vec<i64>> {
    let mut postings: HashMap<u32, Vec<i64>> = HashMap::new();
    for (&book_id, ids) in &corpus.book_term_ids {
        for &id in ids {
            postings.entry(id).or_default().push(book_id);
        }
    }
    postings
}

/// Candidate pairs (a < b) among `drivers`, restricted to `candidates ⊇ drivers`,
/// with at least `min_shared` surviving terms in common.
fn candidate_pairs(
    corpus: &Corpus,
    postings: &HashMap<u32, Vec<i64>>,
    drivers: &[i64],
    min_shared: usize,
) -> Vec<(i64, i64)> {
    let mut pairs = Vec::new();
    for &a in drivers {
        let ids = match corpus.book_term_ids.get(&a) {
            Some(ids) => ids,
            None => continue,
        };
        let mut shared: HashMap<i64, usize> = HashMap::new();
        for id in ids {
            if let Some(books) = postings.get(id) {
                for &other in books {
                    if other != a {
                        *shared.entry(other).or_default() += 1;
                    }
                }
            }
        }
        for (b, count) in shared {
            if count >= min_shared && b > a {
                pairs.push((a, b));
            } else if count >= min_shared && b < a && !drivers.contains(&b) {
                // The other endpoint will never drive this pair itself
                // (it's outside the driver set, e.g. an existing book
                // during an incremental add) -- canonicalize here.
                pairs.push((b, a));
            }
        }
    }
    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

/// Truncate every book's candidate-neighbour buffer to the top `k` by
/// similarity. Called periodically during accumulation once a buffer grows
/// past `2*k`, and once more as a final pass.
fn truncate_buffers(buffers: &mut HashMap<i64, Vec<(i64, f64)>>, k: usize) {
    for list in buffers.values_mut() {
        list.sort_unstable_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        list.truncate(k);
    }
}

/// Repair pass enforcing the hard invariant "at most K edges incident to
/// every book", which a pure per-book top-K selection can violate
/// asymmetrically when book A keeps an edge to B that B itself did not
/// keep among its own top-K.
fn enforce_degree_cap(edges: &mut HashMap<(i64, i64), f64>, k: usize) {
    loop {
        let mut degree: HashMap<i64, Vec<(i64, i64, f64)>> = HashMap::new();
        for (&(a, b), &sim) in edges.iter() {
            degree.entry(a).or_default().push((a, b, sim));
            degree.entry(b).or_default().push((a, b, sim));
        }
        let worst = degree
            .iter()
            .filter(|(_, v)| v.len() > k)
            .min_by(|a, b| {
                let min_sim_a = a
                    .1
                    .iter()
                    .map(|e| e.2)
                    .fold(f64::INFINITY, f64::min);
                let min_sim_b = b
                    .1
                    .iter()
                    .map(|e| e.2)
                    .fold(f64::INFINITY, f64::min);
                min_sim_a.partial_cmp(&min_sim_b).unwrap()
            });
        let Some((_, edges_of_worst)) = worst else {
            break;
        };
        let mut sorted = edges_of_worst.clone();
        sorted.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap());
        if let Some(&(a, b, _)) = sorted.first() {
            edges.remove(&(a, b));
        } else {
            break;
        }
    }
}

fn canonical_edges_from_buffers(buffers: &HashMap<i64, Vec<(i64, f64)>>) -> HashMap<(i64, i64), f64> {
    let mut edges = HashMap::new();
    for (&book, neighbours) in buffers {
        for &(other, sim) in neighbours {
            let key = if book < other { (book, other) } else { (other, book) };
            edges.entry(key).or_insert(sim);
        }
    }
    edges
}

/// Full rebuild of the similarity graph.
pub fn build_graph(
    store: &mut Store,
    config: &JaccardConfig,
    mut progress: impl FnMut(AdminProgress) -> ProgressSignal,
) -> EngineResult<usize> {
    let corpus = build_corpus(store, config)?;
    let postings = build_term_postings(&corpus);
    let all_books: Vec<i64> = corpus.book_term_ids.keys().copied().collect();

    let mut buffers: HashMap<i64, Vec<(i64, f64)>> = HashMap::new();
    let batches: Vec<&[i64]> = all_books.chunks(config.batch_size.max(1)).collect();
    let total_batches = batches.len();

    for (batch_idx, batch) in batches.into_iter().enumerate() {
        let pairs = candidate_pairs(&corpus, &postings, batch, config.min_shared_terms);
        for (a, b) in pairs {
            let sim = jaccard_sim(&corpus, a, b);
            if sim >= config.threshold {
                buffers.entry(a).or_default().push((b, sim));
                buffers.entry(b).or_default().push((a, sim));
            }
        }
        for (_, list) in buffers.iter_mut() {
            if list.len() > 2 * config.top_k {
                list.sort_unstable_by(|x, y| y.1.partial_cmp(&x.1).unwrap());
                list.truncate(config.top_k);
            }
        }

        let signal = progress(AdminProgress {
            batches_done: batch_idx + 1,
            batches_total: total_batches,
            items_done: 0,
            items_total: all_books.len(),
        });
        if signal == ProgressSignal::Cancel {
            // Leave the store untouched: the old edge table is only deleted
            // just before the new one is written.
            return Ok(0);
        }
    }

    truncate_buffers(&mut buffers, config.top_k);
    let mut edges = canonical_edges_from_buffers(&buffers);
    enforce_degree_cap(&mut edges, config.top_k);

    let edge_list: Vec<JaccardEdge> = edges
        .into_iter()
        .map(|((a, b), similarity)| JaccardEdge {
            book_id_1: a,
            book_id_2: b,
            similarity,
        })
        .collect();

    store.replace_jaccard_edges(&edge_list, 500)?;
    Ok(edge_list.len())
}

/// Extend the graph with newly indexed books without recomputing
/// similarities that don't involve them.
pub fn add_books_to_graph(
    store: &mut Store,
    new_book_ids: &[i64],
    config: &JaccardConfig,
    mut progress: impl FnMut(AdminProgress) -> ProgressSignal,
) -> EngineResult<usize> {
    let corpus = build_corpus(store, config)?;
    let postings = build_term_postings(&corpus);

    let mut buffers: HashMap<i64, Vec<(i64, f64)>> = HashMap::new();
    for edge in store.all_jaccard_edges()? {
        buffers
            .entry(edge.book_id_1)
            .or_default()
            .push((edge.book_id_2, edge.similarity));
        buffers
            .entry(edge.book_id_2)
            .or_default()
            .push((edge.book_id_1, edge.similarity));
    }

    let pairs = candidate_pairs(&corpus, &postings, new_book_ids, config.min_shared_terms);
    let total = pairs.len().max(1);
    for (idx, (a, b)) in pairs.into_iter().enumerate() {
        let sim = jaccard_sim(&corpus, a, b);
        if sim >= config.threshold {
            buffers.entry(a).or_default().push((b, sim));
            buffers.entry(b).or_default().push((a, sim));
        }
        if idx % config.batch_size.max(1) == 0 {
            let signal = progress(AdminProgress {
                batches_done: idx / config.batch_size.max(1),
                batches_total: total / config.batch_size.max(1) + 1,
                items_done: idx,
                items_total: total,
            });
            if signal == ProgressSignal::Cancel {
                return Ok(0);
            }
        }
    }

    truncate_buffers(&mut buffers, config.top_k);
    let mut edges = canonical_edges_from_buffers(&buffers);
    enforce_degree_cap(&mut edges, config.top_k);

    let edge_list: Vec<JaccardEdge> = edges
        .into_iter()
        .map(|((a, b), similarity)| JaccardEdge {
            book_id_1: a,
            book_id_2: b,
            similarity,
        })
        .collect();

    store.replace_jaccard_edges(&edge_list, 500)?;
    Ok(edge_list.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenizerConfig;
    use crate::index::index_book;
    use crate::models::BookMeta;

    fn meta(title: &str) -> BookMeta {
        BookMeta {
            title: title.into(),
            author: "Author".into(),
            file_path: format!("/books/{title}.txt"),
            cover_image_path: None,
        }
    }

    #[test]
    fn two_books_sharing_vocabulary_get_an_edge() {
        let mut store = Store::open_in_memory().unwrap();
        let tokenizer_config = TokenizerConfig {
            min_word_length: 1,
            remove_stop_words: false,
            case_sensitive: false,
            keep_positions: true,
        };
        let b1 = index_book(&mut store, &meta("Book1"), "hello world test", &tokenizer_config).unwrap();
        let b2 = index_book(&mut store, &meta("Book2"), "hello world foo", &tokenizer_config).unwrap();
        let b3 = index_book(&mut store, &meta("Book3"), "bar baz", &tokenizer_config).unwrap();

        let config = JaccardConfig {
            max_term_frequency: 1.0,
            min_shared_terms: 1,
            threshold: 0.1,
            top_k: 50,
            batch_size: 50,
        };

        let count = build_graph(&mut store, &config, |_| ProgressSignal::Continue).unwrap();
        assert!(count >= 1);

        let edges = store.all_jaccard_edges().unwrap();
        let has_edge = |x: i64, y: i64| {
            edges.iter().any(|e| {
                (e.book_id_1 == x.min(y) && e.book_id_2 == x.max(y))
            })
        };
        assert!(has_edge(b1.id, b2.id));
        assert!(!has_edge(b1.id, b3.id));
        assert!(!has_edge(b2.id, b3.id));

        let edge = edges
            .iter()
            .find(|e| e.book_id_1 == b1.id.min(b2.id) && e.book_id_2 == b1.id.max(b2.id))
            .unwrap();
        // idf(hello) = idf(world) = ln(3/2) ≈ 0.405465, idf(test) = idf(foo) = ln(3) ≈ 1.098612.
        // sim = (2*ln(3/2)) / (2*ln(3/2) + 2*ln(3)) ≈ 0.269582.
        assert!((edge.similarity - 0.269582).abs() < 1e-5);
    }

    #[test]
    fn degree_never_exceeds_k() {
        let mut store = Store::open_in_memory().unwrap();
        let tokenizer_config = TokenizerConfig {
            min_word_length: 1,
            remove_stop_words: false,
            case_sensitive: false,
            keep_positions: true,
        };
        // A hub book sharing a common term with many others.
        for i in 0..10 {
            index_book(
                &mut store,
                &meta(&format!("Book{i}")),
                "shared common term unique{i}",
                &tokenizer_config,
            )
            .unwrap();
        }
        let config = JaccardConfig {
            max_term_frequency: 1.0,
            min_shared_terms: 1,
            threshold: 0.01,
            top_k: 3,
            batch_size: 4,
        };
        build_graph(&mut store, &config, |_| ProgressSignal::Continue).unwrap();

        let edges = store.all_jaccard_edges().unwrap();
        let mut degree: HashMap<i64, usize> = HashMap::new();
        for e in &edges {
            *degree.entry(e.book_id_1).or_default() += 1;
            *degree.entry(e.book_id_2).or_default() += 1;
        }
        for (_, d) in degree {
            assert!(d <= config.top_k);
        }
    }
}
