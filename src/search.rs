//! Search orchestrator: ties the tokenizer, index, graph, authority solver,
//! scorer, and highlighter together behind one engine handle.
//!
//! The engine loads its inputs, calls into the pure pipeline stages in
//! order, and reports progress on long-running admin operations. Since this
//! is a resident process rather than a one-shot CLI invocation, concurrency
//! is realized with an explicit `RwLock` guarding the store and live
//! configuration: searches take a read lock, admin mutations take a write
//! lock, and mutations serialize against each other and against readers.

use std::path::Path;
use std::sync::RwLock;
use std::time::Instant;

use crate::config::{Config, ConfigKey};
use crate::error::{EngineError, EngineResult};
use crate::fuzzy::FuzzyMatcher;
use crate::graph;
use crate::highlight;
use crate::index;
use crate::models::{
    AdminProgress, Book, BookMeta, CorpusState, ProgressSignal, SearchField, SearchParams,
    SearchResponse, SearchResult, SimilarBook, Suggestion,
};
use crate::pagerank::{self, RankMetrics};
use crate::regexmatch;
use crate::scoring::{self, CandidateStats};
use crate::semantic;
use crate::store::Store;
use crate::tokenizer;

/// The full engine: one store, one live configuration, guarded so mutations
/// serialize against each other and against readers (single-writer,
/// multi-reader).
pub struct Engine {
    store: RwLock<Store>,
    config: RwLock<Config>,
}

impl Engine {
    pub fn open(path: &Path) -> EngineResult<Self> {
        let store = Store::open(path)?;
        let config = store.load_config()?;
        Ok(Engine {
            store: RwLock::new(store),
            config: RwLock::new(config),
        })
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        let store = Store::open_in_memory()?;
        let config = store.load_config()?;
        Ok(Engine {
            store: RwLock::new(store),
            config: RwLock::new(config),
        })
    }

    fn lock_err<T>(_: T) -> EngineError {
        EngineError::ConsistencyError("store lock poisoned".into())
    }

    /// Current lifecycle state of the corpus.
    pub fn state(&self) -> EngineResult<CorpusState> {
        let store = self.store.read().map_err(Self::lock_err)?;
        if store.book_count()? == 0 {
            return Ok(CorpusState::Empty);
        }
        if store.jaccard_edges_is_empty()? {
            return Ok(CorpusState::Indexed);
        }
        if store.pagerank_is_empty()? {
            return Ok(CorpusState::Graphed);
        }
        Ok(CorpusState::Ranked)
    }

    pub fn config(&self) -> EngineResult<Config> {
        Ok(self.config.read().map_err(Self::lock_err)?.clone())
    }

    /// Set a single configuration value. Default-only keys (Jaccard
    /// threshold/topK/batchSize, all PageRank knobs) reject hot updates.
    pub fn set_config_value(&self, key: ConfigKey, value: &str) -> EngineResult<()> {
        if !key.hot_reloadable() {
            return Err(EngineError::PreconditionFailed(format!(
                "{} can only be changed via the default configuration, not hot-reloaded",
                key.as_str()
            )));
        }
        let store = self.store.write().map_err(Self::lock_err)?;
        store.set_config_value(key, value, kind_for(key))?;
        let mut config = self.config.write().map_err(Self::lock_err)?;
        *config = store.load_config()?;
        Ok(())
    }

    // -- admin: ingestion -------------------------------------------------

    pub fn index_book(&self, meta: &BookMeta, text: &str) -> EngineResult<Book> {
        let mut store = self.store.write().map_err(Self::lock_err)?;
        let config = self.config.read().map_err(Self::lock_err)?;
        index::index_book(&mut store, meta, text, &config.tokenizer)
    }

    pub fn reindex_book(&self, book_id: i64, text: &str) -> EngineResult<Book> {
        let mut store = self.store.write().map_err(Self::lock_err)?;
        let config = self.config.read().map_err(Self::lock_err)?;
        index::reindex_book(&mut store, book_id, text, &config.tokenizer)
    }

    pub fn remove_book(&self, book_id: i64) -> EngineResult<()> {
        let mut store = self.store.write().map_err(Self::lock_err)?;
        index::remove_book(&mut store, book_id)
    }

    pub fn update_library_metadata(&self) -> EngineResult<()> {
        let store = self.store.read().map_err(Self::lock_err)?;
        index::update_library_metadata(&store)?;
        Ok(())
    }

    // -- admin: graph & authority ------------------------------------------

    pub fn build_graph(
        &self,
        progress: impl FnMut(AdminProgress) -> ProgressSignal,
    ) -> EngineResult<usize> {
        let mut store = self.store.write().map_err(Self::lock_err)?;
        if store.book_count()? < 2 {
            return Err(EngineError::PreconditionFailed(
                "building the similarity graph requires at least 2 indexed books".into(),
            ));
        }
        let config = self.config.read().map_err(Self::lock_err)?;
        graph::build_graph(&mut store, &config.jaccard, progress)
    }

    pub fn add_books_to_graph(
        &self,
        new_book_ids: &[i64],
        progress: impl FnMut(AdminProgress) -> ProgressSignal,
    ) -> EngineResult<usize> {
        let mut store = self.store.write().map_err(Self::lock_err)?;
        let config = self.config.read().map_err(Self::lock_err)?;
        graph::add_books_to_graph(&mut store, new_book_ids, &config.jaccard, progress)
    }

    pub fn calculate_page_rank(&self) -> EngineResult<RankMetrics> {
        let mut store = self.store.write().map_err(Self::lock_err)?;
        if store.jaccard_edges_is_empty()? {
            return Err(EngineError::PreconditionFailed(
                "cannot calculate authority scores before the similarity graph is built".into(),
            ));
        }
        let config = self.config.read().map_err(Self::lock_err)?;
        let book_ids = store.all_book_ids()?;
        let edges = store.all_jaccard_edges()?;
        let (scores, metrics) = pagerank::page_rank(&book_ids, &edges, &config.pagerank)?;
        store.replace_pagerank(&scores)?;
        Ok(metrics)
    }

    pub fn calculate_personalized_page_rank(
        &self,
        seed_book_ids: &[i64],
    ) -> EngineResult<std::collections::BTreeMap<i64, f64>> {
        let store = self.store.read().map_err(Self::lock_err)?;
        let config = self.config.read().map_err(Self::lock_err)?;
        let book_ids = store.all_book_ids()?;
        let edges = store.all_jaccard_edges()?;
        let (scores, _) = pagerank::personalized_page_rank(&book_ids, &edges, seed_book_ids, &config.pagerank)?;
        Ok(scores)
    }

    // -- reads --------------------------------------------------------------

    pub fn record_click(&self, book_id: i64) -> EngineResult<()> {
        let store = self.store.write().map_err(Self::lock_err)?;
        store.record_click(book_id)?;
        Ok(())
    }

    /// `findSimilar`: TF-IDF cosine neighbours of `book_id`.
    pub fn find_similar(
        &self,
        book_id: i64,
        limit: usize,
        min_similarity: f64,
    ) -> EngineResult<Vec<SimilarBook>> {
        let store = self.store.read().map_err(Self::lock_err)?;
        let ranked = semantic::find_similar(&store, book_id, limit, min_similarity)?;
        let ids: Vec<i64> = ranked.iter().map(|&(id, _)| id).collect();
        let books = store.get_books(&ids)?;
        Ok(ranked
            .into_iter()
            .filter_map(|(id, sim)| {
                books.get(&id).map(|book| SimilarBook {
                    book: book.clone(),
                    cosine_similarity: sim,
                })
            })
            .collect())
    }

    /// `getSuggestions(results, limit)`: related books from the Jaccard
    /// neighbourhood of the top 3 results, excluding the results themselves.
    pub fn get_suggestions(&self, result_ids: &[i64], limit: usize) -> EngineResult<Vec<Suggestion>> {
        let store = self.store.read().map_err(Self::lock_err)?;
        if store.jaccard_edges_is_empty()? {
            return Err(EngineError::PreconditionFailed(
                "suggestions require the similarity graph to be built".into(),
            ));
        }

        let excluded: std::collections::HashSet<i64> = result_ids.iter().copied().collect();
        let mut best: std::collections::BTreeMap<i64, f64> = std::collections::BTreeMap::new();
        for &source in result_ids.iter().take(3) {
            let mut neighbours = store.neighbours_of(source)?;
            neighbours.sort_unstable_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap());
            neighbours.truncate(20);
            for edge in neighbours {
                let neighbour = if edge.book_id_1 == source {
                    edge.book_id_2
                } else {
                    edge.book_id_1
                };
                if excluded.contains(&neighbour) {
                    continue;
                }
                let entry = best.entry(neighbour).or_insert(0.0);
                if edge.similarity > *entry {
                    *entry = edge.similarity;
                }
            }
        }

        let neighbour_ids: Vec<i64> = best.keys().copied().collect();
        let pagerank = store.pagerank_scores(&neighbour_ids)?;
        let books = store.get_books(&neighbour_ids)?;

        let mut scored: Vec<Suggestion> = best
            .into_iter()
            .filter_map(|(id, similarity)| {
                let book = books.get(&id)?.clone();
                let authority = pagerank.get(&id).copied().unwrap_or(0.0);
                let score = 0.6 * similarity + 0.4 * 100.0 * authority;
                Some(Suggestion {
                    book,
                    score,
                    similarity,
                })
            })
            .collect();

        scored.sort_unstable_by(|a, b| b.score.partial_cmp(&a.score).unwrap().then(a.book.id.cmp(&b.book.id)));
        scored.truncate(limit);
        Ok(scored)
    }

    /// Click-count popularity blended with mean Jaccard similarity to the
    /// current most-clicked books once the similarity graph exists.
    pub fn get_recommendations_from_history(
        &self,
        already_read_ids: &[i64],
        limit: usize,
    ) -> EngineResult<Vec<Suggestion>> {
        let store = self.store.read().map_err(Self::lock_err)?;
        let graphed = !store.jaccard_edges_is_empty()?;
        let already_read: std::collections::HashSet<i64> = already_read_ids.iter().copied().collect();

        let clicks = store.click_counts()?;
        let all_ids = store.all_book_ids()?;
        let candidates: Vec<i64> = all_ids.into_iter().filter(|id| !already_read.contains(id)).collect();

        let max_clicks = clicks.values().copied().max().unwrap_or(0) as f64;
        let mean_similarity = |candidate: i64| -> EngineResult<f64> {
            if !graphed || already_read_ids.is_empty() {
                return Ok(0.0);
            }
            let neighbours = store.neighbours_of(candidate)?;
            let relevant: Vec<f64> = neighbours
                .into_iter()
                .filter_map(|edge| {
                    let other = if edge.book_id_1 == candidate {
                        edge.book_id_2
                    } else {
                        edge.book_id_1
                    };
                    already_read.contains(&other).then_some(edge.similarity)
                })
                .collect();
            if relevant.is_empty() {
                Ok(0.0)
            } else {
                Ok(relevant.iter().sum::<f64>() / relevant.len() as f64)
            }
        };

        let mut scored = Vec::new();
        for &id in &candidates {
            let click_count = clicks.get(&id).copied().unwrap_or(0) as f64;
            let norm_clicks = if max_clicks > 0.0 { click_count / max_clicks } else { 0.0 };
            let similarity = mean_similarity(id)?;
            let score = if graphed {
                0.7 * norm_clicks + 0.3 * similarity
            } else {
                norm_clicks
            };
            scored.push((id, score, similarity));
        }
        scored.sort_unstable_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
        scored.truncate(limit);

        let ids: Vec<i64> = scored.iter().map(|&(id, _, _)| id).collect();
        let books = store.get_books(&ids)?;
        Ok(scored
            .into_iter()
            .filter_map(|(id, score, similarity)| {
                books.get(&id).map(|book| Suggestion {
                    book: book.clone(),
                    score,
                    similarity,
                })
            })
            .collect())
    }

    /// `search(params)`: tokenize, optionally fuzzy-expand, resolve
    /// candidates, score, paginate, and (if a text provider is supplied)
    /// highlight. Reading book text is an external collaborator's job, so
    /// the caller supplies `text_provider` (e.g. reading `book.file_path`);
    /// when it returns `None` a result simply has no snippets.
    pub fn search(
        &self,
        params: &SearchParams,
        text_provider: impl Fn(&Book) -> Option<String>,
    ) -> EngineResult<SearchResponse> {
        let start = Instant::now();
        if params.limit == 0 {
            return Err(EngineError::InvalidInput("limit must be positive".into()));
        }

        let tokenized = tokenizer::tokenize_query(&params.query);
        let mut terms: Vec<String> = tokenized.terms.into_iter().collect::<std::collections::BTreeSet<_>>().into_iter().collect();
        if terms.is_empty() {
            return Ok(SearchResponse {
                results: Vec::new(),
                matched_terms: Vec::new(),
                total_candidates: 0,
                execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            });
        }

        let store = self.store.read().map_err(Self::lock_err)?;
        if store.book_count()? == 0 {
            return Err(EngineError::PreconditionFailed("corpus is empty".into()));
        }

        if params.fuzzy {
            let vocabulary = store.vocabulary()?;
            let mut matcher = FuzzyMatcher::new();
            let mut expanded: std::collections::BTreeSet<String> = terms.iter().cloned().collect();
            for term in &terms {
                for (matched, _) in matcher.find_similar(term, &vocabulary, params.fuzzy_max_distance) {
                    expanded.insert(matched);
                }
            }
            terms = expanded.into_iter().collect();
        }

        self.run_query(&store, &terms, params, &text_provider, start)
    }

    /// `searchRegex(params)`: match the vocabulary against `pattern`, then
    /// run the matched terms through the same pipeline as `search`.
    pub fn search_regex(
        &self,
        pattern: &str,
        params: &SearchParams,
        text_provider: impl Fn(&Book) -> Option<String>,
    ) -> EngineResult<SearchResponse> {
        let start = Instant::now();
        let store = self.store.read().map_err(Self::lock_err)?;
        if store.book_count()? == 0 {
            return Err(EngineError::PreconditionFailed("corpus is empty".into()));
        }
        let vocabulary = store.vocabulary()?;
        let terms = regexmatch::find_matching_terms(pattern, &vocabulary)?;
        if terms.is_empty() {
            return Ok(SearchResponse {
                results: Vec::new(),
                matched_terms: Vec::new(),
                total_candidates: 0,
                execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            });
        }
        self.run_query(&store, &terms, params, &text_provider, start)
    }

    fn run_query(
        &self,
        store: &Store,
        terms: &[String],
        params: &SearchParams,
        text_provider: &impl Fn(&Book) -> Option<String>,
        start: Instant,
    ) -> EngineResult<SearchResponse> {
        let config = self.config.read().map_err(Self::lock_err)?;

        let mut candidate_ids: std::collections::BTreeSet<i64> = std::collections::BTreeSet::new();
        if params.fields.contains(&SearchField::Content) {
            for id in store.book_ids_for_terms(terms)? {
                candidate_ids.insert(id);
            }
        }
        for &field in &params.fields {
            if field == SearchField::Content {
                continue;
            }
            for id in store.books_matching_field_like(field, &params.query)? {
                candidate_ids.insert(id);
            }
        }

        let all_candidates: Vec<i64> = candidate_ids.into_iter().collect();
        let books = store.get_books(&all_candidates)?;

        let filtered: Vec<i64> = all_candidates
            .into_iter()
            .filter(|id| {
                let Some(book) = books.get(id) else { return false };
                if let Some(author) = &params.author_filter {
                    if !book.author.to_lowercase().contains(&author.to_lowercase()) {
                        return false;
                    }
                }
                if let Some(min_words) = params.min_word_count {
                    if book.word_count < min_words {
                        return false;
                    }
                }
                if let Some(max_words) = params.max_word_count {
                    if book.word_count > max_words {
                        return false;
                    }
                }
                true
            })
            .collect();

        let total_candidates = filtered.len();
        if filtered.is_empty() {
            return Ok(SearchResponse {
                results: Vec::new(),
                matched_terms: terms.to_vec(),
                total_candidates: 0,
                execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            });
        }

        let pagerank = store.pagerank_scores(&filtered)?;
        let filtered = if let Some(min_authority) = params.min_authority_score {
            filtered
                .into_iter()
                .filter(|id| pagerank.get(id).copied().unwrap_or(0.0) >= min_authority)
                .collect()
        } else {
            filtered
        };
        if filtered.is_empty() {
            return Ok(SearchResponse {
                results: Vec::new(),
                matched_terms: terms.to_vec(),
                total_candidates: 0,
                execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            });
        }

        let term_freqs = store.term_frequencies(&filtered, terms)?;
        let metadata = store.load_library_metadata()?;
        let dfs = store.all_term_document_frequencies()?;
        let total_books = store.book_count()? as u64;
        let idfs: std::collections::BTreeMap<String, f64> = terms
            .iter()
            .map(|t| {
                let df = dfs.get(t).copied().unwrap_or(0);
                (t.clone(), scoring::bm25_idf(df, total_books))
            })
            .collect();

        let mut candidate_stats: std::collections::BTreeMap<i64, CandidateStats> = std::collections::BTreeMap::new();
        for &id in &filtered {
            let book = books.get(&id).cloned().unwrap_or_else(|| store.get_book(id).ok().flatten().unwrap());
            let mut stats = CandidateStats {
                doc_length: book.word_count,
                term_frequencies: std::collections::BTreeMap::new(),
                positions: std::collections::BTreeMap::new(),
            };
            for term in terms {
                if let Some(tf) = term_freqs.get(term).and_then(|m| m.get(&id)) {
                    stats.term_frequencies.insert(term.clone(), *tf);
                    if config.bm25.enable_proximity_bonus {
                        if let Some(positions) = store.positions_for(term, id)? {
                            stats.positions.insert(term.clone(), positions);
                        }
                    }
                }
            }
            candidate_stats.insert(id, stats);
        }

        let scored = scoring::score_candidates(
            &candidate_stats,
            &idfs,
            metadata.avg_doc_length,
            &pagerank,
            &config.bm25,
        );

        let page: Vec<_> = scored
            .into_iter()
            .skip(params.offset)
            .take(params.limit)
            .collect();

        let results = page
            .into_iter()
            .filter_map(|candidate| {
                let book = books.get(&candidate.book_id)?.clone();
                let snippets = if params.highlight {
                    text_provider(&book)
                        .map(|text| highlight::highlight(&text, terms, &config.highlight))
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                Some(SearchResult {
                    book,
                    score: candidate.final_score,
                    bm25_score: candidate.bm25_score,
                    authority_score: candidate.authority_score,
                    snippets,
                })
            })
            .collect();

        Ok(SearchResponse {
            results,
            matched_terms: terms.to_vec(),
            total_candidates,
            execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }
}

fn kind_for(key: ConfigKey) -> &'static str {
    use ConfigKey::*;
    match key {
        MinWordLength | JaccardMinSharedTerms | SnippetCount | SnippetLength | ContextBefore
        | ContextAfter | FuzzyMaxDistance | JaccardTopK | JaccardBatchSize | PageRankMaxIterations => "number",
        RemoveStopWords | CaseSensitive | KeepPositions | EnableProximityBonus => "boolean",
        JaccardMaxTermFrequency | JaccardThreshold | PageRankDamping | PageRankTolerance | Bm25K1
        | Bm25B | Bm25Weight | PageRankWeight => "number",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenizerConfig;

    fn meta(title: &str) -> BookMeta {
        BookMeta {
            title: title.into(),
            author: "Author".into(),
            file_path: format!("/books/{title}.txt"),
            cover_image_path: None,
        }
    }

    fn default_tokenizer() -> TokenizerConfig {
        TokenizerConfig {
            min_word_length: 1,
            remove_stop_words: false,
            case_sensitive: false,
            keep_positions: true,
        }
    }

    #[test]
    fn state_tracks_corpus_lifecycle() {
        let engine = Engine::open_in_memory().unwrap();
        assert_eq!(engine.state().unwrap(), CorpusState::Empty);

        engine.index_book(&meta("A"), "whale sea storm").unwrap();
        assert_eq!(engine.state().unwrap(), CorpusState::Indexed);
    }

    #[test]
    fn search_finds_matching_book() {
        let engine = Engine::open_in_memory().unwrap();
        engine.index_book(&meta("Moby"), "call me ishmael the great whale").unwrap();
        engine.index_book(&meta("Other"), "completely unrelated content here").unwrap();

        let params = SearchParams {
            query: "whale".into(),
            ..SearchParams::default()
        };
        let response = engine.search(&params, |_| None).unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].book.title, "Moby");
    }

    #[test]
    fn empty_query_returns_empty_response() {
        let engine = Engine::open_in_memory().unwrap();
        engine.index_book(&meta("A"), "whale sea").unwrap();
        let params = SearchParams {
            query: "   ".into(),
            ..SearchParams::default()
        };
        let response = engine.search(&params, |_| None).unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn search_against_empty_corpus_is_precondition_failure() {
        let engine = Engine::open_in_memory().unwrap();
        let params = SearchParams {
            query: "whale".into(),
            ..SearchParams::default()
        };
        let err = engine.search(&params, |_| None).unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed(_)));
    }

    #[test]
    fn highlighting_uses_supplied_text_provider() {
        let engine = Engine::open_in_memory().unwrap();
        engine.index_book(&meta("Moby"), "call me ishmael the great whale").unwrap();

        let params = SearchParams {
            query: "whale".into(),
            ..SearchParams::default()
        };
        let response = engine
            .search(&params, |_| Some("call me ishmael the great whale".to_string()))
            .unwrap();
        assert!(!response.results[0].snippets.is_empty());
        assert!(response.results[0].snippets[0].text.contains("<mark>"));
    }

    #[test]
    fn suggestions_require_graph() {
        let engine = Engine::open_in_memory().unwrap();
        let book = engine.index_book(&meta("A"), "whale").unwrap();
        let err = engine.get_suggestions(&[book.id], 5).unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed(_)));
    }

    #[test]
    fn recommendations_blend_clicks_and_similarity_once_graphed() {
        let engine = Engine::open_in_memory().unwrap();
        let _ = default_tokenizer();
        let a = engine.index_book(&meta("A"), "whale sea storm").unwrap();
        let b = engine.index_book(&meta("B"), "whale sea storm wave").unwrap();
        let c = engine.index_book(&meta("C"), "finance loan bank credit").unwrap();

        engine.record_click(b.id).unwrap();
        engine.record_click(c.id).unwrap();
        engine.record_click(c.id).unwrap();

        let recs = engine.get_recommendations_from_history(&[a.id], 10).unwrap();
        assert!(!recs.is_empty());
    }

    #[test]
    fn set_config_rejects_default_only_keys() {
        let engine = Engine::open_in_memory().unwrap();
        let err = engine
            .set_config_value(ConfigKey::PageRankDamping, "0.5")
            .unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed(_)));
    }

    #[test]
    fn set_config_applies_hot_reloadable_keys() {
        let engine = Engine::open_in_memory().unwrap();
        engine.set_config_value(ConfigKey::MinWordLength, "4").unwrap();
        assert_eq!(engine.config().unwrap().tokenizer.min_word_length, 4);
    }
}
