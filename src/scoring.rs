//! BM25 scoring and the BM25 x PageRank hybrid fusion.
//!
//! Pure functions over pre-fetched term-frequency and PageRank maps: the
//! caller is responsible for the single batched store round-trip, this
//! module only does arithmetic.

use std::collections::BTreeMap;

use crate::config::Bm25Config;

/// Per-book input the scorer needs, already fetched in batch by the caller.
#[derive(Debug, Clone, Default)]
pub struct CandidateStats {
    pub doc_length: i64,
    /// query term -> term frequency in this book (0 if absent, omit instead).
    pub term_frequencies: BTreeMap<String, u32>,
    /// query term -> character-offset positions, only needed when the
    /// proximity bonus is enabled.
    pub positions: BTreeMap<String, Vec<u32>>,
}

/// Robertson-Sparck Jones IDF, clamped at zero so a term appearing in more
/// than half the corpus never penalizes a document for containing it.
pub fn bm25_idf(document_frequency: u64, total_books: u64) -> f64 {
    if total_books == 0 {
        return 0.0;
    }
    let n = total_books as f64;
    let df = document_frequency as f64;
    let raw = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
    raw.max(0.0)
}

/// Score contributed by one query term against one document.
fn term_score(tf: u32, doc_length: i64, avg_doc_length: f64, idf: f64, config: &Bm25Config) -> f64 {
    if tf == 0 || avg_doc_length <= 0.0 {
        return 0.0;
    }
    let tf = tf as f64;
    let length_norm = 1.0 - config.b + config.b * (doc_length as f64 / avg_doc_length);
    idf * tf / (tf + config.k1 * length_norm)
}

/// Smallest distance, in positions, between an occurrence of one query term
/// and an occurrence of a *different* query term. `None` when fewer than
/// two distinct query terms occur in the document.
fn min_cross_term_distance(positions: &BTreeMap<String, Vec<u32>>) -> Option<u32> {
    let terms: Vec<&Vec<u32>> = positions.values().collect();
    if terms.len() < 2 {
        return None;
    }
    let mut best: Option<u32> = None;
    for i in 0..terms.len() {
        for j in (i + 1)..terms.len() {
            for &a in terms[i] {
                for &b in terms[j] {
                    let dist = a.abs_diff(b);
                    best = Some(best.map_or(dist, |cur| cur.min(dist)));
                }
            }
        }
    }
    best
}

/// Sum of per-term BM25 scores for one document against the given query
/// terms, plus an optional proximity bonus added pre-normalization.
pub fn bm25_score(
    stats: &CandidateStats,
    idfs: &BTreeMap<String, f64>,
    avg_doc_length: f64,
    config: &Bm25Config,
) -> f64 {
    let mut sum = 0.0;
    for (term, &tf) in &stats.term_frequencies {
        let idf = idfs.get(term).copied().unwrap_or(0.0);
        sum += term_score(tf, stats.doc_length, avg_doc_length, idf, config);
    }
    if config.enable_proximity_bonus {
        if let Some(min_dist) = min_cross_term_distance(&stats.positions) {
            sum += config.proximity_weight * (1.0 / (1.0 + min_dist as f64));
        }
    }
    sum
}

/// Min-max normalize `value` into `[0, 1]` against the observed range.
/// Degenerate ranges (all candidates tied) normalize to `1.0` for any
/// positive score and `0.0` otherwise, so a single matching candidate isn't
/// silently zeroed out.
fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if (max - min).abs() < f64::EPSILON {
        return if value > 0.0 { 1.0 } else { 0.0 };
    }
    (value - min) / (max - min)
}

/// One scored candidate: BM25 component, authority (PageRank) component,
/// and their weighted fusion.
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate {
    pub book_id: i64,
    pub bm25_score: f64,
    pub authority_score: f64,
    pub final_score: f64,
}

/// Score and rank every candidate: `finalScore = bm25Weight * normalize(bm25Sum)
/// + pagerankWeight * 100 * pageRank(book)`.
pub fn score_candidates(
    candidates: &BTreeMap<i64, CandidateStats>,
    idfs: &BTreeMap<String, f64>,
    avg_doc_length: f64,
    pagerank: &BTreeMap<i64, f64>,
    config: &Bm25Config,
) -> Vec<ScoredCandidate> {
    let raw: BTreeMap<i64, f64> = candidates
        .iter()
        .map(|(&id, stats)| (id, bm25_score(stats, idfs, avg_doc_length, config)))
        .collect();

    let min = raw.values().copied().fold(f64::INFINITY, f64::min);
    let max = raw.values().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut scored: Vec<ScoredCandidate> = raw
        .into_iter()
        .map(|(book_id, bm25)| {
            let authority = pagerank.get(&book_id).copied().unwrap_or(0.0);
            let final_score = config.bm25_weight * normalize(bm25, min, max)
                + config.pagerank_weight * 100.0 * authority;
            ScoredCandidate {
                book_id,
                bm25_score: bm25,
                authority_score: authority,
                final_score,
            }
        })
        .collect();

    scored.sort_unstable_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap()
            .then(a.book_id.cmp(&b.book_id))
    });
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(tf: u32, doc_length: i64) -> CandidateStats {
        let mut term_frequencies = BTreeMap::new();
        term_frequencies.insert("whale".to_string(), tf);
        CandidateStats {
            doc_length,
            term_frequencies,
            positions: BTreeMap::new(),
        }
    }

    #[test]
    fn idf_is_never_negative() {
        assert!(bm25_idf(900, 1000) >= 0.0);
        assert!(bm25_idf(1, 1000) > 0.0);
    }

    #[test]
    fn higher_term_frequency_scores_higher() {
        let idfs: BTreeMap<String, f64> = [("whale".to_string(), 2.0)].into_iter().collect();
        let config = Bm25Config::default();
        let low = bm25_score(&stats(1, 100), &idfs, 100.0, &config);
        let high = bm25_score(&stats(5, 100), &idfs, 100.0, &config);
        assert!(high > low);
    }

    #[test]
    fn longer_document_penalized_for_equal_term_frequency() {
        let idfs: BTreeMap<String, f64> = [("whale".to_string(), 2.0)].into_iter().collect();
        let config = Bm25Config::default();
        let short_doc = bm25_score(&stats(3, 50), &idfs, 100.0, &config);
        let long_doc = bm25_score(&stats(3, 400), &idfs, 100.0, &config);
        assert!(short_doc > long_doc);
    }

    #[test]
    fn proximity_bonus_only_applied_when_enabled() {
        let idfs: BTreeMap<String, f64> = [
            ("whale".to_string(), 1.0),
            ("sea".to_string(), 1.0),
        ]
        .into_iter()
        .collect();
        let mut stats = CandidateStats {
            doc_length: 100,
            term_frequencies: [("whale".to_string(), 1), ("sea".to_string(), 1)]
                .into_iter()
                .collect(),
            positions: [
                ("whale".to_string(), vec![0]),
                ("sea".to_string(), vec![2]),
            ]
            .into_iter()
            .collect(),
        };

        let mut config = Bm25Config::default();
        config.enable_proximity_bonus = false;
        let without_bonus = bm25_score(&stats, &idfs, 100.0, &config);

        config.enable_proximity_bonus = true;
        let with_bonus = bm25_score(&stats, &idfs, 100.0, &config);
        assert!(with_bonus > without_bonus);

        stats.positions.insert("sea".to_string(), vec![500]);
        let with_far_bonus = bm25_score(&stats, &idfs, 100.0, &config);
        assert!(with_bonus > with_far_bonus);
    }

    #[test]
    fn hybrid_fusion_rewards_authority() {
        let mut candidates = BTreeMap::new();
        candidates.insert(1, stats(3, 100));
        candidates.insert(2, stats(3, 100));
        let idfs: BTreeMap<String, f64> = [("whale".to_string(), 2.0)].into_iter().collect();
        let pagerank: BTreeMap<i64, f64> = [(1, 0.01), (2, 0.5)].into_iter().collect();
        let config = Bm25Config::default();

        let scored = score_candidates(&candidates, &idfs, 100.0, &pagerank, &config);
        assert_eq!(scored[0].book_id, 2);
    }
}
