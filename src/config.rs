//! Typed configuration record, replacing a loose "map of string -> any"
//! with fields checked at compile time. Each component receives a `Config`
//! snapshot at construction; the admin `set` operation swaps the snapshot
//! behind a lock so readers never see a half-updated record.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub min_word_length: usize,
    pub remove_stop_words: bool,
    pub case_sensitive: bool,
    pub keep_positions: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            min_word_length: 2,
            remove_stop_words: true,
            case_sensitive: false,
            keep_positions: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JaccardConfig {
    /// Hot-reloadable.
    pub max_term_frequency: f64,
    /// Hot-reloadable.
    pub min_shared_terms: usize,
    /// Default-only: only takes effect on the next full rebuild.
    pub threshold: f64,
    /// Default-only.
    pub top_k: usize,
    /// Default-only.
    pub batch_size: usize,
}

impl Default for JaccardConfig {
    fn default() -> Self {
        Self {
            max_term_frequency: 0.7,
            min_shared_terms: 5,
            threshold: 0.1,
            top_k: 50,
            batch_size: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRankConfig {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Config {
    pub k1: f64,
    pub b: f64,
    pub bm25_weight: f64,
    pub pagerank_weight: f64,
    pub enable_proximity_bonus: bool,
    pub proximity_weight: f64,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            bm25_weight: 0.6,
            pagerank_weight: 0.4,
            enable_proximity_bonus: false,
            proximity_weight: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HighlightConfig {
    pub snippet_count: usize,
    pub snippet_length: usize,
    pub context_before: usize,
    pub context_after: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            snippet_count: 3,
            snippet_length: 150,
            context_before: 75,
            context_after: 75,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FuzzyConfig {
    pub max_distance: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self { max_distance: 2 }
    }
}

/// The complete, typed configuration record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub tokenizer: TokenizerConfig,
    pub jaccard: JaccardConfig,
    pub pagerank: PageRankConfig,
    pub bm25: Bm25Config,
    pub highlight: HighlightConfig,
    pub fuzzy: FuzzyConfig,
}

/// Recognized `app_config` keys, used to parse/serialize individual scalar
/// overrides without requiring the whole record to round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    MinWordLength,
    RemoveStopWords,
    CaseSensitive,
    KeepPositions,
    JaccardMaxTermFrequency,
    JaccardMinSharedTerms,
    JaccardThreshold,
    JaccardTopK,
    JaccardBatchSize,
    PageRankDamping,
    PageRankMaxIterations,
    PageRankTolerance,
    Bm25K1,
    Bm25B,
    Bm25Weight,
    PageRankWeight,
    EnableProximityBonus,
    SnippetCount,
    SnippetLength,
    ContextBefore,
    ContextAfter,
    FuzzyMaxDistance,
}

impl ConfigKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::MinWordLength => "minWordLength",
            ConfigKey::RemoveStopWords => "removeStopWords",
            ConfigKey::CaseSensitive => "caseSensitive",
            ConfigKey::KeepPositions => "keepPositions",
            ConfigKey::JaccardMaxTermFrequency => "maxTermFrequency",
            ConfigKey::JaccardMinSharedTerms => "minSharedTerms",
            ConfigKey::JaccardThreshold => "threshold",
            ConfigKey::JaccardTopK => "topK",
            ConfigKey::JaccardBatchSize => "batchSize",
            ConfigKey::PageRankDamping => "damping",
            ConfigKey::PageRankMaxIterations => "maxIterations",
            ConfigKey::PageRankTolerance => "tolerance",
            ConfigKey::Bm25K1 => "k1",
            ConfigKey::Bm25B => "b",
            ConfigKey::Bm25Weight => "bm25Weight",
            ConfigKey::PageRankWeight => "pagerankWeight",
            ConfigKey::EnableProximityBonus => "enableProximityBonus",
            ConfigKey::SnippetCount => "snippetCount",
            ConfigKey::SnippetLength => "snippetLength",
            ConfigKey::ContextBefore => "contextBefore",
            ConfigKey::ContextAfter => "contextAfter",
            ConfigKey::FuzzyMaxDistance => "maxDistance",
        }
    }

    /// Whether this key may be changed after startup via the admin `set`
    /// operation, as opposed to keys that only take effect on the next full
    /// rebuild.
    pub fn hot_reloadable(self) -> bool {
        !matches!(
            self,
            ConfigKey::JaccardThreshold
                | ConfigKey::JaccardTopK
                | ConfigKey::JaccardBatchSize
                | ConfigKey::PageRankDamping
                | ConfigKey::PageRankMaxIterations
                | ConfigKey::PageRankTolerance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let cfg = Config::default();
        assert_eq!(cfg.tokenizer.min_word_length, 2);
        assert_eq!(cfg.jaccard.top_k, 50);
        assert_eq!(cfg.jaccard.threshold, 0.1);
        assert_eq!(cfg.jaccard.min_shared_terms, 5);
        assert_eq!(cfg.pagerank.damping, 0.85);
        assert_eq!(cfg.pagerank.max_iterations, 100);
        assert_eq!(cfg.bm25.k1, 1.2);
        assert_eq!(cfg.bm25.b, 0.75);
        assert_eq!(cfg.bm25.bm25_weight, 0.6);
        assert_eq!(cfg.bm25.pagerank_weight, 0.4);
        assert_eq!(cfg.highlight.snippet_count, 3);
        assert_eq!(cfg.fuzzy.max_distance, 2);
    }

    #[test]
    fn pagerank_keys_are_default_only() {
        assert!(!ConfigKey::PageRankDamping.hot_reloadable());
        assert!(!ConfigKey::JaccardThreshold.hot_reloadable());
        assert!(ConfigKey::MinWordLength.hot_reloadable());
    }
}
