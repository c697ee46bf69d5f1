//! Fuzzy vocabulary matcher: bounded Levenshtein edit distance between a
//! query term and the corpus vocabulary.
//!
//! Distance is computed with a row-by-row dynamic-programming matrix,
//! collapsed to two rolling rows since only the previous row is ever
//! needed.

use std::collections::HashMap;

/// Classic three-operation Levenshtein distance (insert, delete, substitute,
/// each cost 1), computed with a two-row rolling DP matrix.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Caches `findSimilar` results per `(query, max_distance)` pair so repeated
/// lookups against the same vocabulary (e.g. paging through suggestions)
/// skip rescanning it.
#[derive(Default)]
pub struct FuzzyMatcher {
    cache: HashMap<(String, usize), Vec<(String, usize)>>,
}

impl FuzzyMatcher {
    pub fn new() -> Self {
        FuzzyMatcher::default()
    }

    /// Every vocabulary term within `max_distance` of `query_term`, sorted
    /// ascending by distance and then alphabetically.
    pub fn find_similar(
        &mut self,
        query_term: &str,
        vocabulary: &[String],
        max_distance: usize,
    ) -> Vec<(String, usize)> {
        let key = (query_term.to_lowercase(), max_distance);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let query_lower = &key.0;
        let mut matches: Vec<(String, usize)> = vocabulary
            .iter()
            .filter_map(|term| {
                let distance = levenshtein_distance(query_lower, &term.to_lowercase());
                (distance <= max_distance).then_some((term.clone(), distance))
            })
            .collect();
        matches.sort_unstable_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        self.cache.insert(key, matches.clone());
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_zero_distance() {
        assert_eq!(levenshtein_distance("whale", "whale"), 0);
    }

    #[test]
    fn single_substitution_costs_one() {
        assert_eq!(levenshtein_distance("whale", "shale"), 1);
    }

    #[test]
    fn insertion_and_deletion_are_counted() {
        assert_eq!(levenshtein_distance("whale", "whales"), 1);
        assert_eq!(levenshtein_distance("whales", "whale"), 1);
    }

    #[test]
    fn find_similar_sorts_by_distance_then_alphabetically() {
        let vocab = vec![
            "whale".to_string(),
            "whaled".to_string(),
            "shale".to_string(),
            "bank".to_string(),
        ];
        let mut matcher = FuzzyMatcher::new();
        let results = matcher.find_similar("whale", &vocab, 2);
        assert_eq!(
            results,
            vec![
                ("whale".to_string(), 0),
                ("shale".to_string(), 1),
                ("whaled".to_string(), 1),
            ]
        );
    }

    #[test]
    fn results_are_cached_per_query_and_distance() {
        let vocab = vec!["whale".to_string()];
        let mut matcher = FuzzyMatcher::new();
        let first = matcher.find_similar("Whale", &vocab, 1);
        let second = matcher.find_similar("whale", &vocab, 1);
        assert_eq!(first, second);
    }
}
