//! Tokenizer (C1): normalizes text into terms with character positions.
//!
//! Scans the *original* text for runs of `{a-z, à-ÿ, 0-9}` (case-insensitive),
//! producing a token per run whose key is the lowercased match and whose
//! recorded position is the character index of the match start in the
//! original text -- not a token index. This distinction is load-bearing for
//! the highlighter (C9), which re-uses these offsets to slice the original
//! text directly.

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};

use crate::config::TokenizerConfig;

/// Result of tokenizing a piece of text.
#[derive(Debug, Clone, Default)]
pub struct TokenizeOutput {
    /// Terms in first-occurrence order, after filtering (duplicates kept).
    pub terms: Vec<String>,
    /// term -> strictly increasing character offsets of each occurrence.
    pub positions: BTreeMap<String, Vec<u32>>,
    /// Count of raw tokens before any filtering.
    pub total_tokens: usize,
}

/// `a-z` / `A-Z` / `0-9` / Latin-1 Supplement letters (`À-ÖØ-öø-ÿ`), excluding
/// the multiplication (`×`) and division (`÷`) signs that sit inside the
/// `à-ÿ` byte range but are not letters.
pub(crate) fn is_word_char(c: char) -> bool {
    if c.is_ascii_alphanumeric() {
        return true;
    }
    matches!(c as u32, 0xC0..=0xD6 | 0xD8..=0xF6 | 0xF8..=0xFF)
}

/// Scan `text` into raw (term, char_start) tokens with no filtering applied.
fn scan(text: &str) -> (Vec<(String, u32)>, usize) {
    let mut raw = Vec::new();
    let mut total = 0usize;

    let mut run_start: Option<usize> = None;
    let mut run_chars: Vec<char> = Vec::new();
    let chars: Vec<char> = text.chars().collect();

    let mut flush = |run_start: &mut Option<usize>, run_chars: &mut Vec<char>, out: &mut Vec<(String, u32)>, total: &mut usize| {
        if let Some(start) = run_start.take() {
            if !run_chars.is_empty() {
                let term: String = run_chars.iter().collect::<String>().to_lowercase();
                out.push((term, start as u32));
                *total += 1;
            }
            run_chars.clear();
        }
    };

    for (idx, &c) in chars.iter().enumerate() {
        if is_word_char(c) {
            if run_start.is_none() {
                run_start = Some(idx);
            }
            run_chars.push(c);
        } else {
            flush(&mut run_start, &mut run_chars, &mut raw, &mut total);
        }
    }
    flush(&mut run_start, &mut run_chars, &mut raw, &mut total);

    (raw, total)
}

/// Index-mode tokenization: applies `min_word_length` then, if configured,
/// drops stop words.
pub fn tokenize(text: &str, config: &TokenizerConfig) -> TokenizeOutput {
    let (raw, total_tokens) = scan(text);

    let mut terms = Vec::new();
    let mut positions: BTreeMap<String, Vec<u32>> = BTreeMap::new();

    for (term, pos) in raw {
        if term.chars().count() < config.min_word_length {
            continue;
        }
        if config.remove_stop_words && STOP_WORDS.contains(term.as_str()) {
            continue;
        }
        terms.push(term.clone());
        positions.entry(term).or_default().push(pos);
    }

    TokenizeOutput {
        terms,
        positions,
        total_tokens,
    }
}

/// Query-mode tokenization: identical lexing, no min-length filter, no
/// stop-word filter -- the caller keeps control of their own query terms.
pub fn tokenize_query(text: &str) -> TokenizeOutput {
    let (raw, total_tokens) = scan(text);

    let mut terms = Vec::new();
    let mut positions: BTreeMap<String, Vec<u32>> = BTreeMap::new();

    for (term, pos) in raw {
        terms.push(term.clone());
        positions.entry(term).or_default().push(pos);
    }

    TokenizeOutput {
        terms,
        positions,
        total_tokens,
    }
}

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // English
        "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "for", "from", "has",
        "have", "he", "her", "him", "his", "how", "i", "if", "in", "into", "is", "it", "its",
        "me", "my", "no", "nor", "not", "of", "on", "or", "our", "she", "so", "such", "than",
        "that", "the", "their", "them", "then", "there", "these", "they", "this", "those", "to",
        "was", "we", "were", "what", "when", "where", "which", "who", "will", "with", "you",
        "your",
        // French
        "au", "aux", "avec", "ce", "ces", "dans", "de", "des", "du", "elle", "en", "es", "est",
        "et", "eux", "il", "ils", "je", "la", "le", "les", "leur", "leurs", "lui", "ma", "mais",
        "me", "meme", "mes", "moi", "mon", "ne", "nos", "notre", "nous", "ou", "par", "pas",
        "pour", "qu", "que", "qui", "sa", "se", "ses", "son", "sur", "ta", "te", "tes", "toi",
        "ton", "tu", "un", "une", "vos", "votre", "vous",
    ]
    .into_iter()
    .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_stop_words_but_counts_them() {
        let cfg = TokenizerConfig {
            min_word_length: 2,
            remove_stop_words: true,
            case_sensitive: false,
            keep_positions: true,
        };
        let out = tokenize("The quick 123 brown fox!", &cfg);
        assert_eq!(out.terms, vec!["quick", "123", "brown", "fox"]);
        assert_eq!(out.positions["quick"], vec![4]);
        assert_eq!(out.positions["123"], vec![10]);
        assert_eq!(out.positions["brown"], vec![14]);
        assert_eq!(out.positions["fox"], vec![20]);
        // "the" is filtered (stop word), but still counted in total_tokens
        assert_eq!(out.total_tokens, 5);
    }

    #[test]
    fn positions_property_holds() {
        let cfg = TokenizerConfig::default();
        let text = "Café costs 10 dollars, café is nice.";
        let out = tokenize(text, &cfg);
        let chars: Vec<char> = text.chars().collect();
        for (term, positions) in &out.positions {
            for &pos in positions {
                let start = pos as usize;
                let end = start + term.chars().count();
                let slice: String = chars[start..end].iter().collect::<String>().to_lowercase();
                assert_eq!(&slice, term);
            }
        }
    }

    #[test]
    fn query_mode_keeps_short_and_stop_words() {
        let out = tokenize_query("a an the");
        assert_eq!(out.terms, vec!["a", "an", "the"]);
        assert_eq!(out.total_tokens, 3);
    }

    #[test]
    fn min_word_length_filters_short_tokens() {
        let cfg = TokenizerConfig {
            min_word_length: 3,
            remove_stop_words: false,
            case_sensitive: false,
            keep_positions: true,
        };
        let out = tokenize("go to it now", &cfg);
        assert_eq!(out.terms, vec!["now"]);
        assert_eq!(out.total_tokens, 4);
    }

    #[test]
    fn repeated_term_accumulates_positions() {
        let cfg = TokenizerConfig {
            min_word_length: 2,
            remove_stop_words: false,
            case_sensitive: false,
            keep_positions: true,
        };
        let out = tokenize("cat dog cat", &cfg);
        assert_eq!(out.positions["cat"], vec![0, 8]);
    }
}
