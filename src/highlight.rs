//! Highlighter: extracts non-overlapping snippet windows around query-term
//! hits in a book's text and wraps matches in `<mark>` tags.
//!
//! Each hit anchors a fixed-size window of surrounding characters; windows
//! that would overlap an already-emitted snippet are skipped so the same
//! passage isn't shown twice.

use std::collections::{HashSet, BTreeSet};

use crate::config::HighlightConfig;
use crate::models::Snippet;
use crate::tokenizer::{is_word_char, tokenize_query};

/// One raw occurrence of a query term in the text, in character offsets.
struct Hit {
    offset: usize,
    term: String,
}

fn collect_hits(text: &str, query_terms_lower: &HashSet<String>) -> Vec<Hit> {
    let tokenized = tokenize_query(text);
    let mut hits = Vec::new();
    for (term, positions) in &tokenized.positions {
        if query_terms_lower.contains(term) {
            for &pos in positions {
                hits.push(Hit {
                    offset: pos as usize,
                    term: term.clone(),
                });
            }
        }
    }
    hits.sort_unstable_by_key(|h| h.offset);
    hits
}

/// Wrap every whole-word, case-insensitive occurrence of a query term
/// inside `window` with `<mark>...</mark>`, preserving the original casing
/// of the matched text.
fn wrap_matches(window: &str, query_terms_lower: &HashSet<String>) -> String {
    let chars: Vec<char> = window.chars().collect();
    let mut out = String::with_capacity(window.len() + 16);
    let mut i = 0;
    while i < chars.len() {
        if is_word_char(chars[i]) {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            let run: String = chars[start..i].iter().collect();
            if query_terms_lower.contains(&run.to_lowercase()) {
                out.push_str("<mark>");
                out.push_str(&run);
                out.push_str("</mark>");
            } else {
                out.push_str(&run);
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Build up to `config.snippet_count` highlighted snippets around the
/// occurrences of `query_terms` in `text`. Windows that would overlap an
/// already-produced snippet are skipped so the same passage isn't shown
/// twice.
pub fn highlight(text: &str, query_terms: &[String], config: &HighlightConfig) -> Vec<Snippet> {
    let query_terms_lower: HashSet<String> = query_terms.iter().map(|t| t.to_lowercase()).collect();
    if query_terms_lower.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let hits = collect_hits(text, &query_terms_lower);

    let mut snippets = Vec::new();
    let mut covered: Vec<(usize, usize)> = Vec::new();

    for hit in hits {
        if snippets.len() >= config.snippet_count {
            break;
        }
        if covered.iter().any(|&(s, e)| hit.offset >= s && hit.offset < e) {
            continue;
        }

        let term_len = hit.term.chars().count();
        let mut start = hit.offset.saturating_sub(config.context_before);
        let mut end = (hit.offset + term_len + config.context_after).min(chars.len());

        if end - start > config.snippet_length {
            let centre = hit.offset + term_len / 2;
            let half = config.snippet_length / 2;
            start = centre.saturating_sub(half);
            end = (start + config.snippet_length).min(chars.len());
            start = end.saturating_sub(config.snippet_length);
        }

        let window_text: String = chars[start..end].iter().collect();
        let marked = wrap_matches(&window_text, &query_terms_lower);

        let mut snippet_text = String::new();
        if start > 0 {
            snippet_text.push_str("...");
        }
        snippet_text.push_str(&marked);
        if end < chars.len() {
            snippet_text.push_str("...");
        }

        let matched_terms: BTreeSet<String> = {
            let window_tokens = tokenize_query(&window_text);
            window_tokens
                .positions
                .keys()
                .filter(|t| query_terms_lower.contains(*t))
                .cloned()
                .collect()
        };

        snippets.push(Snippet {
            text: snippet_text,
            matched_terms: matched_terms.into_iter().collect(),
            start_offset: start,
        });
        covered.push((start, end));
    }

    snippets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HighlightConfig {
        HighlightConfig {
            snippet_count: 3,
            snippet_length: 150,
            context_before: 10,
            context_after: 10,
        }
    }

    #[test]
    fn highlights_wrap_matched_term() {
        let text = "The great whale swam in the deep sea.";
        let snippets = highlight(text, &["whale".to_string()], &config());
        assert_eq!(snippets.len(), 1);
        assert!(snippets[0].text.contains("<mark>whale</mark>"));
    }

    #[test]
    fn no_query_terms_yields_no_snippets() {
        let text = "The great whale swam.";
        let snippets = highlight(text, &[], &config());
        assert!(snippets.is_empty());
    }

    #[test]
    fn overlapping_hits_do_not_duplicate_snippets() {
        let text = "whale whale whale whale whale whale whale whale whale whale";
        let cfg = HighlightConfig {
            snippet_count: 5,
            snippet_length: 30,
            context_before: 5,
            context_after: 5,
        };
        let snippets = highlight(text, &["whale".to_string()], &cfg);
        assert!(snippets.len() <= cfg.snippet_count);
        let starts: BTreeSet<usize> = snippets.iter().map(|s| s.start_offset).collect();
        assert_eq!(starts.len(), snippets.len(), "snippet windows overlapped");
        for pair in snippets.windows(2) {
            assert!(pair[1].start_offset >= pair[0].start_offset);
        }
    }

    #[test]
    fn stops_at_snippet_count() {
        let text = "whale sea whale sea whale sea whale sea whale sea";
        let cfg = HighlightConfig {
            snippet_count: 2,
            snippet_length: 150,
            context_before: 3,
            context_after: 3,
        };
        let snippets = highlight(text, &["whale".to_string()], &cfg);
        assert_eq!(snippets.len(), 2);
    }

    #[test]
    fn ellipsis_added_when_window_is_interior() {
        let text = "aaaaaaaaaa whale bbbbbbbbbb";
        let cfg = HighlightConfig {
            snippet_count: 1,
            snippet_length: 150,
            context_before: 2,
            context_after: 2,
        };
        let snippets = highlight(text, &["whale".to_string()], &cfg);
        assert!(snippets[0].text.starts_with("..."));
        assert!(snippets[0].text.ends_with("..."));
    }
}
