//! Heuristic sentence splitting.

use std::sync::LazyLock;

use regex::Regex;

// A boundary is `.`, `!`, or `?` followed by whitespace and an ASCII
// uppercase letter. Abbreviations followed by lowercase ("e.g. the") do not
// split; that false negative is part of the contract and must not be fixed,
// since chunk boundaries downstream depend on it.
static BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+[A-Z]").expect("sentence boundary pattern"));

/// Splits text into sentence-like units.
///
/// Each returned sentence is trimmed and non-empty; the terminating
/// punctuation stays with its sentence and the uppercase letter opens the
/// next one.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    let mut start = 0;

    for found in BOUNDARY.find_iter(text) {
        // The punctuation mark and the uppercase letter are both single
        // bytes; the whitespace run between them is dropped.
        let sentence_end = found.start() + 1;
        sentences.push(text[start..sentence_end].to_string());
        start = found.end() - 1;
    }
    sentences.push(text[start..].to_string());

    sentences
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
