//! Text cleanup applied before sentence splitting.

use std::sync::LazyLock;

use regex::Regex;

static INNER_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("inner space pattern"));
static MULTI_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline run pattern"));

/// Normalizes extracted document text.
///
/// Line endings become `\n`, each line is trimmed, space/tab runs inside a
/// line collapse to a single space, and runs of three or more newlines
/// collapse to exactly two. The operation is idempotent:
/// `normalize_text(normalize_text(t)) == normalize_text(t)`.
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<String> = unified
        .lines()
        .map(|line| INNER_SPACE.replace_all(line.trim(), " ").into_owned())
        .collect();
    let joined = lines.join("\n");
    MULTI_NEWLINE.replace_all(&joined, "\n\n").trim().to_string()
}

/// Truncates text to at most `max_chars` characters, preferring to cut at a
/// sentence or line boundary when one falls within the last 10% of the
/// window. A hard cut appends `"..."`.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }

    let window = &chars[..max_chars];
    let boundary = window.iter().rposition(|c| *c == '.' || *c == '\n');

    match boundary {
        Some(idx) if idx * 10 > max_chars * 9 => window[..=idx].iter().collect(),
        _ => {
            let mut truncated: String = window.iter().collect();
            truncated.push_str("...");
            truncated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_newline_runs() {
        let raw = "  Title line  \r\n\r\n\r\n\r\nBody   text\twith   runs  \n";
        let cleaned = normalize_text(raw);
        assert_eq!(cleaned, "Title line\n\nBody text with runs");
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = "First   line \n\n\n\n  second\tline  \r\n third";
        let once = normalize_text(raw);
        assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn empty_and_whitespace_input_normalize_to_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   \n\n\t  "), "");
    }

    #[test]
    fn truncate_returns_short_text_unchanged() {
        assert_eq!(truncate_text("short text", 100), "short text");
    }

    #[test]
    fn truncate_prefers_late_sentence_boundary() {
        // Boundary at index 95 of a 100-char window falls in the last 10%.
        let text = format!("{}.{}", "a".repeat(95), "b".repeat(200));
        let truncated = truncate_text(&text, 100);
        assert_eq!(truncated.chars().count(), 96);
        assert!(truncated.ends_with('.'));
    }

    #[test]
    fn truncate_hard_cuts_with_ellipsis_when_no_boundary() {
        let text = "x".repeat(500);
        let truncated = truncate_text(&text, 100);
        assert_eq!(truncated.chars().count(), 103);
        assert!(truncated.ends_with("..."));
    }
}
