//! Token-budgeted prompt context assembly.

use crate::chunking::estimate_tokens;
use crate::retrieval::RetrievedChunk;

/// Default context budget for chat, in estimated tokens.
pub const DEFAULT_CONTEXT_TOKENS: usize = 5000;

/// Assembles retrieved chunks into a prompt context.
///
/// Chunks are taken in the order given (callers sort by relevance); each
/// becomes a block tagged with its page number (`unknown` when absent) and
/// section index. Accumulation stops at the first block that would push the
/// running `ceil(chars/4)` estimate past `max_tokens` — later chunks are
/// never considered, even if they would fit. Strict prefix truncation keeps
/// the output deterministic and the cost predictable.
pub fn build_context(chunks: &[RetrievedChunk], max_tokens: usize) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    let mut context = String::new();
    let mut current_tokens = 0usize;

    for chunk in chunks {
        let page = match chunk.page_number {
            Some(page) => page.to_string(),
            None => "unknown".to_string(),
        };
        let block = format!(
            "[Page {page}, Section {}]\n{}\n\n",
            chunk.chunk_index, chunk.content
        );

        let tokens = estimate_tokens(&block);
        if current_tokens + tokens > max_tokens {
            break;
        }

        context.push_str(&block);
        current_tokens += tokens;
    }

    context.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, page: Option<u32>, content: &str) -> RetrievedChunk {
        RetrievedChunk {
            id: format!("c{index}"),
            document_id: "doc".into(),
            content: content.to_string(),
            chunk_index: index,
            page_number: page,
            similarity: 0.8,
        }
    }

    #[test]
    fn empty_input_builds_empty_context() {
        assert_eq!(build_context(&[], 5000), "");
    }

    #[test]
    fn blocks_carry_page_and_section_provenance() {
        let context = build_context(
            &[chunk(0, Some(2), "First passage."), chunk(1, None, "Second passage.")],
            5000,
        );
        assert!(context.starts_with("[Page 2, Section 0]\nFirst passage."));
        assert!(context.contains("[Page unknown, Section 1]\nSecond passage."));
        assert!(!context.ends_with('\n'));
    }

    #[test]
    fn budget_is_never_exceeded() {
        let chunks: Vec<RetrievedChunk> = (0..20)
            .map(|i| chunk(i, Some(1), &"long passage text ".repeat(20)))
            .collect();
        let context = build_context(&chunks, 200);
        assert!(estimate_tokens(&context) <= 200);
        assert!(!context.is_empty());
    }

    #[test]
    fn truncation_is_strict_prefix_not_best_fit() {
        // The second chunk blows the budget; the tiny third chunk would fit
        // but must not be considered.
        let chunks = vec![
            chunk(0, Some(1), &"a".repeat(200)),
            chunk(1, Some(1), &"b".repeat(4000)),
            chunk(2, Some(1), "tiny"),
        ];
        let context = build_context(&chunks, 100);
        assert!(context.contains("[Page 1, Section 0]"));
        assert!(!context.contains("[Page 1, Section 1]"));
        assert!(!context.contains("tiny"));
    }
}
