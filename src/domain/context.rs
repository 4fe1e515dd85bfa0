use serde::Serialize;
use std::fmt::Write;

use crate::domain::{ConversationMemory, LengthHint, ScoredChunk, MEMORY_WINDOW};

pub const DEFAULT_CONTEXT_BUDGET: usize = 6000;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssembledContext {
    pub text: String,
    /// Number of ranked chunks that made it into `text`, counted from the top.
    pub included_chunks: usize,
    pub dropped_chunks: usize,
}

/// Builds the text block handed to generation.
///
/// Chunk bodies are added in rank order, each tagged with its source name.
/// `max_budget` is measured in characters of chunk bodies; once the next
/// chunk would overflow it, it and everything ranked below are dropped. The
/// top chunk is cut at a word boundary instead of being dropped.
pub fn assemble(
    ranked: &[ScoredChunk],
    memory: &ConversationMemory,
    length_hint: LengthHint,
    max_budget: usize,
) -> AssembledContext {
    let mut text = String::new();
    let mut used = 0;
    let mut included = 0;

    if !ranked.is_empty() {
        text.push_str("Relevant document excerpts:\n");
    }

    for (rank, scored) in ranked.iter().enumerate() {
        let body = scored.chunk.text.trim();
        let len = body.chars().count();
        let body = if used + len <= max_budget {
            body.to_string()
        } else if rank == 0 {
            truncate_at_word(body, max_budget)
        } else {
            break;
        };
        if body.is_empty() {
            break;
        }

        used += body.chars().count();
        included += 1;
        let _ = write!(
            text,
            "\n[{}] (source: {})\n{}\n",
            rank + 1,
            scored.chunk.metadata.source_name,
            body
        );
    }

    let history = &memory.messages()[memory.len().saturating_sub(MEMORY_WINDOW)..];
    if !history.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str("Recent conversation:\n");
        for message in history {
            let _ = writeln!(text, "{}: {}", message.role.as_str(), message.content.trim());
        }
    }

    if !text.is_empty() {
        text.push('\n');
    }
    let _ = write!(text, "Response guidance: {}", length_hint.instruction());

    AssembledContext {
        text,
        included_chunks: included,
        dropped_chunks: ranked.len() - included,
    }
}

/// Longest prefix of whole words within `max_chars` characters. A single
/// word longer than the budget is cut at a character boundary.
fn truncate_at_word(text: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for word in text.split_whitespace() {
        let extra = word.chars().count() + usize::from(!out.is_empty());
        if out.chars().count() + extra > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        out = text.chars().take(max_chars).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chunk, ChunkMetadata, Embedding, Message, SignalScores, SourceType};
    use std::sync::Arc;
    use uuid::Uuid;

    fn scored(text: &str, source: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Arc::new(Chunk::new(
                Uuid::new_v4(),
                0,
                text,
                Embedding::new(vec![1.0]),
                ChunkMetadata::new(SourceType::Text, source),
            )),
            signals: SignalScores::default(),
            combined_score: score,
        }
    }

    #[test]
    fn test_chunks_tagged_in_rank_order() {
        let ranked = vec![
            scored("The invoice total is $450", "invoice.pdf", 0.9),
            scored("Invoices are billed monthly", "billing.txt", 0.5),
        ];
        let ctx = assemble(&ranked, &ConversationMemory::new(), LengthHint::Balanced, 1000);

        assert_eq!(ctx.included_chunks, 2);
        assert_eq!(ctx.dropped_chunks, 0);
        let first = ctx.text.find("[1] (source: invoice.pdf)").unwrap();
        let second = ctx.text.find("[2] (source: billing.txt)").unwrap();
        assert!(first < second);
        assert!(ctx.text.ends_with(LengthHint::Balanced.instruction()));
    }

    #[test]
    fn test_budget_drops_lowest_ranked_first() {
        let ranked = vec![
            scored(&"a ".repeat(20), "one", 0.9),
            scored(&"b ".repeat(20), "two", 0.8),
            scored(&"c ".repeat(20), "three", 0.7),
        ];
        // Each body trims to 39 chars.
        let ctx = assemble(&ranked, &ConversationMemory::new(), LengthHint::Brief, 80);

        assert_eq!(ctx.included_chunks, 2);
        assert_eq!(ctx.dropped_chunks, 1);
        assert!(ctx.text.contains("(source: one)"));
        assert!(ctx.text.contains("(source: two)"));
        assert!(!ctx.text.contains("(source: three)"));
    }

    #[test]
    fn test_top_chunk_truncated_not_dropped() {
        let ranked = vec![scored("alpha beta gamma delta epsilon", "big", 0.9)];
        let ctx = assemble(&ranked, &ConversationMemory::new(), LengthHint::Balanced, 12);

        assert_eq!(ctx.included_chunks, 1);
        assert!(ctx.text.contains("alpha beta\n"));
        assert!(!ctx.text.contains("gamma"));
    }

    #[test]
    fn test_memory_rendered_oldest_first() {
        let memory = ConversationMemory::from_messages(
            (0..8)
                .map(|i| {
                    if i % 2 == 0 {
                        Message::user(format!("question {i}"))
                    } else {
                        Message::assistant(format!("answer {i}"))
                    }
                })
                .collect(),
        );
        let ctx = assemble(&[], &memory, LengthHint::List, 100);

        assert!(!ctx.text.contains("question 0"));
        assert!(!ctx.text.contains("answer 1"));
        let oldest = ctx.text.find("User: question 2").unwrap();
        let newest = ctx.text.find("Assistant: answer 7").unwrap();
        assert!(oldest < newest);
        assert!(ctx.text.ends_with(LengthHint::List.instruction()));
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let ranked = vec![scored("The invoice total is $450", "invoice.pdf", 0.9)];
        let memory = ConversationMemory::from_messages(vec![Message::user("hi")]);
        assert_eq!(
            assemble(&ranked, &memory, LengthHint::Detailed, 500),
            assemble(&ranked, &memory, LengthHint::Detailed, 500)
        );
    }

    #[test]
    fn test_empty_inputs_still_carry_guidance() {
        let ctx = assemble(&[], &ConversationMemory::new(), LengthHint::Brief, 100);
        assert_eq!(
            ctx.text,
            format!("Response guidance: {}", LengthHint::Brief.instruction())
        );
        assert_eq!(ctx.included_chunks, 0);
    }
}
