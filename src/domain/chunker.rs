use crate::domain::{DomainError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Splits text into overlapping windows of at most `size` characters.
///
/// Words are never split: a window ends at the last whole word that fits, and
/// a single word longer than `size` becomes its own window. Each window after
/// the first starts with the trailing words of the previous one, totalling at
/// most `overlap` characters. Words are re-joined with single spaces.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    if size == 0 {
        return Err(DomainError::validation("chunk size must be positive"));
    }
    if overlap >= size {
        return Err(DomainError::validation(format!(
            "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
        )));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let widths: Vec<usize> = words.iter().map(|w| w.chars().count()).collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let mut end = start;
        let mut len = 0;
        while end < words.len() {
            let add = widths[end] + usize::from(end > start);
            if end > start && len + add > size {
                break;
            }
            len += add;
            end += 1;
        }

        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }

        // Carry trailing words into the next window, keeping at least one new word.
        let mut next = end;
        let mut carried = 0;
        while next > start + 1 {
            let add = widths[next - 1] + usize::from(carried > 0);
            if carried + add > overlap {
                break;
            }
            carried += add;
            next -= 1;
        }
        // No room for the next word after the carry: start fresh.
        if next < end && carried + 1 + widths[end] > size {
            next = end;
        }
        start = next;
    }

    Ok(chunks)
}
