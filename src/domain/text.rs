//! Tokenization shared by the scorer and the response length classifier.
//!
//! Tokens are maximal runs of alphanumeric characters, lowercased. Everything
//! else (punctuation, currency symbols, whitespace) separates tokens.

use std::collections::HashSet;

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "am", "an", "and", "any", "are", "as", "at",
    "be", "been", "before", "being", "below", "between", "both", "but", "by", "can", "could",
    "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further",
    "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if",
    "in", "into", "is", "it", "its", "itself", "just", "me", "more", "most", "my", "no", "nor",
    "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "out", "over",
    "own", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
];

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Lowercased tokens joined by single spaces.
pub fn normalize(text: &str) -> String {
    tokenize(text).join(" ")
}

/// Folds simple English plurals so `invoices` matches `invoice`.
pub fn fold(token: &str) -> String {
    let len = token.chars().count();
    if len > 4 && token.ends_with("ies") {
        format!("{}y", &token[..token.len() - 3])
    } else if len > 3 && token.ends_with('s') && !token.ends_with("ss") {
        token[..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

/// Distinct folded non-stopword terms, in first-occurrence order.
pub fn content_terms(tokens: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .iter()
        .filter(|t| !is_stopword(t))
        .map(|t| fold(t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// True when `needle` occurs as a contiguous run inside `haystack`.
pub fn contains_sequence(haystack: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Whole-phrase match against already normalized text.
pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    format!(" {normalized} ").contains(&format!(" {phrase} "))
}
