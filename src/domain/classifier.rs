use crate::domain::{text, LengthHint};

const BRIEF_PATTERNS: &[&str] = &[
    "in one line",
    "one line",
    "one sentence",
    "in a sentence",
    "single sentence",
    "briefly",
    "brief",
    "in short",
    "short answer",
    "quick answer",
    "in a few words",
    "tl dr",
    "tldr",
];

const LIST_PATTERNS: &[&str] = &[
    "list",
    "enumerate",
    "bullet",
    "bullets",
    "bullet points",
    "itemize",
];

const DETAIL_PATTERNS: &[&str] = &[
    "in detail",
    "detailed",
    "in depth",
    "comprehensive",
    "thorough",
    "thoroughly",
    "elaborate",
    "step by step",
];

/// Infers the desired answer shape from the phrasing of a query.
///
/// Categories are tested in the order brief, list, detailed; the first match
/// wins and anything else is [`LengthHint::Balanced`].
pub fn classify(query: &str) -> LengthHint {
    let normalized = text::normalize(query);
    let matches = |patterns: &[&str]| patterns.iter().any(|p| text::contains_phrase(&normalized, p));

    if matches(BRIEF_PATTERNS) {
        LengthHint::Brief
    } else if matches(LIST_PATTERNS) {
        LengthHint::List
    } else if matches(DETAIL_PATTERNS) {
        LengthHint::Detailed
    } else {
        LengthHint::Balanced
    }
}
