//! Six-signal relevance scoring.
//!
//! Every chunk gets six independent signals in `[0, 1]`:
//!
//! | signal        | meaning                                                    |
//! |---------------|------------------------------------------------------------|
//! | semantic      | `(cos + 1) / 2` between query and chunk embeddings         |
//! | keyword       | share of query content terms present in the chunk          |
//! | exact phrase  | query (or a significant 3+ token sub-phrase) occurs as-is  |
//! | proximity     | how tightly the matched terms cluster in the chunk         |
//! | qa            | interrogative query and the chunk holds the answer shape   |
//! | quality       | extraction confidence and minimum-length penalty           |
//!
//! The combined score is the weighted sum. When the query has no embedding
//! the semantic weight is spread proportionally over the other five.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::{text, Chunk, DomainError, Query, Result, ScoredChunk, SignalScores};

/// Chunks shorter than this (in characters) lose part of their quality score.
pub const MIN_QUALITY_CHARS: usize = 50;

const WEIGHT_TOLERANCE: f32 = 1e-4;
const MIN_SUB_PHRASE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub semantic: f32,
    pub keyword: f32,
    pub exact_phrase: f32,
    pub proximity: f32,
    pub qa: f32,
    pub quality: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            semantic: 0.40,
            keyword: 0.20,
            exact_phrase: 0.15,
            proximity: 0.10,
            qa: 0.10,
            quality: 0.05,
        }
    }
}

impl ScoringWeights {
    pub fn new(
        semantic: f32,
        keyword: f32,
        exact_phrase: f32,
        proximity: f32,
        qa: f32,
        quality: f32,
    ) -> Result<Self> {
        let weights = Self {
            semantic,
            keyword,
            exact_phrase,
            proximity,
            qa,
            quality,
        };
        weights.validate()?;
        Ok(weights)
    }

    fn as_array(&self) -> [f32; 6] {
        [
            self.semantic,
            self.keyword,
            self.exact_phrase,
            self.proximity,
            self.qa,
            self.quality,
        ]
    }

    pub fn sum(&self) -> f32 {
        self.as_array().iter().sum()
    }

    pub fn validate(&self) -> Result<()> {
        if self.as_array().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DomainError::validation(
                "scoring weights must be finite and non-negative",
            ));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(DomainError::validation(format!(
                "scoring weights must sum to 1, got {sum}"
            )));
        }
        Ok(())
    }

    /// Weights for degraded mode: semantic is zeroed and its share is
    /// redistributed proportionally so the remaining five still sum to 1.
    pub fn without_semantic(&self) -> Self {
        let rest = 1.0 - self.semantic;
        if rest <= f32::EPSILON {
            return Self {
                semantic: 0.0,
                keyword: 0.2,
                exact_phrase: 0.2,
                proximity: 0.2,
                qa: 0.2,
                quality: 0.2,
            };
        }
        Self {
            semantic: 0.0,
            keyword: self.keyword / rest,
            exact_phrase: self.exact_phrase / rest,
            proximity: self.proximity / rest,
            qa: self.qa / rest,
            quality: self.quality / rest,
        }
    }

    pub fn combine(&self, s: &SignalScores) -> f32 {
        self.semantic * s.semantic
            + self.keyword * s.keyword
            + self.exact_phrase * s.exact_phrase
            + self.proximity * s.proximity
            + self.qa * s.qa
            + self.quality * s.quality
    }
}

/// The answer shape an interrogative query expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Quantity,
    Time,
    Person,
    Place,
    Reason,
    Method,
    Definition,
}

const QUESTION_WORDS: &[&str] = &["who", "what", "when", "where", "why", "how", "which"];
const QUANTITY_TERMS: &[&str] = &[
    "amount", "balance", "cost", "count", "fee", "number", "percentage", "price", "rate",
    "salary", "size", "sum", "total",
];
const NUMBER_WORDS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve", "twenty", "hundred", "thousand", "million", "billion", "dozen",
];
const TIME_WORDS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday", "today", "yesterday", "tomorrow", "ago", "daily", "weekly", "monthly",
    "yearly", "annually", "quarter",
];
const PLACE_WORDS: &[&str] = &[
    "address", "city", "country", "headquarters", "located", "location", "office", "region",
    "street",
];
const PLACE_PREPOSITIONS: &[&str] = &["in", "at", "near", "from"];
const REASON_PHRASES: &[&str] = &[
    "because", "due to", "since", "therefore", "as a result", "so that", "reason", "caused",
    "thanks to",
];
const METHOD_PHRASES: &[&str] = &[
    "step", "steps", "procedure", "instructions", "in order to", "follow these", "you need to",
    "you must", "to do this",
];
const DEFINITION_PHRASES: &[&str] = &[
    "is a", "is an", "are a", "means", "refers to", "defined as", "known as", "consists of",
    "is called", "stands for",
];

impl QuestionKind {
    /// `None` for statements; interrogatives lead with a question word or
    /// contain a question mark.
    pub fn detect(raw: &str, tokens: &[String]) -> Option<Self> {
        let interrogative = raw.contains('?')
            || tokens
                .first()
                .is_some_and(|t| QUESTION_WORDS.contains(&t.as_str()));
        if !interrogative {
            return None;
        }

        let position = tokens
            .iter()
            .position(|t| QUESTION_WORDS.contains(&t.as_str()));
        let kind = match position {
            Some(i) => match tokens[i].as_str() {
                "who" => Self::Person,
                "when" => Self::Time,
                "where" => Self::Place,
                "why" => Self::Reason,
                "how" => match tokens.get(i + 1).map(String::as_str) {
                    Some("many" | "much" | "long" | "old" | "often" | "big") => Self::Quantity,
                    _ => Self::Method,
                },
                _ => match tokens.get(i + 1).map(String::as_str) {
                    Some("time" | "date" | "year" | "day" | "month") => Self::Time,
                    _ if tokens.iter().any(|t| QUANTITY_TERMS.contains(&t.as_str())) => {
                        Self::Quantity
                    }
                    _ => Self::Definition,
                },
            },
            None => Self::Definition,
        };
        Some(kind)
    }

    /// Whether `raw` (with its tokens) contains content of the expected shape.
    pub fn answered_by(&self, raw: &str, tokens: &[String]) -> bool {
        let has_token = |words: &[&str]| tokens.iter().any(|t| words.contains(&t.as_str()));
        let normalized = || tokens.join(" ");
        let has_phrase = |phrases: &[&str]| {
            let normalized = normalized();
            phrases.iter().any(|p| text::contains_phrase(&normalized, p))
        };

        match self {
            Self::Quantity => {
                tokens.iter().any(|t| t.chars().any(|c| c.is_ascii_digit()))
                    || has_token(NUMBER_WORDS)
            }
            Self::Time => tokens.iter().any(|t| is_year(t)) || has_token(TIME_WORDS),
            Self::Person => has_inner_capitalized(raw),
            Self::Place => has_token(PLACE_WORDS) || has_place_phrase(raw),
            Self::Reason => has_phrase(REASON_PHRASES),
            Self::Method => has_phrase(METHOD_PHRASES),
            Self::Definition => has_phrase(DEFINITION_PHRASES),
        }
    }
}

fn is_year(token: &str) -> bool {
    token.len() == 4
        && token
            .parse::<u16>()
            .is_ok_and(|year| (1000..3000).contains(&year))
}

fn starts_uppercase(word: &str) -> bool {
    let mut chars = word.chars().filter(|c| c.is_alphanumeric());
    matches!(chars.next(), Some(c) if c.is_uppercase()) && chars.next().is_some()
}

/// A capitalized word that does not open a sentence, i.e. a likely name.
fn has_inner_capitalized(raw: &str) -> bool {
    let mut sentence_start = true;
    for word in raw.split_whitespace() {
        if !sentence_start && starts_uppercase(word) {
            return true;
        }
        sentence_start = word.ends_with(['.', '!', '?', ':']);
    }
    false
}

fn has_place_phrase(raw: &str) -> bool {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .windows(2)
        .any(|w| PLACE_PREPOSITIONS.contains(&w[0].to_lowercase().as_str()) && starts_uppercase(w[1]))
}

/// A query pre-processed once per retrieval and shared by every chunk score.
#[derive(Debug)]
pub struct PreparedQuery<'a> {
    query: &'a Query,
    tokens: Vec<String>,
    terms: Vec<String>,
    question: Option<QuestionKind>,
    weights: ScoringWeights,
}

#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: ScoringWeights,
}

impl Scorer {
    pub fn new(weights: ScoringWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn prepare<'a>(&self, query: &'a Query) -> PreparedQuery<'a> {
        let tokens: Vec<String> = query
            .normalized_text
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        let terms = text::content_terms(&tokens);
        let question = QuestionKind::detect(&query.raw_text, &tokens);
        let weights = if query.is_degraded() {
            self.weights.without_semantic()
        } else {
            self.weights
        };
        PreparedQuery {
            query,
            tokens,
            terms,
            question,
            weights,
        }
    }

    pub fn score(&self, prepared: &PreparedQuery<'_>, chunk: &Arc<Chunk>) -> ScoredChunk {
        let chunk_tokens = text::tokenize(&chunk.text);
        let folded: Vec<String> = chunk_tokens.iter().map(|t| text::fold(t)).collect();

        let keyword = keyword_score(&prepared.terms, &folded);
        let signals = SignalScores {
            semantic: semantic_score(prepared.query, chunk),
            keyword,
            exact_phrase: exact_phrase_score(&prepared.tokens, &chunk_tokens),
            proximity: proximity_score(&prepared.terms, &folded),
            qa: match prepared.question {
                Some(kind) if keyword > 0.0 && kind.answered_by(&chunk.text, &chunk_tokens) => 1.0,
                _ => 0.0,
            },
            quality: quality_score(chunk),
        };

        ScoredChunk {
            chunk: Arc::clone(chunk),
            combined_score: prepared.weights.combine(&signals),
            signals,
        }
    }
}

pub fn semantic_score(query: &Query, chunk: &Chunk) -> f32 {
    let Some(embedding) = &query.embedding else {
        return 0.0;
    };
    if embedding.dimension() != chunk.embedding.dimension() {
        tracing::warn!(
            chunk_id = %chunk.id,
            expected = embedding.dimension(),
            actual = chunk.embedding.dimension(),
            "chunk embedding dimension mismatch, semantic signal skipped"
        );
        return 0.0;
    }
    (embedding.cosine_similarity(&chunk.embedding) + 1.0) / 2.0
}

pub fn keyword_score(terms: &[String], folded_chunk: &[String]) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let present: HashSet<&str> = folded_chunk.iter().map(String::as_str).collect();
    let matched = terms.iter().filter(|t| present.contains(t.as_str())).count();
    matched as f32 / terms.len() as f32
}

pub fn exact_phrase_score(query_tokens: &[String], chunk_tokens: &[String]) -> f32 {
    if text::contains_sequence(chunk_tokens, query_tokens)
        || has_shared_sub_phrase(query_tokens, chunk_tokens)
    {
        1.0
    } else {
        0.0
    }
}

/// Whether the two token sequences share a contiguous run of at least
/// `MIN_SUB_PHRASE` tokens holding a content token. Runs are extended
/// diagonally, one row of `(run length, content tokens in run)` at a time.
fn has_shared_sub_phrase(query_tokens: &[String], chunk_tokens: &[String]) -> bool {
    if query_tokens.len() < MIN_SUB_PHRASE || chunk_tokens.len() < MIN_SUB_PHRASE {
        return false;
    }
    let content: Vec<usize> = query_tokens
        .iter()
        .map(|t| usize::from(!text::is_stopword(t)))
        .collect();

    let mut prev = vec![(0usize, 0usize); chunk_tokens.len() + 1];
    let mut row = vec![(0usize, 0usize); chunk_tokens.len() + 1];
    for (qi, q) in query_tokens.iter().enumerate() {
        for (ci, c) in chunk_tokens.iter().enumerate() {
            row[ci + 1] = if q == c {
                let (len, hits) = prev[ci];
                (len + 1, hits + content[qi])
            } else {
                (0, 0)
            };
            if row[ci + 1].0 >= MIN_SUB_PHRASE && row[ci + 1].1 > 0 {
                return true;
            }
        }
        std::mem::swap(&mut prev, &mut row);
    }
    false
}

/// `matched / span`, where `span` is the smallest token window of the chunk
/// holding every matched term.
pub fn proximity_score(terms: &[String], folded_chunk: &[String]) -> f32 {
    let term_ids: HashMap<&str, usize> = terms
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();
    let hits: Vec<(usize, usize)> = folded_chunk
        .iter()
        .enumerate()
        .filter_map(|(pos, t)| term_ids.get(t.as_str()).map(|&id| (pos, id)))
        .collect();

    let matched: HashSet<usize> = hits.iter().map(|&(_, id)| id).collect();
    let needed = matched.len();
    if needed < 2 {
        return 0.0;
    }

    let mut counts: HashMap<usize, usize> = HashMap::new();
    let mut covered = 0;
    let mut best = usize::MAX;
    let mut left = 0;
    for right in 0..hits.len() {
        let entry = counts.entry(hits[right].1).or_insert(0);
        if *entry == 0 {
            covered += 1;
        }
        *entry += 1;

        while covered == needed {
            best = best.min(hits[right].0 - hits[left].0 + 1);
            if let Some(count) = counts.get_mut(&hits[left].1) {
                *count -= 1;
                if *count == 0 {
                    covered -= 1;
                }
            }
            left += 1;
        }
    }

    (needed as f32 / best as f32).min(1.0)
}

pub fn quality_score(chunk: &Chunk) -> f32 {
    let confidence = chunk
        .metadata
        .quality_hint
        .unwrap_or_else(|| chunk.metadata.source_type.base_confidence());
    let len = chunk.text.chars().count();
    let length_factor = if len >= MIN_QUALITY_CHARS {
        1.0
    } else {
        0.5 + 0.5 * len as f32 / MIN_QUALITY_CHARS as f32
    };
    (confidence * length_factor).clamp(0.0, 1.0)
}
