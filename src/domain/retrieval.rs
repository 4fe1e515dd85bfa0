use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{scoring::Scorer, Chunk, Query, ScoredChunk};

/// Snapshots at least this large are scored on the rayon pool.
pub const PARALLEL_SCORING_THRESHOLD: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub min_score: f32,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.1,
        }
    }
}

/// Total order used for ranking: combined score descending, then chunk id
/// ascending.
pub fn rank_order(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.combined_score
        .total_cmp(&a.combined_score)
        .then_with(|| a.chunk.id.cmp(&b.chunk.id))
}

/// Scores every accessible chunk of `snapshot` and returns the top `top_k`
/// at or above `min_score`.
///
/// Chunks whose document is not in `accessible` are removed before scoring.
pub fn rank_chunks(
    query: &Query,
    snapshot: &[Arc<Chunk>],
    accessible: &HashSet<Uuid>,
    scorer: &Scorer,
    options: &RetrievalOptions,
) -> Vec<ScoredChunk> {
    if accessible.is_empty() || options.top_k == 0 {
        return Vec::new();
    }

    let candidates: Vec<&Arc<Chunk>> = snapshot
        .iter()
        .filter(|c| accessible.contains(&c.document_id))
        .collect();
    let prepared = scorer.prepare(query);

    let mut scored: Vec<ScoredChunk> = if candidates.len() >= PARALLEL_SCORING_THRESHOLD {
        candidates
            .par_iter()
            .map(|c| scorer.score(&prepared, c))
            .collect()
    } else {
        candidates
            .iter()
            .map(|c| scorer.score(&prepared, c))
            .collect()
    };

    scored.retain(|s| s.combined_score >= options.min_score);
    scored.sort_by(rank_order);
    scored.truncate(options.top_k);

    tracing::debug!(
        candidates = candidates.len(),
        returned = scored.len(),
        degraded = query.is_degraded(),
        "ranked chunks"
    );

    scored
}
