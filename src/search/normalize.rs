//! Reshape gated, sorted hits into caller-facing results.

use crate::model::hit::{ItemKind, RankedResult, ReconciledHit};

/// Keep message entries only, preserving order.
pub fn normalize(hits: Vec<ReconciledHit>) -> Vec<RankedResult> {
    hits.into_iter()
        .filter(|hit| hit.kind == ItemKind::Message)
        .map(|hit| RankedResult {
            id: hit.id,
            thread_id: hit.thread_id,
            score: hit.score,
            terms: hit.matched_terms.into_iter().collect(),
            match_info: hit.match_info,
            created_at: hit.created_at,
        })
        .collect()
}
