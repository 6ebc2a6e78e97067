//! Result reconciler: intersect sub-query results by id and merge evidence.
//!
//! A candidate must appear in every evaluated sub-query. Its match info
//! and matched terms are the union over all sources, and its score is the
//! mean over the sources that returned it. One pass over all hits builds
//! an id-keyed accumulator, so the merge is O(total hits) and does not
//! depend on the order sources are given in (apart from `rank`, which
//! records the first source's order for tie-breaking).

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use crate::model::hit::{IndexHit, MatchInfo, ReconciledHit, SubQueryResult};

/// Outcome of reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Every sub-query was `None`: nothing was evaluated.
    NothingToReconcile,
    /// Ids present in every evaluated sub-query, in first-source order.
    Candidates(Vec<ReconciledHit>),
}

/// Merged state for one id.
struct Accumulator {
    first: IndexHit,
    rank: usize,
    score_sum: f64,
    sources: usize,
    last_source: usize,
    matched_terms: BTreeSet<String>,
    match_info: MatchInfo,
}

impl Accumulator {
    fn new(hit: IndexHit, rank: usize) -> Self {
        Self {
            rank,
            score_sum: hit.score,
            sources: 1,
            last_source: 0,
            matched_terms: hit.matched_terms.clone(),
            match_info: hit.match_info.clone(),
            first: hit,
        }
    }

    /// Fold in a hit from `source`. A repeated id inside one source adds
    /// evidence but not another score.
    fn absorb(&mut self, source: usize, hit: IndexHit) {
        if source != self.last_source {
            self.last_source = source;
            self.sources += 1;
            self.score_sum += hit.score;
        }
        self.matched_terms.extend(hit.matched_terms);
        for (term, fields) in hit.match_info {
            self.match_info.entry(term).or_default().extend(fields);
        }
    }

    fn finish(self) -> ReconciledHit {
        ReconciledHit {
            id: self.first.id,
            thread_id: self.first.thread_id,
            kind: self.first.kind,
            created_at: self.first.created_at,
            score: self.score_sum / self.sources as f64,
            matched_terms: self.matched_terms,
            match_info: self.match_info,
            sources: self.sources,
            rank: self.rank,
        }
    }
}

/// Reconcile sub-query results.
pub fn reconcile(results: Vec<SubQueryResult>) -> Reconciliation {
    let sources: Vec<Vec<IndexHit>> = results.into_iter().flatten().collect();
    if sources.is_empty() {
        return Reconciliation::NothingToReconcile;
    }
    if sources.iter().any(Vec::is_empty) {
        return Reconciliation::Candidates(Vec::new());
    }

    let total = sources.len();
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, Accumulator> = HashMap::new();

    for (source, hits) in sources.into_iter().enumerate() {
        for hit in hits {
            match merged.entry(hit.id.clone()) {
                Entry::Occupied(mut slot) => slot.get_mut().absorb(source, hit),
                // Only ids from the first source can be in every source.
                Entry::Vacant(slot) if source == 0 => {
                    order.push(hit.id.clone());
                    slot.insert(Accumulator::new(hit, order.len() - 1));
                }
                Entry::Vacant(_) => {}
            }
        }
    }

    let candidates = order
        .into_iter()
        .filter_map(|id| merged.remove(&id))
        .filter(|acc| acc.sources == total)
        .map(Accumulator::finish)
        .collect();

    Reconciliation::Candidates(candidates)
}
