//! Label authority gate.
//!
//! Label membership is not in the local index, so when label filters are
//! active the reconciled candidates are checked against the backend in a
//! single lookup, and settled with [`FailClosed`].

use std::collections::HashSet;

use tracing::debug;

use crate::labels::{LabelMatch, LabelQuery, LabelResolver};
use crate::model::hit::ReconciledHit;

use super::filter::{LabelSelection, SearchFilter};
use super::policy::FailClosed;

/// Keep only candidates whose thread carries every requested label.
///
/// Without label filters the candidates pass through untouched.
pub async fn apply_label_gate(
    candidates: Vec<ReconciledHit>,
    filters: &[SearchFilter],
    resolver: &dyn LabelResolver,
) -> Vec<ReconciledHit> {
    let selection = LabelSelection::from_filters(filters);
    if selection.is_empty() || candidates.is_empty() {
        return candidates;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let thread_ids: Vec<String> = candidates
        .iter()
        .filter(|hit| seen.insert(hit.thread_id.as_str()))
        .map(|hit| hit.thread_id.clone())
        .collect();

    let query = LabelQuery {
        thread_ids,
        system_labels: selection.system_labels,
        user_label_ids: selection.user_label_ids,
        mode: LabelMatch::All,
    };
    let outcome = resolver.resolve_label_membership(&query).await;
    let allowed = FailClosed.settle(&query.thread_ids, outcome);

    let before = candidates.len();
    let gated: Vec<ReconciledHit> = candidates
        .into_iter()
        .filter(|hit| allowed.contains(&hit.thread_id))
        .collect();
    debug!(
        threads = query.thread_ids.len(),
        allowed_threads = allowed.len(),
        before,
        after = gated.len(),
        "Label gate applied"
    );
    gated
}
