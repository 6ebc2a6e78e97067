//! Compound search: filters → sub-queries → reconciliation → label gate →
//! ordering → caller-facing results.

pub mod dispatch;
pub mod filter;
pub mod gate;
pub mod normalize;
pub mod policy;
pub mod reconcile;
pub mod sort;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::index::{SearchIndex, SearchScope};
use crate::labels::LabelResolver;
use crate::model::hit::RankedResult;

use self::dispatch::DispatchOptions;
use self::filter::{normalize_free_text, SearchFilter};
use self::reconcile::Reconciliation;
use self::sort::SortOrder;

/// Result of one resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Nothing was searched: no free text and no resolvable field filter,
    /// or every dispatched sub-query failed.
    NotPerformed,
    /// A search ran; the list may be empty.
    Results(Vec<RankedResult>),
}

impl SearchOutcome {
    pub fn performed(&self) -> bool {
        matches!(self, SearchOutcome::Results(_))
    }

    /// The results, or an empty slice if nothing was searched.
    pub fn results(&self) -> &[RankedResult] {
        match self {
            SearchOutcome::NotPerformed => &[],
            SearchOutcome::Results(results) => results,
        }
    }
}

/// Per-search index options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub scope: SearchScope,
    pub fuzzy: bool,
    pub autosuggest: bool,
    pub prefer_all_terms_match: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            scope: SearchScope::Everything,
            fuzzy: true,
            autosuggest: false,
            prefer_all_terms_match: true,
        }
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            scope: config.scope,
            fuzzy: config.fuzzy,
            autosuggest: config.autosuggest,
            prefer_all_terms_match: config.prefer_all_terms_match,
        }
    }
}

/// Resolves compound queries against a local index and a label backend.
///
/// Holds no per-search state: every call is resolved from scratch, and
/// concurrent calls are independent. Discarding the output of a superseded
/// call is up to the caller.
#[derive(Clone)]
pub struct MailSearch {
    index: Arc<dyn SearchIndex>,
    labels: Arc<dyn LabelResolver>,
    options: SearchOptions,
}

impl MailSearch {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        labels: Arc<dyn LabelResolver>,
        options: SearchOptions,
    ) -> Self {
        Self {
            index,
            labels,
            options,
        }
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    pub async fn resolve(
        &self,
        free_text: &str,
        filters: &[SearchFilter],
        order: SortOrder,
    ) -> SearchOutcome {
        self.resolve_at(free_text, filters, order, Utc::now()).await
    }

    /// Like [`resolve`](Self::resolve), with date filters evaluated against `now`.
    pub async fn resolve_at(
        &self,
        free_text: &str,
        filters: &[SearchFilter],
        order: SortOrder,
        now: DateTime<Utc>,
    ) -> SearchOutcome {
        let start = Instant::now();
        let free_text = normalize_free_text(free_text);
        let options = DispatchOptions {
            scope: self.options.scope,
            fuzzy: self.options.fuzzy,
            autosuggest: self.options.autosuggest,
            prefer_all_terms_match: self.options.prefer_all_terms_match,
            now,
        };

        let planned = dispatch::plan(&free_text, filters, &options);
        if planned.is_empty() {
            debug!(filters = filters.len(), "No sub-query to dispatch");
            return SearchOutcome::NotPerformed;
        }

        let results = dispatch::dispatch(&*self.index, &planned).await;
        debug!(
            sub_queries = planned.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Sub-queries complete"
        );

        let candidates = match reconcile::reconcile(results) {
            Reconciliation::NothingToReconcile => {
                debug!("Every sub-query degraded, nothing to reconcile");
                return SearchOutcome::NotPerformed;
            }
            Reconciliation::Candidates(candidates) => candidates,
        };
        debug!(candidates = candidates.len(), "Reconciled");

        let gated = gate::apply_label_gate(candidates, filters, &*self.labels).await;
        let sorted = sort::sort_hits(&gated, order);
        let results = normalize::normalize(sorted);

        info!(
            results = results.len(),
            sub_queries = planned.len(),
            ?order,
            duration_ms = start.elapsed().as_millis() as u64,
            "Search resolved"
        );
        SearchOutcome::Results(results)
    }
}
