//! Result ordering.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MailscopeError;
use crate::model::hit::ReconciledHit;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Highest merged score first; ties keep the index's order.
    #[default]
    Relevance,
    /// Oldest first.
    #[value(alias = "asc")]
    ChronologicalAsc,
    /// Newest first.
    #[value(alias = "desc")]
    ChronologicalDesc,
}

impl FromStr for SortOrder {
    type Err = MailscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relevance" => Ok(SortOrder::Relevance),
            "asc" | "chronological-asc" | "oldest" => Ok(SortOrder::ChronologicalAsc),
            "desc" | "chronological-desc" | "newest" | "date" => Ok(SortOrder::ChronologicalDesc),
            other => Err(MailscopeError::InvalidFilter(format!(
                "unknown sort order '{other}'"
            ))),
        }
    }
}

/// Return `hits` ordered by `order`, leaving the input untouched.
///
/// Every order ends with `rank` and then `id` as tie-breaks, so equal
/// inputs always produce the same output.
pub fn sort_hits(hits: &[ReconciledHit], order: SortOrder) -> Vec<ReconciledHit> {
    let mut sorted = hits.to_vec();
    sorted.sort_by(|a, b| compare(a, b, order));
    sorted
}

fn compare(a: &ReconciledHit, b: &ReconciledHit, order: SortOrder) -> Ordering {
    let primary = match order {
        SortOrder::Relevance => b.score.total_cmp(&a.score),
        SortOrder::ChronologicalAsc => a.created_at.cmp(&b.created_at),
        SortOrder::ChronologicalDesc => b.created_at.cmp(&a.created_at),
    };
    primary
        .then_with(|| a.rank.cmp(&b.rank))
        .then_with(|| a.id.cmp(&b.id))
}
