//! Failure policies for the two external collaborators.
//!
//! Index sub-queries and the label backend fail differently:
//! a broken index sub-query only stops that filter from constraining the
//! result, while a broken label check empties the result.

use std::collections::HashSet;

use tracing::{error, warn};

use crate::error::Result;
use crate::labels::LabelMembership;
use crate::model::hit::{IndexHit, SubQueryResult};

/// An index sub-query that fails contributes `None`, as if its filter
/// were not evaluated.
#[derive(Debug, Clone, Copy, Default)]
pub struct DegradePerFilter;

impl DegradePerFilter {
    pub fn settle(self, label: &str, outcome: Result<Vec<IndexHit>>) -> SubQueryResult {
        match outcome {
            Ok(hits) => Some(hits),
            Err(e) => {
                warn!(sub_query = label, error = %e, "Index sub-query failed, ignoring its filter");
                None
            }
        }
    }
}

/// A label check that fails, or answers without data, allows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailClosed;

impl FailClosed {
    /// Thread ids the backend confirmed, restricted to the ones asked about.
    pub fn settle(
        self,
        requested: &[String],
        outcome: Result<LabelMembership>,
    ) -> HashSet<String> {
        let thread_ids = match outcome {
            Ok(LabelMembership {
                thread_ids: Some(ids),
            }) => ids,
            Ok(LabelMembership { thread_ids: None }) => {
                error!(
                    threads = requested.len(),
                    "Label backend response carried no data, dropping all candidates"
                );
                return HashSet::new();
            }
            Err(e) => {
                error!(
                    threads = requested.len(),
                    error = %e,
                    "Label backend check failed, dropping all candidates"
                );
                return HashSet::new();
            }
        };

        let requested: HashSet<&str> = requested.iter().map(String::as_str).collect();
        thread_ids
            .into_iter()
            .filter(|id| requested.contains(id.as_str()))
            .collect()
    }
}
