//! Sub-query dispatcher: turns free text and filters into scoped index calls.
//!
//! Planning is pure; execution runs the planned requests concurrently and
//! settles each failure with [`DegradePerFilter`]. The order of results
//! matches the order of the plan.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::debug;

use crate::index::{IndexRequest, SearchIndex, SearchScope};
use crate::model::hit::{Field, SubQueryResult};

use super::filter::{date_constraint, AddressField, ContentField, SearchFilter};
use super::policy::DegradePerFilter;

/// Fields the leftover free text is searched in when other field filters
/// are active.
pub const CONTENT_FIELDS: [Field; 2] = [Field::Subject, Field::Body];

/// Why a sub-query was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubQueryOrigin {
    Address(AddressField),
    Content(ContentField),
    /// No field filter resolved: the free text across every field.
    AllFields,
    /// Field filters resolved but none consumed the free text.
    ContentRemainder,
}

impl SubQueryOrigin {
    pub fn label(self) -> &'static str {
        match self {
            SubQueryOrigin::Address(AddressField::From) => "from",
            SubQueryOrigin::Address(AddressField::To) => "to",
            SubQueryOrigin::Content(ContentField::Subject) => "subject",
            SubQueryOrigin::Content(ContentField::Body) => "body",
            SubQueryOrigin::AllFields => "all-fields",
            SubQueryOrigin::ContentRemainder => "content",
        }
    }

    fn fields(self) -> Option<Vec<Field>> {
        match self {
            SubQueryOrigin::Address(AddressField::From) => Some(vec![Field::From]),
            SubQueryOrigin::Address(AddressField::To) => {
                Some(vec![Field::To, Field::Cc, Field::Bcc])
            }
            SubQueryOrigin::Content(ContentField::Subject) => Some(vec![Field::Subject]),
            SubQueryOrigin::Content(ContentField::Body) => Some(vec![Field::Body]),
            SubQueryOrigin::AllFields => None,
            SubQueryOrigin::ContentRemainder => Some(CONTENT_FIELDS.to_vec()),
        }
    }
}

/// One planned index call.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    pub origin: SubQueryOrigin,
    pub request: IndexRequest,
}

/// Options shared by every sub-query of one resolution.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub scope: SearchScope,
    pub fuzzy: bool,
    pub autosuggest: bool,
    pub prefer_all_terms_match: bool,
    /// Clock the date filter is evaluated against.
    pub now: DateTime<Utc>,
}

/// Plan the sub-queries for `free_text` (already normalized) and `filters`.
///
/// An empty plan means no search is performed at all.
pub fn plan(free_text: &str, filters: &[SearchFilter], options: &DispatchOptions) -> Vec<SubQuery> {
    let free_text = free_text.trim();
    let date_range = date_constraint(filters, options.now);
    let make = |origin: SubQueryOrigin, query: String| SubQuery {
        origin,
        request: IndexRequest {
            query,
            scope: options.scope,
            fields: origin.fields(),
            date_range,
            // Addresses match exactly; a one-character typo is another mailbox.
            fuzzy: options.fuzzy && !matches!(origin, SubQueryOrigin::Address(_)),
            autosuggest: options.autosuggest,
            prefer_all_terms_match: options.prefer_all_terms_match,
        },
    };

    let mut planned: Vec<SubQuery> = Vec::new();
    let mut text_consumed = false;

    for filter in filters {
        let (origin, query) = match filter {
            SearchFilter::Address { field, .. } => match filter.address_query() {
                Some(address) => (SubQueryOrigin::Address(*field), address),
                None => {
                    debug!(field = ?field, "Address filter has no search string, skipping");
                    continue;
                }
            },
            SearchFilter::ContentField { field } => {
                if free_text.is_empty() {
                    debug!(field = ?field, "Content filter has no free text, skipping");
                    continue;
                }
                text_consumed = true;
                (SubQueryOrigin::Content(*field), free_text.to_string())
            }
            _ => continue,
        };

        let sub_query = make(origin, query);
        if !planned.contains(&sub_query) {
            planned.push(sub_query);
        }
    }

    if !free_text.is_empty() && !text_consumed {
        let origin = if planned.is_empty() {
            SubQueryOrigin::AllFields
        } else {
            SubQueryOrigin::ContentRemainder
        };
        planned.push(make(origin, free_text.to_string()));
    }

    planned
}

/// Run the planned sub-queries concurrently against `index`.
pub async fn dispatch(index: &dyn SearchIndex, planned: &[SubQuery]) -> Vec<SubQueryResult> {
    let calls = planned.iter().map(|sub_query| async move {
        let outcome = index.search(&sub_query.request).await;
        let settled = DegradePerFilter.settle(sub_query.origin.label(), outcome);
        debug!(
            sub_query = sub_query.origin.label(),
            hits = settled.as_ref().map(Vec::len),
            "Sub-query settled"
        );
        settled
    });
    join_all(calls).await
}
