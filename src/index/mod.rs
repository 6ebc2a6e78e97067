//! Contract of the local full-text index.
//!
//! The index is built and maintained elsewhere; this crate only queries it.
//! A request can be narrowed to a subset of fields and carries the date
//! range so the index evaluates it as part of the query rather than the
//! caller post-filtering.

pub mod memory;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::hit::{Field, IndexHit};

/// Which index entries a request may return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Messages and non-message entries such as contacts.
    #[default]
    Everything,
    /// Messages only.
    Messages,
}

/// Inclusive creation-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// The window covering the last `days` days up to `now`.
    ///
    /// A window reaching past the earliest representable time has no lower
    /// bound.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        let start = Duration::try_days(i64::from(days))
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// One scoped call against the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRequest {
    pub query: String,
    pub scope: SearchScope,
    /// Fields to search; `None` searches all of them.
    pub fields: Option<Vec<Field>>,
    pub date_range: Option<DateRange>,
    pub fuzzy: bool,
    pub autosuggest: bool,
    pub prefer_all_terms_match: bool,
}

impl IndexRequest {
    /// Fields this request searches.
    pub fn searched_fields(&self) -> &[Field] {
        self.fields.as_deref().unwrap_or(&Field::ALL[..])
    }
}

/// The local full-text index.
///
/// Hits come back in the index's own relevance order; that order is the
/// tie-break for equal scores further down the pipeline.
#[async_trait::async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, request: &IndexRequest) -> crate::error::Result<Vec<IndexHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_last_days_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let range = DateRange::last_days(7, now);
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()));
        assert!(range.contains(now));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 6, 3, 11, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 1).unwrap()));
    }

    #[test]
    fn test_last_days_beyond_calendar_is_unbounded() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let range = DateRange::last_days(100_000_000, now);
        assert_eq!(range.start, DateTime::<Utc>::MIN_UTC);
        assert!(range.contains(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()));
        assert!(range.contains(now));

        let range = DateRange::last_days(u32::MAX, now);
        assert_eq!(range.start, DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_searched_fields_defaults_to_all() {
        let request = IndexRequest {
            query: "x".into(),
            scope: SearchScope::Everything,
            fields: None,
            date_range: None,
            fuzzy: false,
            autosuggest: false,
            prefer_all_terms_match: true,
        };
        assert_eq!(request.searched_fields(), &Field::ALL);
    }
}
