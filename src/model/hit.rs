//! Index hits and the shapes they take through reconciliation.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A searchable field of an indexed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    From,
    To,
    Cc,
    Bcc,
    Subject,
    Body,
}

impl Field {
    /// Every field, in index order.
    pub const ALL: [Field; 6] = [
        Field::From,
        Field::To,
        Field::Cc,
        Field::Bcc,
        Field::Subject,
        Field::Body,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::From => "from",
            Field::To => "to",
            Field::Cc => "cc",
            Field::Bcc => "bcc",
            Field::Subject => "subject",
            Field::Body => "body",
        }
    }

    pub fn is_address(self) -> bool {
        matches!(self, Field::From | Field::To | Field::Cc | Field::Bcc)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of entry the index returned. Only messages reach callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Message,
    Contact,
}

/// Matched term → set of fields it matched in.
pub type MatchInfo = BTreeMap<String, BTreeSet<Field>>;

/// One hit from a single index sub-query.
///
/// `id` identifies a logical message across every sub-query's result set
/// and is the join key for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub kind: ItemKind,
    pub created_at: DateTime<Utc>,
    pub score: f64,
    #[serde(default)]
    pub matched_terms: BTreeSet<String>,
    #[serde(default)]
    pub match_info: MatchInfo,
}

impl IndexHit {
    /// A message hit with no match evidence yet.
    pub fn message(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        created_at: DateTime<Utc>,
        score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            kind: ItemKind::Message,
            created_at,
            score,
            matched_terms: BTreeSet::new(),
            match_info: MatchInfo::new(),
        }
    }

    /// Record that `term` matched in `fields`.
    pub fn with_match(mut self, term: &str, fields: &[Field]) -> Self {
        self.matched_terms.insert(term.to_string());
        self.match_info
            .entry(term.to_string())
            .or_default()
            .extend(fields.iter().copied());
        self
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Outcome of one dispatched sub-query.
///
/// `None`: the filter was not evaluated and must not constrain the result.
/// `Some(vec![])`: evaluated and matched nothing, which empties the intersection.
pub type SubQueryResult = Option<Vec<IndexHit>>;

/// A candidate that survived intersection, with evidence merged from every
/// source that returned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledHit {
    pub id: String,
    pub thread_id: String,
    pub kind: ItemKind,
    pub created_at: DateTime<Utc>,
    /// Arithmetic mean of the contributing sources' scores.
    pub score: f64,
    pub matched_terms: BTreeSet<String>,
    pub match_info: MatchInfo,
    /// Number of sub-queries that returned this id.
    pub sources: usize,
    /// Position in the first source's (index-returned) order.
    pub rank: usize,
}

/// Final externally visible result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub id: String,
    pub thread_id: String,
    pub score: f64,
    pub match_info: MatchInfo,
    pub terms: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_match_unions_fields() {
        let hit = IndexHit::message("m1", "t1", Utc::now(), 0.5)
            .with_match("project", &[Field::Subject])
            .with_match("project", &[Field::Body, Field::Subject]);
        assert_eq!(hit.matched_terms.len(), 1);
        let fields: Vec<Field> = hit.match_info["project"].iter().copied().collect();
        assert_eq!(fields, vec![Field::Subject, Field::Body]);
    }

    #[test]
    fn test_hit_deserializes_with_defaults() {
        let hit: IndexHit = serde_json::from_str(
            r#"{"id":"m1","thread_id":"t1","created_at":"2024-05-01T10:00:00Z","score":0.4}"#,
        )
        .expect("parse hit");
        assert_eq!(hit.kind, ItemKind::Message);
        assert!(hit.match_info.is_empty());
    }
}
