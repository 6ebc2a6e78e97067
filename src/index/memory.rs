//! In-memory index over a JSON document file.
//!
//! Stands in for the device-local index: same request contract, evaluated
//! over pre-tokenized items held in memory. Complexity is O(items × terms)
//! per request, which is fine for the mailbox sizes the CLI is used with.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::{MailscopeError, Result};
use crate::model::address::EmailAddress;
use crate::model::hit::{Field, IndexHit, ItemKind};

use super::{IndexRequest, SearchIndex, SearchScope};

/// Shortest term that is allowed to match within one edit.
const FUZZY_MIN_TERM_LEN: usize = 4;

/// An item as stored in the JSON document file.
///
/// Address fields are header-style strings (`"Alice <alice@x.com>, bob@y.com"`).
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedItem {
    pub id: String,
    /// Defaults to `id` when absent.
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub kind: ItemKind,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub cc: String,
    #[serde(default)]
    pub bcc: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

/// An item with every field reduced to its searchable words.
#[derive(Debug)]
struct Document {
    id: String,
    thread_id: String,
    kind: ItemKind,
    created_at: DateTime<Utc>,
    /// Indexed by `Field as usize`.
    words: [Vec<String>; 6],
}

impl Document {
    fn from_item(item: IndexedItem) -> Self {
        let words = [
            address_words(&item.from),
            address_words(&item.to),
            address_words(&item.cc),
            address_words(&item.bcc),
            text_words(&item.subject),
            text_words(&item.body),
        ];
        Self {
            thread_id: item.thread_id.unwrap_or_else(|| item.id.clone()),
            id: item.id,
            kind: item.kind,
            created_at: item.created_at,
            words,
        }
    }

    fn words(&self, field: Field) -> &[String] {
        &self.words[field as usize]
    }
}

/// In-memory implementation of [`SearchIndex`].
#[derive(Debug, Default)]
pub struct MemoryIndex {
    documents: Vec<Document>,
}

impl MemoryIndex {
    pub fn from_items(items: Vec<IndexedItem>) -> Self {
        Self {
            documents: items.into_iter().map(Document::from_item).collect(),
        }
    }

    /// Load items from a JSON array file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| MailscopeError::io(path, e))?;
        let items: Vec<IndexedItem> =
            serde_json::from_str(&contents).map_err(|e| MailscopeError::InvalidIndex {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        debug!(path = %path.display(), items = items.len(), "Loaded index documents");
        Ok(Self::from_items(items))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Evaluate a request synchronously.
    pub fn query(&self, request: &IndexRequest) -> Vec<IndexHit> {
        let terms = query_terms(&request.query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<IndexHit> = self
            .documents
            .iter()
            .filter(|doc| request.scope == SearchScope::Everything || doc.kind == ItemKind::Message)
            .filter(|doc| {
                request
                    .date_range
                    .is_none_or(|range| range.contains(doc.created_at))
            })
            .filter_map(|doc| score_document(doc, &terms, request))
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        hits
    }
}

#[async_trait::async_trait]
impl SearchIndex for MemoryIndex {
    async fn search(&self, request: &IndexRequest) -> Result<Vec<IndexHit>> {
        Ok(self.query(request))
    }
}

/// Match every term against the requested fields and build the hit, or
/// `None` if the document doesn't satisfy the term policy.
fn score_document(doc: &Document, terms: &[String], request: &IndexRequest) -> Option<IndexHit> {
    let mut hit = IndexHit::message(doc.id.clone(), doc.thread_id.clone(), doc.created_at, 0.0)
        .with_kind(doc.kind);
    let mut weight_sum = 0.0;

    for (pos, term) in terms.iter().enumerate() {
        let is_last = pos + 1 == terms.len();
        let matched: Vec<Field> = request
            .searched_fields()
            .iter()
            .copied()
            .filter(|&field| {
                doc.words(field)
                    .iter()
                    .any(|word| term_matches(term, word, is_last, request))
            })
            .collect();

        if let Some(best) = matched.iter().map(|&f| field_weight(f)).reduce(f64::max) {
            weight_sum += best;
            hit = hit.with_match(term, &matched);
        }
    }

    let matched_terms = hit.matched_terms.len();
    let satisfied = if request.prefer_all_terms_match {
        matched_terms == terms.len()
    } else {
        matched_terms > 0
    };
    if !satisfied {
        return None;
    }

    hit.score = weight_sum / terms.len() as f64;
    Some(hit)
}

fn field_weight(field: Field) -> f64 {
    match field {
        Field::Subject => 1.0,
        Field::From | Field::To | Field::Cc | Field::Bcc => 0.8,
        Field::Body => 0.6,
    }
}

fn term_matches(term: &str, word: &str, is_last: bool, request: &IndexRequest) -> bool {
    word == term
        || (request.autosuggest && is_last && word.starts_with(term))
        || (request.fuzzy
            && term.chars().count() >= FUZZY_MIN_TERM_LEN
            && within_one_edit(term, word))
}

/// Whether `a` and `b` differ by at most one insertion, deletion or substitution.
fn within_one_edit(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if long.len() - short.len() > 1 {
        return false;
    }

    let (mut i, mut j, mut edits) = (0, 0, 0);
    while i < short.len() && j < long.len() {
        if short[i] == long[j] {
            i += 1;
            j += 1;
            continue;
        }
        edits += 1;
        if edits > 1 {
            return false;
        }
        if short.len() == long.len() {
            i += 1;
        }
        j += 1;
    }
    edits + (long.len() - j) + (short.len() - i) <= 1
}

/// Split free text into lower-cased words with surrounding punctuation removed.
fn text_words(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    text.split_whitespace()
        .map(normalize_word)
        .filter(|w| !w.is_empty() && seen.insert(w.clone()))
        .collect()
}

/// Words of an address list: full addresses, their parts, and display names.
fn address_words(raw: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    for addr in EmailAddress::parse_list(raw) {
        seen.insert(addr.search_key());
        seen.extend(
            addr.address
                .split(|c: char| !c.is_alphanumeric())
                .filter(|p| !p.is_empty())
                .map(str::to_lowercase),
        );
        seen.extend(text_words(&addr.display_name));
    }
    seen.into_iter().collect()
}

/// Query terms, normalized like indexed words, de-duplicated in order.
fn query_terms(query: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    query
        .split_whitespace()
        .map(normalize_word)
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DateRange;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap()
    }

    fn item(id: &str, from: &str, subject: &str, body: &str, day: u32) -> IndexedItem {
        IndexedItem {
            id: id.to_string(),
            thread_id: Some(format!("t-{id}")),
            kind: ItemKind::Message,
            created_at: at(day),
            from: from.to_string(),
            to: "Team <team@example.com>".to_string(),
            cc: String::new(),
            bcc: String::new(),
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }

    fn request(query: &str, fields: Option<Vec<Field>>) -> IndexRequest {
        IndexRequest {
            query: query.to_string(),
            scope: SearchScope::Everything,
            fields,
            date_range: None,
            fuzzy: false,
            autosuggest: false,
            prefer_all_terms_match: true,
        }
    }

    fn sample() -> MemoryIndex {
        MemoryIndex::from_items(vec![
            item("1", "Alice <alice@x.com>", "Project kickoff", "Agenda attached.", 1),
            item("2", "bob@y.com", "Lunch", "Talk about the project, alice?", 2),
            item("3", "carol@z.com", "Invoice", "Nothing relevant.", 3),
        ])
    }

    fn ids(hits: &[IndexHit]) -> Vec<&str> {
        hits.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn test_all_fields_search_ranks_subject_first() {
        let hits = sample().query(&request("project", None));
        assert_eq!(ids(&hits), vec!["1", "2"]);
        assert!(hits[0].score > hits[1].score);
        assert!(hits[0].match_info["project"].contains(&Field::Subject));
        assert!(hits[1].match_info["project"].contains(&Field::Body));
    }

    #[test]
    fn test_field_scoped_search() {
        let hits = sample().query(&request("alice@x.com", Some(vec![Field::From])));
        assert_eq!(ids(&hits), vec!["1"]);
        let fields: Vec<Field> = hits[0].match_info["alice@x.com"].iter().copied().collect();
        assert_eq!(fields, vec![Field::From]);

        // "alice" appears in message 2's body, but only From is searched.
        let hits = sample().query(&request("alice", Some(vec![Field::From])));
        assert_eq!(ids(&hits), vec!["1"]);
    }

    #[test]
    fn test_date_range_is_part_of_query() {
        let mut req = request("project", None);
        req.date_range = Some(DateRange {
            start: at(2),
            end: at(5),
        });
        assert_eq!(ids(&sample().query(&req)), vec!["2"]);
    }

    #[test]
    fn test_all_terms_vs_any_term() {
        let index = sample();
        let mut req = request("project invoice", None);
        assert!(index.query(&req).is_empty());

        req.prefer_all_terms_match = false;
        let hits = index.query(&req);
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_autosuggest_prefix_on_last_term() {
        let index = sample();
        let mut req = request("proj", None);
        assert!(index.query(&req).is_empty());
        req.autosuggest = true;
        assert_eq!(ids(&index.query(&req)), vec!["1", "2"]);
    }

    #[test]
    fn test_fuzzy_tolerates_one_typo() {
        let index = sample();
        let mut req = request("invoyce", None);
        assert!(index.query(&req).is_empty());
        req.fuzzy = true;
        assert_eq!(ids(&index.query(&req)), vec!["3"]);
    }

    #[test]
    fn test_messages_scope_skips_contacts() {
        let mut contact = item("c1", "alice@x.com", "", "", 4);
        contact.kind = ItemKind::Contact;
        let index = MemoryIndex::from_items(vec![contact, item("1", "alice@x.com", "", "", 1)]);

        let mut req = request("alice", None);
        assert_eq!(index.query(&req).len(), 2);
        req.scope = SearchScope::Messages;
        assert_eq!(ids(&index.query(&req)), vec!["1"]);
    }

    #[test]
    fn test_thread_id_defaults_to_id() {
        let mut it = item("9", "a@b.com", "hello", "", 1);
        it.thread_id = None;
        let hits = MemoryIndex::from_items(vec![it]).query(&request("hello", None));
        assert_eq!(hits[0].thread_id, "9");
    }

    #[test]
    fn test_within_one_edit() {
        assert!(within_one_edit("invoice", "invoice"));
        assert!(within_one_edit("invoice", "invoices"));
        assert!(within_one_edit("invoice", "invoyce"));
        assert!(within_one_edit("invoice", "nvoice"));
        assert!(!within_one_edit("invoice", "involves"));
        assert!(!within_one_edit("abcd", "badc"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(
            &path,
            r#"[{"id":"m1","created_at":"2024-05-01T09:00:00Z","subject":"Quarterly report"}]"#,
        )
        .unwrap();
        let index = MemoryIndex::load(&path).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(ids(&index.query(&request("report", None))), vec!["m1"]);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            MemoryIndex::load(&path),
            Err(MailscopeError::InvalidIndex { .. })
        ));
    }
}
