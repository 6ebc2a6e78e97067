//! Filter model: the active filter set and the inline filter-token parser.
//!
//! # Inline syntax
//!
//! Besides plain free text, a query string may carry filter tokens:
//!
//! - `from:alice@example.com` / `to:bob@example.com`: address filters
//! - `in:subject` / `in:body`: narrow the free text to one field
//! - `in:spam` / `is:starred`: system labels
//! - `label:<id>`: user folder or label
//! - `newer_than:7d` / `within:7`: created in the last N days
//!
//! `from:` and `to:` with no value still produce a filter; it just has no
//! search string yet and is skipped by the dispatcher.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MailscopeError;
use crate::index::DateRange;
use crate::model::address::EmailAddress;

/// Address field an address filter narrows to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressField {
    From,
    To,
}

/// Content field a content filter narrows the free text to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentField {
    Subject,
    Body,
}

/// Built-in mailbox labels. Membership lives server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SystemLabel {
    Inbox,
    Drafts,
    Sent,
    Starred,
    Archive,
    Spam,
    Trash,
    AllMail,
}

impl SystemLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemLabel::Inbox => "inbox",
            SystemLabel::Drafts => "drafts",
            SystemLabel::Sent => "sent",
            SystemLabel::Starred => "starred",
            SystemLabel::Archive => "archive",
            SystemLabel::Spam => "spam",
            SystemLabel::Trash => "trash",
            SystemLabel::AllMail => "all-mail",
        }
    }
}

impl FromStr for SystemLabel {
    type Err = MailscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inbox" => Ok(SystemLabel::Inbox),
            "drafts" | "draft" => Ok(SystemLabel::Drafts),
            "sent" => Ok(SystemLabel::Sent),
            "starred" => Ok(SystemLabel::Starred),
            "archive" | "archived" => Ok(SystemLabel::Archive),
            "spam" => Ok(SystemLabel::Spam),
            "trash" => Ok(SystemLabel::Trash),
            "all-mail" | "allmail" | "all_mail" => Ok(SystemLabel::AllMail),
            other => Err(MailscopeError::InvalidFilter(format!(
                "unknown system label '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for SystemLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One active filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchFilter {
    /// Search `address` in the sender or recipient fields.
    Address { field: AddressField, address: String },
    /// Search the free text in a single content field.
    ContentField { field: ContentField },
    /// Only items created in the last `days_ago` days.
    DateRange { days_ago: u32 },
    /// Only threads carrying a built-in label.
    SystemLabel { label: SystemLabel },
    /// Only threads in a user folder or carrying a user label.
    UserLabel { label_id: String },
}

impl SearchFilter {
    pub fn sender(address: impl Into<String>) -> Self {
        SearchFilter::Address {
            field: AddressField::From,
            address: address.into(),
        }
    }

    pub fn recipient(address: impl Into<String>) -> Self {
        SearchFilter::Address {
            field: AddressField::To,
            address: address.into(),
        }
    }

    /// Whether this filter restricts which fields are searched.
    pub fn is_field_narrowing(&self) -> bool {
        matches!(
            self,
            SearchFilter::Address { .. } | SearchFilter::ContentField { .. }
        )
    }

    /// Whether this filter can only be checked by the label backend.
    pub fn is_label(&self) -> bool {
        matches!(
            self,
            SearchFilter::SystemLabel { .. } | SearchFilter::UserLabel { .. }
        )
    }

    /// Search string for an address filter, if one is filled in.
    pub fn address_query(&self) -> Option<String> {
        match self {
            SearchFilter::Address { address, .. } => {
                let parsed = EmailAddress::parse(address);
                (!parsed.is_empty()).then(|| parsed.search_key())
            }
            _ => None,
        }
    }
}

/// The global date constraint: the narrowest date filter, if any.
pub fn date_constraint(filters: &[SearchFilter], now: DateTime<Utc>) -> Option<DateRange> {
    filters
        .iter()
        .filter_map(|f| match f {
            SearchFilter::DateRange { days_ago } => Some(*days_ago),
            _ => None,
        })
        .min()
        .map(|days| DateRange::last_days(days, now))
}

/// Distinct labels requested by the active filters, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelection {
    pub system_labels: Vec<SystemLabel>,
    pub user_label_ids: Vec<String>,
}

impl LabelSelection {
    pub fn from_filters(filters: &[SearchFilter]) -> Self {
        let mut selection = Self::default();
        for filter in filters {
            match filter {
                SearchFilter::SystemLabel { label } => {
                    if !selection.system_labels.contains(label) {
                        selection.system_labels.push(*label);
                    }
                }
                SearchFilter::UserLabel { label_id } => {
                    let label_id = label_id.trim();
                    if !label_id.is_empty()
                        && !selection.user_label_ids.iter().any(|l| l == label_id)
                    {
                        selection.user_label_ids.push(label_id.to_string());
                    }
                }
                _ => {}
            }
        }
        selection
    }

    pub fn is_empty(&self) -> bool {
        self.system_labels.is_empty() && self.user_label_ids.is_empty()
    }
}

/// A query string split into free text and filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub free_text: String,
    pub filters: Vec<SearchFilter>,
}

/// Collapse runs of whitespace and trim.
pub fn normalize_free_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a query string into free text and inline filters.
///
/// Never fails: unrecognized or malformed tokens stay in the free text.
pub fn parse_query(input: &str) -> ParsedQuery {
    let mut free = Vec::new();
    let mut filters = Vec::new();

    for token in tokenize(input) {
        match parse_filter_token(&token) {
            Some(filter) => filters.push(filter),
            None => free.push(token),
        }
    }

    ParsedQuery {
        free_text: normalize_free_text(&free.join(" ")),
        filters,
    }
}

fn parse_filter_token(token: &str) -> Option<SearchFilter> {
    let (key, value) = token.split_once(':')?;
    let value = unquote(value);
    match key.to_ascii_lowercase().as_str() {
        "from" => Some(SearchFilter::sender(value)),
        "to" => Some(SearchFilter::recipient(value)),
        "in" | "is" => match value.to_ascii_lowercase().as_str() {
            "subject" => Some(SearchFilter::ContentField {
                field: ContentField::Subject,
            }),
            "body" => Some(SearchFilter::ContentField {
                field: ContentField::Body,
            }),
            other => other
                .parse()
                .ok()
                .map(|label| SearchFilter::SystemLabel { label }),
        },
        "label" if !value.is_empty() => Some(SearchFilter::UserLabel {
            label_id: value.to_string(),
        }),
        "newer_than" | "within" => value
            .strip_suffix(['d', 'D'])
            .unwrap_or(value)
            .parse()
            .ok()
            .map(|days_ago| SearchFilter::DateRange { days_ago }),
        _ => None,
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(value)
}

/// Tokenize input respecting quoted strings.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            current.push(ch);
        } else if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
