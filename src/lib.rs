//! `mailscope`: compound mailbox search.
//!
//! Resolves a free-text query plus structured filters into one ranked list
//! of messages: field-scoped sub-queries against a local full-text index,
//! an id-keyed reconciliation that merges their match evidence, and an
//! authoritative label check against a backend.

pub mod config;
pub mod error;
pub mod index;
pub mod labels;
pub mod model;
pub mod search;
