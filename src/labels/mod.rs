//! Backend label resolution.
//!
//! Label membership is not in the local index, so label filters are
//! answered by a backend: given thread ids and labels, it returns the
//! subset of threads that currently carry the labels.

pub mod http;
pub mod snapshot;

use serde::{Deserialize, Serialize};

use crate::error::{MailscopeError, Result};
use crate::search::filter::SystemLabel;

/// How several requested labels combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMatch {
    /// A thread must carry every requested label.
    #[default]
    All,
}

/// One membership lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelQuery {
    pub thread_ids: Vec<String>,
    pub system_labels: Vec<SystemLabel>,
    pub user_label_ids: Vec<String>,
    pub mode: LabelMatch,
}

/// Backend answer. `thread_ids == None` means the response carried no data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LabelMembership {
    #[serde(default)]
    pub thread_ids: Option<Vec<String>>,
}

impl LabelMembership {
    pub fn threads(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            thread_ids: Some(ids.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait::async_trait]
pub trait LabelResolver: Send + Sync {
    async fn resolve_label_membership(&self, query: &LabelQuery) -> Result<LabelMembership>;
}

/// Resolver used when no backend is configured. Every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredResolver;

#[async_trait::async_trait]
impl LabelResolver for UnconfiguredResolver {
    async fn resolve_label_membership(&self, _query: &LabelQuery) -> Result<LabelMembership> {
        Err(MailscopeError::LabelBackendUnavailable)
    }
}
