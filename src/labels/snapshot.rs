//! Label membership from a local JSON snapshot.
//!
//! ```json
//! { "t1": { "system": ["inbox", "starred"], "user": ["work"] } }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::{LabelMatch, LabelMembership, LabelQuery, LabelResolver};
use crate::error::{MailscopeError, Result};
use crate::search::filter::SystemLabel;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadLabels {
    #[serde(default)]
    pub system: HashSet<SystemLabel>,
    #[serde(default)]
    pub user: HashSet<String>,
}

impl ThreadLabels {
    fn satisfies(&self, query: &LabelQuery) -> bool {
        match query.mode {
            LabelMatch::All => {
                query.system_labels.iter().all(|l| self.system.contains(l))
                    && query.user_label_ids.iter().all(|l| self.user.contains(l))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelSnapshot {
    threads: HashMap<String, ThreadLabels>,
}

impl LabelSnapshot {
    pub fn new(threads: HashMap<String, ThreadLabels>) -> Self {
        Self { threads }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| MailscopeError::io(path, e))?;
        let threads: HashMap<String, ThreadLabels> =
            serde_json::from_str(&contents).map_err(|e| MailscopeError::InvalidLabelSnapshot {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        debug!(path = %path.display(), threads = threads.len(), "Loaded label snapshot");
        Ok(Self::new(threads))
    }
}

#[async_trait::async_trait]
impl LabelResolver for LabelSnapshot {
    async fn resolve_label_membership(&self, query: &LabelQuery) -> Result<LabelMembership> {
        let matching = query
            .thread_ids
            .iter()
            .filter(|id| self.threads.get(*id).is_some_and(|t| t.satisfies(query)));
        Ok(LabelMembership::threads(matching.cloned()))
    }
}
