//! Local draft persistence.
//!
//! JSON files under one root directory, atomic tmp+rename writes. The store
//! is best-effort by contract: absence and corruption read as `None`, write
//! failures are logged and swallowed, the host never fails over a draft.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use grantforge_types::{Address, ChainId, Rubric, WorkspaceId};

/// Key-value store for form drafts and UI selections.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

/// One draft slot per `{chain}-{namespace}-{workspace}`.
#[derive(Debug, Clone)]
pub struct DraftKey {
    pub chain: ChainId,
    pub namespace: &'static str,
    pub workspace: WorkspaceId,
}

impl DraftKey {
    fn file_stem(&self) -> String {
        format!("{}-{}-{}", self.chain, self.namespace, self.workspace.as_str())
    }
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write a draft snapshot; called on every form change.
    pub fn save_draft<T: Serialize>(&self, key: &DraftKey, draft: &T) {
        let json = match serde_json::to_string(draft) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "draft serialize failed, not saved");
                return;
            }
        };
        self.save_raw(&key.file_stem(), &json);
    }

    /// Read a draft back; `None` on absence or corruption.
    pub fn load_draft<T: DeserializeOwned>(&self, key: &DraftKey) -> Option<T> {
        let raw = self.load_raw(&key.file_stem())?;
        match serde_json::from_str(&raw) {
            Ok(draft) => Some(draft),
            Err(e) => {
                warn!(error = %e, "draft parse failed, ignoring");
                None
            }
        }
    }

    /// Drop a draft, typically after the submission it backed succeeded.
    pub fn clear_draft(&self, key: &DraftKey) {
        self.clear(&key.file_stem());
    }

    pub(crate) fn save_raw(&self, key: &str, value: &str) {
        if let Err(e) = self.write_atomic(key, value) {
            warn!(key, error = %e, "local store write failed");
        }
    }

    pub(crate) fn load_raw(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "local store read failed");
                None
            }
        }
    }

    pub(crate) fn clear(&self, key: &str) {
        let path = self.path_for(key);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(key, error = %e, "local store remove failed");
            }
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    fn write_atomic(&self, key: &str, value: &str) -> std::io::Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        if let Some(parent) = tmp.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        debug!(key, "local store saved");
        Ok(())
    }
}

/// In-progress grant form snapshot. Written on every change, read once on
/// mount; values round-trip exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrantDraft {
    pub title: String,
    pub summary: String,
    /// Rich-text editor state, serialized by the host.
    pub details: serde_json::Value,
    pub required_fields: Vec<String>,
    pub custom_fields: Vec<String>,
    pub rubric: Option<Rubric>,
    pub reward_amount: String,
    pub reward_currency: String,
    pub reward_currency_address: Option<Address>,
    pub deadline: Option<String>,
    pub keep_applicant_details_private: bool,
    pub should_encrypt_reviews: bool,
}
