//! Workspace (DAO) entities as served by the indexer.

use serde::{Deserialize, Serialize};

use crate::{Address, ChainId, CurrencyInfo};

/// Indexer entity id of a workspace, a decimal string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for WorkspaceId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Owner,
    Admin,
    Reviewer,
    Member,
}

impl AccessLevel {
    pub fn can_administer(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

/// One workspace member. `public_key` is the secp256k1 key the member
/// published for sealed payloads; absent or empty means none yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub actor_id: Address,
    pub access_level: AccessLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl Member {
    pub fn has_public_key(&self) -> bool {
        matches!(self.public_key.as_deref(), Some(k) if !k.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: WorkspaceId,
    pub title: String,
    pub chain: ChainId,
    #[serde(default)]
    pub members: Vec<Member>,
    /// Custom tokens added by the workspace, on top of the chain's list.
    #[serde(default)]
    pub tokens: Vec<CurrencyInfo>,
}

impl Workspace {
    pub fn member(&self, address: &Address) -> Option<&Member> {
        self.members.iter().find(|m| &m.actor_id == address)
    }

    /// Members a sealed payload must be addressed to: owners and admins that
    /// have published an encryption key.
    pub fn encryption_recipients(&self) -> Vec<&Member> {
        self.members
            .iter()
            .filter(|m| m.access_level.can_administer() && m.has_public_key())
            .collect()
    }

    /// Chain currencies plus this workspace's custom tokens, in that order.
    pub fn supported_currencies(&self, chain_currencies: &[CurrencyInfo]) -> Vec<CurrencyInfo> {
        let mut out = chain_currencies.to_vec();
        out.extend(self.tokens.iter().cloned());
        out
    }
}
