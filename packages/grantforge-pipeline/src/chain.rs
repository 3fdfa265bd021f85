//! Wallet and contract seams.
//!
//! The pipeline never links a chain SDK. Hosts implement these traits over
//! whatever wallet stack they embed and hand them to [`crate::Session`];
//! everything else in the crate is written against the traits.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use grantforge_types::{Address, ChainId, ContentHash, TxHash};

use crate::error::Error;

/// Host wallet connection.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Currently connected account, if any.
    async fn account(&self) -> Option<Address>;

    /// Chain the wallet is currently on.
    async fn chain_id(&self) -> Option<ChainId>;

    /// Ask the wallet to switch networks. The user may decline or take
    /// arbitrarily long; callers must not treat success as "switched".
    async fn switch_network(&self, chain: ChainId) -> Result<(), Error>;
}

/// Which deployed contract an action needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractRole {
    WorkspaceRegistry,
    GrantFactory,
    ApplicationRegistry,
    ReviewRegistry,
}

impl ContractRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkspaceRegistry => "workspace_registry",
            Self::GrantFactory => "grant_factory",
            Self::ApplicationRegistry => "application_registry",
            Self::ReviewRegistry => "review_registry",
        }
    }
}

/// Resolves contract handles per chain.
pub trait ContractRegistry: Send + Sync {
    fn contract(&self, chain: ChainId, role: ContractRole) -> Option<Arc<dyn ContractHandle>>;
}

/// One deployed contract, possibly bound to a signer.
#[async_trait]
pub trait ContractHandle: Send + Sync {
    fn address(&self) -> Address;

    /// Whether the handle can sign. Unbound handles are read-only and the
    /// gate treats them as unavailable.
    fn is_bound(&self) -> bool;

    /// Sign and broadcast `method(args)`. Resolves once the transaction is
    /// accepted by the wallet and in flight, not once it is mined.
    async fn call(
        &self,
        method: &str,
        args: Vec<CallValue>,
    ) -> Result<Box<dyn PendingTransaction>, Error>;
}

/// Loosely-typed call argument; the host maps these onto its ABI encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum CallValue {
    Text(String),
    Uint(u128),
    Addr(Address),
    Hash(ContentHash),
    List(Vec<CallValue>),
}

/// A broadcast transaction awaiting inclusion.
#[async_trait]
pub trait PendingTransaction: Send + Sync {
    fn tx_hash(&self) -> TxHash;

    /// Wait until the transaction is mined. A revert is an error.
    async fn confirmed(self: Box<Self>) -> Result<TxReceipt, Error>;
}

/// Mined-transaction summary with decoded events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    #[serde(default)]
    pub events: Vec<DecodedEvent>,
}

/// One decoded log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub name: String,
    pub args: serde_json::Value,
}

impl TxReceipt {
    pub fn event(&self, name: &str) -> Option<&DecodedEvent> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Creation flows require their event even when the transaction itself
    /// succeeded; a mined receipt without it is still a failure.
    pub fn require_event(&self, name: &'static str) -> Result<&DecodedEvent, Error> {
        self.event(name).ok_or_else(|| Error::EventMissing {
            event: name,
            tx_hash: self.transaction_hash.clone(),
        })
    }
}

impl DecodedEvent {
    /// String field out of the decoded args.
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(|v| v.as_str())
    }

    /// Arg as a decimal string. Creation events mint ids that some decoders
    /// hand over as numbers and others as strings; callers get one form.
    pub fn arg_id(&self, key: &str) -> Option<String> {
        match self.args.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
