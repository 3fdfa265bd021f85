//! Error taxonomy for pipeline actions.

use std::time::Duration;

use grantforge_types::{ChainId, TxHash};

/// Pipeline error type. Terminal for the action that produced it; the step
/// counter resets when one surfaces.
#[derive(Debug, Clone)]
pub enum Error {
    /// Wallet has no connected account.
    NotConnected,
    /// Wallet is on the wrong chain. A switch request has already been sent.
    WrongNetwork {
        expected: ChainId,
        actual: Option<ChainId>,
    },
    /// Target contract missing, zero address, or not signer-bound yet.
    ContractUnavailable,
    /// The off-chain validator rejected the document. Never retried.
    Validation(String),
    /// Content-store upload failed.
    Upload(String),
    /// Wallet or user declined to sign and broadcast.
    TransactionRejected(String),
    /// Transaction mined but execution reverted.
    TransactionReverted {
        tx_hash: Option<TxHash>,
        reason: String,
    },
    /// Receipt confirmed without the event the flow requires.
    EventMissing {
        event: &'static str,
        tx_hash: TxHash,
    },
    /// The indexer never showed the entity within the poll budget. The
    /// transaction itself succeeded; `tx_hash` lets hosts fall back to the
    /// receipt they already hold.
    IndexingTimeout {
        tx_hash: Option<TxHash>,
        waited: Duration,
    },
    /// The action was cancelled: handle dropped or token fired.
    Cancelled,
    /// Indexer query failure outside the convergence loop.
    Indexer(String),
    /// Client-side configuration or session problem.
    Config(String),
    /// Catch-all for errors without a better classification.
    Unknown(String),
}

impl Error {
    /// Message suitable for a dismissible host toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::TransactionRejected(_) => "Transaction was rejected in the wallet".to_string(),
            Self::IndexingTimeout { .. } => {
                "Submitted on chain, but indexing is taking longer than expected".to_string()
            }
            other => other.to_string(),
        }
    }

    /// True for verdicts the host should treat as "retry once the
    /// environment changes" rather than failures worth a toast.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::WrongNetwork { .. } | Self::ContractUnavailable)
    }

    /// Attach a transaction hash to errors raised after broadcast.
    pub(crate) fn with_tx(self, hash: &TxHash) -> Self {
        match self {
            Self::IndexingTimeout { waited, .. } => Self::IndexingTimeout {
                tx_hash: Some(hash.clone()),
                waited,
            },
            Self::TransactionReverted { reason, .. } => Self::TransactionReverted {
                tx_hash: Some(hash.clone()),
                reason,
            },
            other => other,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected to wallet"),
            Self::WrongNetwork { expected, actual } => match actual {
                Some(actual) => {
                    write!(f, "wrong network: expected chain {expected}, wallet is on {actual}")
                }
                None => write!(f, "wrong network: expected chain {expected}"),
            },
            Self::ContractUnavailable => write!(f, "contract not available yet"),
            Self::Validation(msg) => write!(f, "validation failed: {msg}"),
            Self::Upload(msg) => write!(f, "upload failed: {msg}"),
            Self::TransactionRejected(msg) => write!(f, "transaction rejected: {msg}"),
            Self::TransactionReverted { reason, .. } => {
                write!(f, "transaction reverted: {reason}")
            }
            Self::EventMissing { event, tx_hash } => {
                write!(f, "expected {event} event not found in {tx_hash}")
            }
            Self::IndexingTimeout { waited, .. } => {
                write!(f, "indexing timed out after {}s", waited.as_secs())
            }
            Self::Cancelled => write!(f, "action cancelled"),
            Self::Indexer(msg) => write!(f, "indexer error: {msg}"),
            Self::Config(msg) => write!(f, "config error: {msg}"),
            Self::Unknown(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}
