//! # Grantforge Pipeline
//!
//! Client-side orchestration for every "submit to chain and wait for it to be
//! indexed" flow of the Grantforge grants platform: workspace creation, grant
//! creation and editing, review submission, reviewer payouts.
//!
//! Every action runs the same pipeline: preflight gate, off-chain validation,
//! content-store upload, on-chain submission, receipt confirmation, indexer
//! convergence. Hosts implement [`WalletProvider`] and [`ContractRegistry`]
//! for their wallet stack, build a [`Session`], and drive actions through
//! the constructors in [`actions`].

pub mod actions;
mod chain;
pub mod config;
mod content_store;
pub mod drafts;
mod error;
mod gate;
mod indexer;
pub mod metrics;
mod pricing;
mod progress;
pub mod sealed;
mod session;
mod validator;

pub use chain::{
    CallValue, ContractHandle, ContractRegistry, ContractRole, DecodedEvent, PendingTransaction,
    TxReceipt, WalletProvider,
};
pub use config::{ChainInfo, ContractAddresses, ExplorerUrls, PipelineConfig, PollPolicy};
pub use content_store::ContentStoreClient;
pub use error::Error;
pub use gate::{preflight, Preflight};
pub use indexer::{await_indexed, IndexerClient};
pub use pricing::PriceOracle;
pub use progress::{ActionHandle, ActionOutcome, PendingAction, Step};
pub use session::Session;
pub use validator::{
    GrantCreateRequest, ReviewSetRequest, SocialLink, ValidatorClient, WorkspaceCreateRequest,
    WorkspaceUpdateRequest,
};
