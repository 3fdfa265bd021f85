//! Session context: wallet, contracts, service clients, active workspace.
//!
//! Hosts build one `Session` at startup and pass `Arc<Session>` into every
//! action constructor. Nothing here is ambient; the session is the only
//! shared state and the workspace setter is its only mutation entry point.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use grantforge_types::{ChainId, TxHash, Workspace, WorkspaceId};

use crate::chain::{ContractRegistry, WalletProvider};
use crate::config::PipelineConfig;
use crate::content_store::ContentStoreClient;
use crate::drafts::LocalStore;
use crate::error::Error;
use crate::indexer::IndexerClient;
use crate::validator::ValidatorClient;

const WORKSPACE_SELECTION_KEY: &str = "current_workspace";

pub struct Session {
    wallet: Arc<dyn WalletProvider>,
    contracts: Arc<dyn ContractRegistry>,
    validator: ValidatorClient,
    content_store: ContentStoreClient,
    indexers: HashMap<ChainId, IndexerClient>,
    config: PipelineConfig,
    store: LocalStore,
    workspace: RwLock<Option<Workspace>>,
}

impl Session {
    /// Build the HTTP clients and wire up the injected seams. One indexer
    /// client per configured chain.
    pub fn new(
        config: PipelineConfig,
        wallet: Arc<dyn WalletProvider>,
        contracts: Arc<dyn ContractRegistry>,
        store: LocalStore,
    ) -> Result<Self, Error> {
        let validator = ValidatorClient::new(&config.validator_base_url)?;
        let content_store = ContentStoreClient::new(&config.upload_url)?;
        let mut indexers = HashMap::new();
        for chain in &config.chains {
            indexers.insert(chain.id, IndexerClient::new(&chain.subgraph_url)?);
        }

        Ok(Self {
            wallet,
            contracts,
            validator,
            content_store,
            indexers,
            config,
            store,
            workspace: RwLock::new(None),
        })
    }

    pub fn wallet(&self) -> &dyn WalletProvider {
        self.wallet.as_ref()
    }

    pub fn contracts(&self) -> &dyn ContractRegistry {
        self.contracts.as_ref()
    }

    pub(crate) fn validator(&self) -> &ValidatorClient {
        &self.validator
    }

    pub(crate) fn content_store(&self) -> &ContentStoreClient {
        &self.content_store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Indexer for `chain`; configuration error when the registry does not
    /// know the chain.
    pub fn indexer(&self, chain: ChainId) -> Result<&IndexerClient, Error> {
        self.indexers
            .get(&chain)
            .ok_or_else(|| Error::Config(format!("no indexer configured for chain {chain}")))
    }

    /// Snapshot of the active workspace.
    pub fn workspace(&self) -> Option<Workspace> {
        self.workspace
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Switch the active workspace, persisting the selection for the next
    /// run. The only mutation entry point.
    pub fn set_workspace(&self, workspace: Option<Workspace>) {
        match &workspace {
            Some(ws) => {
                let selection = format!("{}-{}", ws.chain, ws.id.as_str());
                self.store.save_raw(WORKSPACE_SELECTION_KEY, &selection);
                info!(workspace = ws.id.as_str(), chain = %ws.chain, "workspace selected");
            }
            None => self.store.clear(WORKSPACE_SELECTION_KEY),
        }
        *self.workspace.write().unwrap_or_else(|e| e.into_inner()) = workspace;
    }

    /// Selection persisted by a previous run, as `(chain, workspace id)`.
    pub fn stored_workspace_selection(&self) -> Option<(ChainId, WorkspaceId)> {
        let raw = self.store.load_raw(WORKSPACE_SELECTION_KEY)?;
        let (chain, id) = raw.split_once('-')?;
        let chain: ChainId = chain.parse().ok()?;
        if id.is_empty() {
            return None;
        }
        Some((chain, WorkspaceId::new(id)))
    }

    /// Chain an action should target: the explicit override when given,
    /// otherwise the active workspace's chain.
    pub fn target_chain(&self, explicit: Option<ChainId>) -> Result<ChainId, Error> {
        if let Some(chain) = explicit {
            return Ok(chain);
        }
        self.workspace()
            .map(|ws| ws.chain)
            .ok_or_else(|| Error::Config("no workspace selected and no chain given".into()))
    }

    /// Block-explorer link for a transaction, when the chain has one.
    pub fn explorer_tx_url(&self, chain: ChainId, hash: &TxHash) -> Option<String> {
        self.config
            .chain(chain)
            .map(|c| c.explorer.transaction_url(hash))
    }
}
