//! Pipeline configuration: chain registry, service endpoints, poll policy.

use std::time::Duration;

use serde::Deserialize;

use grantforge_types::{Address, ChainId, ContentHash, CurrencyInfo, TxHash};

use crate::chain::ContractRole;
use crate::error::Error;

/// Everything a [`crate::Session`] needs that is deployment-specific.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the document validator service.
    #[serde(default = "defaults::validator_base_url")]
    pub validator_base_url: String,

    /// Content-store upload endpoint.
    #[serde(default = "defaults::upload_url")]
    pub upload_url: String,

    /// Public gateway for reading stored content back.
    #[serde(default = "defaults::gateway_url")]
    pub gateway_url: String,

    /// DEX subgraph used for token USD valuation.
    #[serde(default = "defaults::dex_subgraph_url")]
    pub dex_subgraph_url: String,

    #[serde(default)]
    pub poll: PollPolicy,

    #[serde(default = "defaults::chains")]
    pub chains: Vec<ChainInfo>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            validator_base_url: defaults::validator_base_url(),
            upload_url: defaults::upload_url(),
            gateway_url: defaults::gateway_url(),
            dex_subgraph_url: defaults::dex_subgraph_url(),
            poll: PollPolicy::default(),
            chains: defaults::chains(),
        }
    }
}

impl PipelineConfig {
    /// Load from an optional `grantforge` config file plus `GRANTFORGE_*`
    /// environment overrides.
    pub fn load() -> Result<Self, Error> {
        config::Config::builder()
            .add_source(config::File::with_name("grantforge").required(false))
            .add_source(config::Environment::with_prefix("GRANTFORGE").separator("__"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))
    }

    pub fn chain(&self, id: ChainId) -> Option<&ChainInfo> {
        self.chains.iter().find(|c| c.id == id)
    }

    /// Gateway URL for a stored document.
    pub fn gateway_url_for(&self, hash: &ContentHash) -> String {
        format!("{}/{}", self.gateway_url.trim_end_matches('/'), hash)
    }
}

/// Backoff schedule for indexer convergence polling.
#[derive(Debug, Clone, Deserialize)]
pub struct PollPolicy {
    #[serde(default = "defaults::poll_initial_interval_ms")]
    pub initial_interval_ms: u64,

    #[serde(default = "defaults::poll_multiplier")]
    pub multiplier: f64,

    #[serde(default = "defaults::poll_max_interval_ms")]
    pub max_interval_ms: u64,

    #[serde(default = "defaults::poll_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: defaults::poll_initial_interval_ms(),
            multiplier: defaults::poll_multiplier(),
            max_interval_ms: defaults::poll_max_interval_ms(),
            timeout_ms: defaults::poll_timeout_ms(),
        }
    }
}

impl PollPolicy {
    /// Delay before retry number `attempt` (0-based), capped exponential.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let raw = self.initial_interval_ms as f64 * self.multiplier.powi(attempt as i32);
        let capped = raw.min(self.max_interval_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Overall budget for one convergence wait.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Per-chain deployment info: explorer, subgraph, contract addresses,
/// registry-blessed currencies.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainInfo {
    pub id: ChainId,
    pub name: String,

    #[serde(default)]
    pub rpc_urls: Vec<String>,

    pub explorer: ExplorerUrls,

    /// Grants subgraph endpoint for this chain.
    pub subgraph_url: String,

    pub contracts: ContractAddresses,

    #[serde(default)]
    pub currencies: Vec<CurrencyInfo>,

    #[serde(default)]
    pub is_test_network: bool,
}

/// Block-explorer URL templates. `{hash}` and `{address}` are substituted.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerUrls {
    pub address: String,
    pub transaction: String,
}

impl ExplorerUrls {
    pub fn transaction_url(&self, hash: &TxHash) -> String {
        self.transaction.replace("{hash}", hash.as_str())
    }

    pub fn address_url(&self, address: &Address) -> String {
        self.address.replace("{address}", address.as_str())
    }
}

/// Deployed contract addresses for one chain. A zero address means the
/// contract is not deployed there.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractAddresses {
    pub workspace_registry: Address,
    pub grant_factory: Address,
    pub application_registry: Address,
    pub review_registry: Address,
}

impl ContractAddresses {
    pub fn for_role(&self, role: ContractRole) -> &Address {
        match role {
            ContractRole::WorkspaceRegistry => &self.workspace_registry,
            ContractRole::GrantFactory => &self.grant_factory,
            ContractRole::ApplicationRegistry => &self.application_registry,
            ContractRole::ReviewRegistry => &self.review_registry,
        }
    }
}

mod defaults {
    use grantforge_types::{Address, ChainId, CurrencyInfo};

    use super::{ChainInfo, ContractAddresses, ExplorerUrls};

    pub fn validator_base_url() -> String {
        "https://validator.grantforge.app".into()
    }

    pub fn upload_url() -> String {
        "https://store.grantforge.app/upload".into()
    }

    pub fn gateway_url() -> String {
        "https://ipfs.io/ipfs".into()
    }

    pub fn dex_subgraph_url() -> String {
        "https://api.thegraph.com/subgraphs/name/uniswap/uniswap-v2".into()
    }

    pub fn poll_initial_interval_ms() -> u64 {
        2_000
    }

    pub fn poll_multiplier() -> f64 {
        2.0
    }

    pub fn poll_max_interval_ms() -> u64 {
        30_000
    }

    pub fn poll_timeout_ms() -> u64 {
        180_000
    }

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap_or_else(|_| Address::zero())
    }

    fn currency(address: &str, label: &str, decimals: u8) -> CurrencyInfo {
        CurrencyInfo {
            address: addr(address),
            label: label.into(),
            decimals,
            icon_hash: None,
        }
    }

    /// Contract addresses are deployment-specific and ship unset; hosts
    /// fill them in via file or `GRANTFORGE_*` environment.
    fn unset_contracts() -> ContractAddresses {
        ContractAddresses {
            workspace_registry: Address::zero(),
            grant_factory: Address::zero(),
            application_registry: Address::zero(),
            review_registry: Address::zero(),
        }
    }

    pub fn chains() -> Vec<ChainInfo> {
        vec![
            ChainInfo {
                id: ChainId(137),
                name: "Polygon".into(),
                rpc_urls: vec!["https://polygon-rpc.com".into()],
                explorer: ExplorerUrls {
                    address: "https://polygonscan.com/address/{address}".into(),
                    transaction: "https://polygonscan.com/tx/{hash}".into(),
                },
                subgraph_url:
                    "https://api.thegraph.com/subgraphs/name/grantforge/grants-polygon".into(),
                contracts: unset_contracts(),
                currencies: vec![
                    currency("0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270", "WMATIC", 18),
                    currency("0x8f3cf7ad23cd3cadbd9735aff958023239c6a063", "DAI", 18),
                    currency("0x2791bca1f2de4661ed88a30c99a7a9449aa84174", "USDC", 6),
                ],
                is_test_network: false,
            },
            ChainInfo {
                id: ChainId(80001),
                name: "Polygon Mumbai".into(),
                rpc_urls: vec!["https://rpc-mumbai.maticvigil.com".into()],
                explorer: ExplorerUrls {
                    address: "https://mumbai.polygonscan.com/address/{address}".into(),
                    transaction: "https://mumbai.polygonscan.com/tx/{hash}".into(),
                },
                subgraph_url:
                    "https://api.thegraph.com/subgraphs/name/grantforge/grants-mumbai".into(),
                contracts: unset_contracts(),
                currencies: vec![
                    currency("0x9c3c9283d3e44854697cd22d3faa240cfb032889", "WMATIC", 18),
                    currency("0x001b3b4d0f3714ca98ba10f6042daebf0b1b7b6f", "DAI", 18),
                ],
                is_test_network: true,
            },
        ]
    }
}
