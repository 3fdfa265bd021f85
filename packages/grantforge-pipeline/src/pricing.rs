//! Token USD valuation via a DEX subgraph.
//!
//! Dashboard sums, not settlement math: prices come from Uniswap v2 pair
//! reserves and are as stale as the subgraph behind them.

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::indexer::IndexerClient;

/// Uniswap v2 pair per priced symbol; `token0` of each pair is the asset.
const PRICED_PAIRS: &[(&str, &str)] = &[
    ("AAVE", "0xdfc14d2af169b0d36c4eff567ada9b2e0cae044f"),
    ("WMATIC", "0x819f3450da6f110ba6ea52195b3beafa246062de"),
    ("OCEAN", "0x9b7dad79fc16106b47a3dab791f389c167e15eb0"),
    ("DAI", "0xa478c2975ab1ea89e8196811f51a7b7ade33eb11"),
    ("USDC", "0xb4e16d0168e52d35cacd2c6185b44281ec28c9dc"),
];

#[derive(Debug, Clone)]
pub struct PriceOracle {
    indexer: IndexerClient,
}

// Subgraph BigDecimal fields arrive as JSON strings.

#[derive(Debug, Deserialize)]
struct BundleData {
    bundle: Bundle,
}

#[derive(Debug, Deserialize)]
struct Bundle {
    #[serde(rename = "ethPrice")]
    eth_price: String,
}

#[derive(Debug, Deserialize)]
struct PairPriceData {
    bundle: Bundle,
    pair: Pair,
}

#[derive(Debug, Deserialize)]
struct Pair {
    token0: PairToken,
}

#[derive(Debug, Deserialize)]
struct PairToken {
    #[serde(rename = "derivedETH")]
    derived_eth: String,
}

impl PriceOracle {
    pub fn new(dex_subgraph_url: &str) -> Result<Self, Error> {
        Ok(Self {
            indexer: IndexerClient::new(dex_subgraph_url)?,
        })
    }

    /// USD value of `amount` units of `symbol`.
    ///
    /// WETH prices straight off the ETH bundle; other symbols go through
    /// their pair's `derivedETH`. Symbols without a pair price at zero
    /// rather than failing the caller's dashboard.
    pub async fn usd_value(&self, amount: f64, symbol: &str) -> Result<f64, Error> {
        if symbol == "WETH" {
            let data: BundleData = self
                .indexer
                .query(r#"{ bundle(id: "1") { ethPrice } }"#, serde_json::Value::Null)
                .await?;
            return Ok(amount * parse_decimal(&data.bundle.eth_price)?);
        }

        let Some((_, pair_id)) = PRICED_PAIRS.iter().find(|(s, _)| *s == symbol) else {
            debug!(symbol, "no pricing pair for symbol");
            return Ok(0.0);
        };

        let query = pair_price_query(pair_id);
        let data: PairPriceData = self.indexer.query(&query, serde_json::Value::Null).await?;
        let eth_price = parse_decimal(&data.bundle.eth_price)?;
        let derived_eth = parse_decimal(&data.pair.token0.derived_eth)?;
        Ok(amount * derived_eth * eth_price)
    }
}

fn pair_price_query(pair_id: &str) -> String {
    format!(
        r#"{{ bundle(id: "1") {{ ethPrice }} pair(id: "{pair_id}") {{ token0 {{ derivedETH }} }} }}"#
    )
}

fn parse_decimal(s: &str) -> Result<f64, Error> {
    s.parse()
        .map_err(|_| Error::Indexer(format!("bad decimal from subgraph: {s}")))
}
