//! Reviewer payout recording.

use std::sync::Arc;

use serde::Deserialize;

use grantforge_types::{Address, ChainId};

use crate::chain::{CallValue, ContractRole};
use crate::error::Error;
use crate::gate::preflight;
use crate::progress::{launch, ActionHandle};
use crate::session::Session;

// --- Convergence wire types ---

const TRANSFERS_QUERY: &str =
    "query($txHash: String!) { fundsTransfers(where: { transactionHash: $txHash }) { id } }";

#[derive(Debug, Deserialize)]
struct TransfersData {
    #[serde(rename = "fundsTransfers")]
    funds_transfers: Vec<TransferRow>,
}

#[derive(Debug, Deserialize)]
struct TransferRow {
    #[allow(dead_code)]
    id: String,
}

/// How the payout reaches the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutMode {
    /// Transfer from the connected wallet through the registry.
    FromWallet,
    /// Record a transfer already made from an external wallet.
    MarkDone,
}

impl PayoutMode {
    fn method(self) -> &'static str {
        match self {
            Self::FromWallet => "fulfillPayment",
            Self::MarkDone => "markPaymentDone",
        }
    }
}

/// Input for [`payout_reviewers`].
#[derive(Debug, Clone)]
pub struct PayoutReviewers {
    /// Target chain; `None` uses the active workspace's chain.
    pub chain: Option<ChainId>,
    pub reviewer: Address,
    /// Indexer ids of the reviews being paid for.
    pub review_ids: Vec<String>,
    /// Token contract the payout is denominated in.
    pub asset: Address,
    /// Amount in the asset's base units.
    pub amount: u128,
    pub mode: PayoutMode,
}

/// Record a reviewer payout on the active workspace.
///
/// No validator or upload stage: the registry call carries plain
/// identifiers. Converges once the indexer lists a funds transfer for the
/// transaction.
pub fn payout_reviewers(session: Arc<Session>, input: PayoutReviewers) -> ActionHandle {
    launch("payout_reviewers", move |cx| async move {
        if input.amount == 0 {
            return Err(Error::Validation("payout amount must be positive".into()));
        }
        if input.review_ids.is_empty() {
            return Err(Error::Validation("no reviews selected for payout".into()));
        }

        let workspace = super::active_workspace(&session)?;
        let target = session.target_chain(input.chain)?;
        let contract = preflight(&session, target, ContractRole::ReviewRegistry)
            .await
            .into_result()?;

        let review_ids = input
            .review_ids
            .iter()
            .cloned()
            .map(CallValue::Text)
            .collect();
        let args = vec![
            CallValue::Text(workspace.id.as_str().to_string()),
            CallValue::Addr(input.reviewer.clone()),
            CallValue::List(review_ids),
            CallValue::Addr(input.asset.clone()),
            CallValue::Uint(input.amount),
        ];
        let (tx_hash, receipt) =
            super::submit_and_confirm(&cx, &contract, input.mode.method(), args).await?;

        let indexer = session.indexer(target)?.clone();
        let needle = tx_hash.as_str().to_string();
        super::converge(&cx, &session, &tx_hash, move || {
            let indexer = indexer.clone();
            let needle = needle.clone();
            async move {
                let data: TransfersData = indexer
                    .query(TRANSFERS_QUERY, serde_json::json!({ "txHash": needle }))
                    .await?;
                Ok(!data.funds_transfers.is_empty())
            }
        })
        .await?;

        Ok(super::outcome(&session, target, receipt, None))
    })
}
