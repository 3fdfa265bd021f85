//! The orchestration flows.
//!
//! One constructor per user action, each returning an [`ActionHandle`]. A
//! flow runs the full pipeline as a spawned task: preflight gate, content
//! preparation, off-chain validation, on-chain submission, receipt
//! confirmation, indexer convergence. Dropping the handle cancels whatever
//! stage is in flight.

mod grant;
mod payout;
mod review;
mod workspace;

pub use grant::{create_grant, edit_grant, CreateGrant, EditGrant};
pub use payout::{payout_reviewers, PayoutMode, PayoutReviewers};
pub use review::{submit_review, SubmitReview};
pub use workspace::{create_workspace, update_workspace_keys, CreateWorkspace, UpdateWorkspaceKeys};

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use grantforge_types::{Address, ChainId, TxHash, Workspace};

use crate::chain::{CallValue, ContractHandle, TxReceipt};
use crate::error::Error;
use crate::indexer::await_indexed;
use crate::metrics::METRICS;
use crate::progress::{ActionCx, ActionOutcome, Step};
use crate::session::Session;

pub(crate) async fn connected_account(session: &Session) -> Result<Address, Error> {
    session.wallet().account().await.ok_or(Error::NotConnected)
}

pub(crate) fn active_workspace(session: &Session) -> Result<Workspace, Error> {
    session
        .workspace()
        .ok_or_else(|| Error::Config("no workspace selected".into()))
}

/// Broadcast `method(args)` and wait for inclusion. Publishes the hash to
/// the progress surface as soon as the wallet accepts the transaction.
pub(crate) async fn submit_and_confirm(
    cx: &ActionCx,
    contract: &Arc<dyn ContractHandle>,
    method: &'static str,
    args: Vec<CallValue>,
) -> Result<(TxHash, TxReceipt), Error> {
    cx.advance(Step::Submitting);
    METRICS.chain_submissions.fetch_add(1, Ordering::Relaxed);
    let pending = cx.checkpoint(contract.call(method, args)).await?;
    let tx_hash = pending.tx_hash();
    cx.set_tx_hash(&tx_hash);

    cx.advance(Step::Confirming);
    let receipt = cx
        .checkpoint(pending.confirmed())
        .await
        .map_err(|e| e.with_tx(&tx_hash))?;
    Ok((tx_hash, receipt))
}

/// Poll the indexer until `probe` observes the entity this action touched.
pub(crate) async fn converge<F, Fut>(
    cx: &ActionCx,
    session: &Session,
    tx_hash: &TxHash,
    probe: F,
) -> Result<(), Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, Error>>,
{
    cx.advance(Step::Converging);
    await_indexed(&session.config().poll, cx.cancel_token(), probe)
        .await
        .map_err(|e| e.with_tx(tx_hash))
}

pub(crate) fn outcome(
    session: &Session,
    chain: ChainId,
    receipt: TxReceipt,
    entity_id: Option<String>,
) -> ActionOutcome {
    let explorer_url = session.explorer_tx_url(chain, &receipt.transaction_hash);
    ActionOutcome {
        receipt,
        explorer_url,
        entity_id,
    }
}
