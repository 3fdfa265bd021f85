//! Watchable action progress and the handle driving it.
//!
//! Every action spawns one tokio task running the full pipeline and exposes
//! a [`watch`] channel of [`PendingAction`] snapshots to the host view.
//! Dropping the handle cancels the task: in-flight work is tied to the
//! lifetime of the view that started it.

use std::future::Future;
use std::sync::atomic::Ordering;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use grantforge_types::TxHash;

use crate::chain::TxReceipt;
use crate::error::Error;
use crate::metrics::METRICS;

/// Pipeline stage boundaries, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Input normalization plus the content uploads the document embeds.
    Preparing = 0,
    /// Remote validator call; issues the hash the contract call receives.
    Validating = 1,
    /// Wallet signing and broadcast.
    Submitting = 2,
    /// Waiting for the transaction to be mined.
    Confirming = 3,
    /// Waiting for the indexer to observe the entity.
    Converging = 4,
    /// Terminal success.
    Done = 5,
}

/// View-model of one in-flight action.
///
/// `step` never regresses while `error` is empty; when the attempt fails it
/// resets to `None` and `error` carries the user-facing message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PendingAction {
    pub step: Option<Step>,
    pub error: Option<String>,
    pub tx_hash: Option<TxHash>,
}

/// What a finished action hands back.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub receipt: TxReceipt,
    /// Block-explorer link for the transaction, when the chain has one.
    pub explorer_url: Option<String>,
    /// Identifier minted by a creation event (workspace id, grant address).
    pub entity_id: Option<String>,
}

/// Driver-side context owned by a running action.
#[derive(Clone)]
pub(crate) struct ActionCx {
    progress: watch::Sender<PendingAction>,
    cancel: CancellationToken,
}

impl ActionCx {
    /// Move to `step`. Steps only move forward; flows without a given stage
    /// skip its ordinal.
    pub(crate) fn advance(&self, step: Step) {
        self.progress.send_modify(|state| {
            debug_assert!(state.step.map_or(true, |current| current <= step));
            state.step = Some(step);
        });
        debug!(step = ?step, "action step");
    }

    pub(crate) fn set_tx_hash(&self, hash: &TxHash) {
        self.progress
            .send_modify(|state| state.tx_hash = Some(hash.clone()));
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Race one stage against cancellation.
    pub(crate) async fn checkpoint<T>(
        &self,
        stage: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = stage => result,
        }
    }
}

/// Spawn an action pipeline and hand back its handle.
pub(crate) fn launch<F, Fut>(kind: &'static str, body: F) -> ActionHandle
where
    F: FnOnce(ActionCx) -> Fut,
    Fut: Future<Output = Result<ActionOutcome, Error>> + Send + 'static,
{
    let (progress, watcher) = watch::channel(PendingAction::default());
    let cancel = CancellationToken::new();
    let cx = ActionCx {
        progress: progress.clone(),
        cancel: cancel.clone(),
    };

    METRICS.actions_started.fetch_add(1, Ordering::Relaxed);
    METRICS.in_flight.fetch_add(1, Ordering::Relaxed);

    let pipeline = body(cx);
    let task = tokio::spawn(async move {
        let result = pipeline.await;
        METRICS.in_flight.fetch_sub(1, Ordering::Relaxed);
        match &result {
            Ok(outcome) => {
                METRICS.actions_succeeded.fetch_add(1, Ordering::Relaxed);
                progress.send_modify(|state| state.step = Some(Step::Done));
                info!(kind, tx_hash = %outcome.receipt.transaction_hash, "action complete");
            }
            Err(Error::Cancelled) => {
                METRICS.actions_cancelled.fetch_add(1, Ordering::Relaxed);
                progress.send_modify(|state| state.step = None);
                debug!(kind, "action cancelled");
            }
            Err(e) => {
                METRICS.actions_failed.fetch_add(1, Ordering::Relaxed);
                let message = e.user_message();
                progress.send_modify(|state| {
                    state.step = None;
                    state.error = Some(message);
                });
                warn!(kind, error = %e, "action failed");
            }
        }
        result
    });

    ActionHandle {
        task,
        watcher,
        cancel,
        detached: false,
    }
}

/// Handle to a spawned action.
pub struct ActionHandle {
    task: JoinHandle<Result<ActionOutcome, Error>>,
    watcher: watch::Receiver<PendingAction>,
    cancel: CancellationToken,
    detached: bool,
}

impl ActionHandle {
    /// Watch progress snapshots. The receiver always sees the terminal state.
    pub fn progress(&self) -> watch::Receiver<PendingAction> {
        self.watcher.clone()
    }

    /// Snapshot of the transaction hash, once broadcast.
    pub fn tx_hash(&self) -> Option<TxHash> {
        self.watcher.borrow().tx_hash.clone()
    }

    /// Cancel the action. In-flight stages stop at their next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Let the action run to completion even after this handle drops.
    pub fn detach(mut self) {
        self.detached = true;
    }

    /// Wait for the action to finish.
    pub async fn join(mut self) -> Result<ActionOutcome, Error> {
        let result = (&mut self.task).await;
        self.detached = true;
        match result {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(Error::Cancelled),
            Err(e) => Err(Error::Unknown(format!("action task failed: {e}"))),
        }
    }
}

impl Drop for ActionHandle {
    fn drop(&mut self) {
        if !self.detached && !self.task.is_finished() {
            self.cancel.cancel();
        }
    }
}
