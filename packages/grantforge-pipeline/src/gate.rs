//! Preflight gate: wallet, network, contract availability.
//!
//! Every action runs this before touching the validator, the content store
//! or the chain. Anything short of `Ready` stops the action with zero
//! upstream traffic.

use std::sync::Arc;

use tracing::{debug, info, warn};

use grantforge_types::ChainId;

use crate::chain::{ContractHandle, ContractRole};
use crate::error::Error;
use crate::session::Session;

/// Preflight verdict. Only [`Preflight::Ready`] lets an action proceed.
pub enum Preflight {
    Ready(Arc<dyn ContractHandle>),
    NotConnected,
    WrongNetwork {
        expected: ChainId,
        actual: Option<ChainId>,
    },
    ContractUnavailable,
}

impl Preflight {
    /// Collapse into the error taxonomy.
    pub fn into_result(self) -> Result<Arc<dyn ContractHandle>, Error> {
        match self {
            Self::Ready(handle) => Ok(handle),
            Self::NotConnected => Err(Error::NotConnected),
            Self::WrongNetwork { expected, actual } => {
                Err(Error::WrongNetwork { expected, actual })
            }
            Self::ContractUnavailable => Err(Error::ContractUnavailable),
        }
    }
}

/// Check wallet, network and contract binding for `role` on `target`.
///
/// A network mismatch requests the switch before reporting. The request is
/// fire-and-forget: the wallet may prompt the user, and the verdict stays
/// `WrongNetwork` either way; the host retries the action after the wallet
/// settles.
pub async fn preflight(session: &Session, target: ChainId, role: ContractRole) -> Preflight {
    let Some(account) = session.wallet().account().await else {
        debug!("preflight: no wallet account");
        return Preflight::NotConnected;
    };

    let actual = session.wallet().chain_id().await;
    if actual != Some(target) {
        info!(expected = %target, actual = ?actual, "preflight: wrong network, requesting switch");
        if let Err(e) = session.wallet().switch_network(target).await {
            warn!(error = %e, "network switch request failed");
        }
        return Preflight::WrongNetwork {
            expected: target,
            actual,
        };
    }

    let Some(handle) = session.contracts().contract(target, role) else {
        debug!(role = role.as_str(), chain = %target, "preflight: no contract registered");
        return Preflight::ContractUnavailable;
    };
    if handle.address().is_zero() || !handle.is_bound() {
        debug!(role = role.as_str(), chain = %target, "preflight: contract not ready");
        return Preflight::ContractUnavailable;
    }

    debug!(account = %account, role = role.as_str(), chain = %target, "preflight ok");
    Preflight::Ready(handle)
}
