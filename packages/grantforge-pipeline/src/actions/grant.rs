//! Grant creation and editing.

use std::sync::Arc;

use serde::Deserialize;

use grantforge_types::{Address, ChainId, GrantPayload, WorkspaceId};

use crate::chain::{CallValue, ContractRole};
use crate::error::Error;
use crate::gate::preflight;
use crate::progress::{launch, ActionHandle, Step};
use crate::session::Session;
use crate::validator::GrantCreateRequest;

// --- Convergence wire types ---

const GRANTS_QUERY: &str =
    "query($grantId: String!) { grants(where: { id: $grantId }) { id metadataHash } }";

#[derive(Debug, Deserialize)]
struct GrantsData {
    grants: Vec<GrantRow>,
}

#[derive(Debug, Deserialize)]
struct GrantRow {
    id: String,
    #[serde(rename = "metadataHash", default)]
    metadata_hash: Option<String>,
}

/// Input for [`create_grant`].
#[derive(Debug, Clone)]
pub struct CreateGrant {
    /// Target chain; `None` uses the active workspace's chain.
    pub chain: Option<ChainId>,
    /// Workspace to publish under. Explicit because the signup path creates
    /// a grant right after minting a workspace the session has not loaded.
    pub workspace_id: WorkspaceId,
    pub payload: GrantPayload,
}

/// Publish a new grant.
///
/// The factory call carries the chain's registry addresses alongside the
/// validated document hash; the `GrantCreated` event mints the grant's
/// contract address, which becomes the outcome's `entity_id` once the
/// indexer lists it.
pub fn create_grant(session: Arc<Session>, input: CreateGrant) -> ActionHandle {
    launch("create_grant", move |cx| async move {
        let target = session.target_chain(input.chain)?;
        let contract = preflight(&session, target, ContractRole::GrantFactory)
            .await
            .into_result()?;
        let creator = super::connected_account(&session).await?;

        cx.advance(Step::Validating);
        let request = GrantCreateRequest {
            payload: input.payload,
            creator_id: creator,
            workspace_id: input.workspace_id.clone(),
        };
        let doc_hash = cx
            .checkpoint(session.validator().validate_grant_create(&request))
            .await?;

        let chain_info = session
            .config()
            .chain(target)
            .ok_or_else(|| Error::Config(format!("chain {target} not configured")))?;
        let args = vec![
            CallValue::Text(input.workspace_id.as_str().to_string()),
            CallValue::Hash(doc_hash),
            CallValue::Addr(chain_info.contracts.workspace_registry.clone()),
            CallValue::Addr(chain_info.contracts.application_registry.clone()),
        ];
        let (tx_hash, receipt) =
            super::submit_and_confirm(&cx, &contract, "createGrant", args).await?;

        let grant_address = receipt
            .require_event("GrantCreated")?
            .arg_id("grantAddress")
            .ok_or_else(|| Error::Unknown("GrantCreated event carries no grant address".into()))?;

        let indexer = session.indexer(target)?.clone();
        let grant_id = grant_address.to_lowercase();
        super::converge(&cx, &session, &tx_hash, move || {
            let indexer = indexer.clone();
            let grant_id = grant_id.clone();
            async move {
                let data: GrantsData = indexer
                    .query(GRANTS_QUERY, serde_json::json!({ "grantId": grant_id }))
                    .await?;
                Ok(data.grants.iter().any(|g| g.id == grant_id))
            }
        })
        .await?;

        Ok(super::outcome(&session, target, receipt, Some(grant_address)))
    })
}

/// Input for [`edit_grant`].
#[derive(Debug, Clone)]
pub struct EditGrant {
    /// Target chain; `None` uses the active workspace's chain.
    pub chain: Option<ChainId>,
    /// The grant's contract address, which is also its indexer id.
    pub grant: Address,
    pub payload: GrantPayload,
}

/// Replace a grant's published document.
///
/// No creation event here; the edit converges once the indexer shows the
/// grant carrying the new document hash.
pub fn edit_grant(session: Arc<Session>, input: EditGrant) -> ActionHandle {
    launch("edit_grant", move |cx| async move {
        let workspace = super::active_workspace(&session)?;
        let target = session.target_chain(input.chain)?;
        let contract = preflight(&session, target, ContractRole::GrantFactory)
            .await
            .into_result()?;

        cx.advance(Step::Validating);
        let doc_hash = cx
            .checkpoint(session.validator().validate_grant_update(&input.payload))
            .await?;

        let args = vec![
            CallValue::Addr(input.grant.clone()),
            CallValue::Text(workspace.id.as_str().to_string()),
            CallValue::Hash(doc_hash.clone()),
        ];
        let (tx_hash, receipt) =
            super::submit_and_confirm(&cx, &contract, "updateGrant", args).await?;

        let indexer = session.indexer(target)?.clone();
        let grant_id = input.grant.as_str().to_string();
        let expected = doc_hash.as_str().to_string();
        super::converge(&cx, &session, &tx_hash, move || {
            let indexer = indexer.clone();
            let grant_id = grant_id.clone();
            let expected = expected.clone();
            async move {
                let data: GrantsData = indexer
                    .query(GRANTS_QUERY, serde_json::json!({ "grantId": grant_id }))
                    .await?;
                Ok(data.grants.iter().any(|g| {
                    g.id == grant_id && g.metadata_hash.as_deref() == Some(expected.as_str())
                }))
            }
        })
        .await?;

        Ok(super::outcome(&session, target, receipt, None))
    })
}
