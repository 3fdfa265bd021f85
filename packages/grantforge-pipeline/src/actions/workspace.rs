//! Workspace creation and member key publication.

use std::sync::Arc;

use serde::Deserialize;

use grantforge_types::ChainId;

use crate::chain::{CallValue, ContractRole};
use crate::error::Error;
use crate::gate::preflight;
use crate::progress::{launch, ActionHandle, Step};
use crate::session::Session;
use crate::validator::{SocialLink, WorkspaceCreateRequest, WorkspaceUpdateRequest};

// --- Convergence wire types ---

const MEMBERS_QUERY: &str = "query($workspaceId: String!) { \
     workspaceMembers(where: { workspace: $workspaceId }) { actorId publicKey } }";

#[derive(Debug, Deserialize)]
struct MembersData {
    #[serde(rename = "workspaceMembers")]
    workspace_members: Vec<MemberRow>,
}

#[derive(Debug, Deserialize)]
struct MemberRow {
    #[serde(rename = "actorId")]
    actor_id: String,
    #[serde(rename = "publicKey")]
    public_key: Option<String>,
}

/// Input for [`create_workspace`]. The chain is explicit: there is no
/// active workspace yet to infer it from.
#[derive(Debug, Clone)]
pub struct CreateWorkspace {
    pub chain: ChainId,
    pub title: String,
    pub about: String,
    /// Raw logo bytes. Uploaded first so the workspace document can embed
    /// the hash.
    pub logo: Vec<u8>,
    pub socials: Vec<SocialLink>,
}

/// Create a workspace on `input.chain`.
///
/// The outcome's `entity_id` is the workspace id minted by the
/// `WorkspaceCreated` event; a mined receipt without that event fails the
/// action. No convergence poll here: hosts load the new workspace when
/// they navigate to it.
pub fn create_workspace(session: Arc<Session>, input: CreateWorkspace) -> ActionHandle {
    launch("create_workspace", move |cx| async move {
        let contract = preflight(&session, input.chain, ContractRole::WorkspaceRegistry)
            .await
            .into_result()?;
        let creator = super::connected_account(&session).await?;

        cx.advance(Step::Preparing);
        let logo_hash = cx
            .checkpoint(session.content_store().upload(input.logo))
            .await?;

        cx.advance(Step::Validating);
        let request = WorkspaceCreateRequest {
            title: input.title,
            about: input.about,
            logo_ipfs_hash: logo_hash,
            creator_id: creator,
            socials: input.socials,
            supported_networks: vec![input.chain.to_string()],
        };
        let doc_hash = cx
            .checkpoint(session.validator().validate_workspace_create(&request))
            .await?;

        let (_, receipt) = super::submit_and_confirm(
            &cx,
            &contract,
            "createWorkspace",
            vec![CallValue::Hash(doc_hash)],
        )
        .await?;

        let workspace_id = receipt
            .require_event("WorkspaceCreated")?
            .arg_id("id")
            .ok_or_else(|| Error::Unknown("WorkspaceCreated event carries no id".into()))?;

        Ok(super::outcome(&session, input.chain, receipt, Some(workspace_id)))
    })
}

/// Input for [`update_workspace_keys`].
#[derive(Debug, Clone)]
pub struct UpdateWorkspaceKeys {
    /// Hex-encoded secp256k1 public key the member publishes so sealed
    /// payloads can be addressed to them.
    pub public_key: String,
}

/// Publish the connected member's encryption key on the active workspace.
///
/// Converges once the indexer shows the key on the member's row; reviews
/// sealed before that would silently skip the member.
pub fn update_workspace_keys(session: Arc<Session>, input: UpdateWorkspaceKeys) -> ActionHandle {
    launch("update_workspace_keys", move |cx| async move {
        let workspace = super::active_workspace(&session)?;
        let target = workspace.chain;
        let contract = preflight(&session, target, ContractRole::WorkspaceRegistry)
            .await
            .into_result()?;
        let member = super::connected_account(&session).await?;

        cx.advance(Step::Validating);
        let request = WorkspaceUpdateRequest {
            public_key: Some(input.public_key.clone()),
            ..Default::default()
        };
        let doc_hash = cx
            .checkpoint(session.validator().validate_workspace_update(&request))
            .await?;

        let (tx_hash, receipt) = super::submit_and_confirm(
            &cx,
            &contract,
            "updateWorkspaceMetadata",
            vec![
                CallValue::Text(workspace.id.as_str().to_string()),
                CallValue::Hash(doc_hash),
            ],
        )
        .await?;

        let indexer = session.indexer(target)?.clone();
        let workspace_id = workspace.id.as_str().to_string();
        let member_id = member.as_str().to_string();
        let published = input.public_key;
        super::converge(&cx, &session, &tx_hash, move || {
            let indexer = indexer.clone();
            let workspace_id = workspace_id.clone();
            let member_id = member_id.clone();
            let published = published.clone();
            async move {
                let data: MembersData = indexer
                    .query(MEMBERS_QUERY, serde_json::json!({ "workspaceId": workspace_id }))
                    .await?;
                Ok(data.workspace_members.iter().any(|m| {
                    m.actor_id.eq_ignore_ascii_case(&member_id)
                        && m.public_key.as_deref() == Some(published.as_str())
                }))
            }
        })
        .await?;

        Ok(super::outcome(&session, target, receipt, None))
    })
}
