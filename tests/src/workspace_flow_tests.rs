// =============================================================================
// Workspace Flow Integration Tests
// =============================================================================
// End-to-end runs of create_workspace and update_workspace_keys against
// in-process service mocks.
// Covers:
// - Logo upload happens before validation and the document embeds its hash
// - The contract call carries exactly the validator-issued hash
// - WorkspaceCreated mints the entity id surfaced in the outcome
// - A receipt without the creation event is an explicit failure
// - Key publication converges only once the indexer shows the key

use grantforge_pipeline::actions::{create_workspace, update_workspace_keys, UpdateWorkspaceKeys};
use grantforge_pipeline::{CallValue, ContractRole, Error};
use grantforge_types::{AccessLevel, ContentHash};
use serde_json::json;

use crate::utils::{
    member, receipt_with, test_account, test_tx_hash, test_workspace, workspace_input,
    CallOutcome, Harness,
};

#[tokio::test]
async fn test_create_workspace_uploads_validates_then_submits() -> anyhow::Result<()> {
    let h = Harness::new(ContractRole::WorkspaceRegistry).await;
    h.services.state.issue_hash("QmWorkspaceDoc");
    h.contract.push_outcome(CallOutcome::Mined(receipt_with(vec![(
        "WorkspaceCreated",
        json!({ "id": 12, "owner": test_account().as_str() }),
    )])));

    let outcome = create_workspace(h.session.clone(), workspace_input())
        .join()
        .await?;

    assert_eq!(outcome.entity_id.as_deref(), Some("12"));
    let expected_url = format!("https://scan.test/tx/{}", test_tx_hash());
    assert_eq!(outcome.explorer_url.as_deref(), Some(expected_url.as_str()));

    // The logo went up before validation and the document embeds its hash.
    assert_eq!(h.services.state.upload_hits(), 1);
    let bodies = h.services.state.validator_bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["logoIpfsHash"], "QmUpload1");
    assert_eq!(bodies[0]["creatorId"], test_account().as_str());
    assert_eq!(bodies[0]["supportedNetworks"], json!(["137"]));
    assert_eq!(bodies[0]["socials"][0]["name"], "twitter");

    // The broadcast carries the validator-issued hash, nothing else.
    let calls = h.contract.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "createWorkspace");
    assert_eq!(
        calls[0].1,
        vec![CallValue::Hash(ContentHash::new("QmWorkspaceDoc").unwrap())]
    );
    Ok(())
}

#[tokio::test]
async fn test_workspace_created_event_is_required() -> anyhow::Result<()> {
    let h = Harness::new(ContractRole::WorkspaceRegistry).await;
    h.contract
        .push_outcome(CallOutcome::Mined(receipt_with(vec![])));

    let result = create_workspace(h.session.clone(), workspace_input())
        .join()
        .await;

    match result {
        Err(Error::EventMissing { event, tx_hash }) => {
            assert_eq!(event, "WorkspaceCreated");
            assert_eq!(tx_hash, test_tx_hash());
        }
        other => panic!("expected EventMissing, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_update_workspace_keys_waits_for_the_indexed_key() -> anyhow::Result<()> {
    let h = Harness::new(ContractRole::WorkspaceRegistry).await;
    h.session.set_workspace(Some(test_workspace(vec![member(
        test_account(),
        AccessLevel::Admin,
        None,
    )])));
    h.services.state.issue_hash("QmMemberDoc");
    // Stale member row first, then the key shows up.
    h.services.state.push_graphql(json!({
        "workspaceMembers": [{ "actorId": test_account().as_str(), "publicKey": null }]
    }));
    h.services.state.push_graphql(json!({
        "workspaceMembers": [{ "actorId": test_account().as_str(), "publicKey": "0x04aabb" }]
    }));

    update_workspace_keys(
        h.session.clone(),
        UpdateWorkspaceKeys {
            public_key: "0x04aabb".to_string(),
        },
    )
    .join()
    .await?;

    assert!(
        h.services.state.graphql_hits() >= 2,
        "expected the stale row to force at least one retry"
    );
    let probes = h.services.state.graphql_bodies();
    assert_eq!(probes[0]["variables"]["workspaceId"], "7");

    let calls = h.contract.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "updateWorkspaceMetadata");
    assert_eq!(calls[0].1[0], CallValue::Text("7".to_string()));
    assert_eq!(
        calls[0].1[1],
        CallValue::Hash(ContentHash::new("QmMemberDoc").unwrap())
    );
    Ok(())
}
