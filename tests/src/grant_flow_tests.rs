// =============================================================================
// Grant Flow Integration Tests
// =============================================================================
// Covers:
// - create_grant passes the validated document hash and registry addresses
//   to the factory and converges once the indexer lists the new grant
// - Progress steps never move backwards over a full run
// - A validator rejection fails the action before any chain traffic
// - edit_grant converges only when the indexer shows the new document hash

use grantforge_pipeline::actions::{create_grant, edit_grant, CreateGrant, EditGrant};
use grantforge_pipeline::{CallValue, ContractRole, Error, Step};
use grantforge_types::{ContentHash, WorkspaceId};
use serde_json::json;

use crate::utils::{
    grant_payload, receipt_with, test_account, test_address, test_workspace, CallOutcome, Harness,
};

#[tokio::test]
async fn test_create_grant_converges_on_indexer_visibility() -> anyhow::Result<()> {
    let h = Harness::new(ContractRole::GrantFactory).await;
    h.session.set_workspace(Some(test_workspace(vec![])));
    h.services.state.issue_hash("QmGrantDoc");
    let grant = test_address(0x77);
    h.contract.push_outcome(CallOutcome::Mined(receipt_with(vec![(
        "GrantCreated",
        json!({ "grantAddress": grant.as_str() }),
    )])));
    // Not indexed yet on the first probe.
    h.services.state.push_graphql(json!({ "grants": [] }));
    h.services
        .state
        .push_graphql(json!({ "grants": [{ "id": grant.as_str() }] }));

    let outcome = create_grant(
        h.session.clone(),
        CreateGrant {
            chain: None,
            workspace_id: WorkspaceId::from(7),
            payload: grant_payload(),
        },
    )
    .join()
    .await?;

    assert_eq!(outcome.entity_id.as_deref(), Some(grant.as_str()));
    assert!(
        h.services.state.graphql_hits() >= 2,
        "expected the empty page to force a retry"
    );

    // The document went to the validator with the payload flattened in.
    let bodies = h.services.state.validator_bodies();
    assert_eq!(bodies[0]["title"], "Open Tooling Round");
    assert_eq!(bodies[0]["reward"]["committed"], "2500000");
    assert_eq!(bodies[0]["workspaceId"], "7");
    assert_eq!(bodies[0]["creatorId"], test_account().as_str());

    // The factory call carries the hash plus both registry addresses.
    let calls = h.contract.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "createGrant");
    assert_eq!(calls[0].1[0], CallValue::Text("7".to_string()));
    assert_eq!(
        calls[0].1[1],
        CallValue::Hash(ContentHash::new("QmGrantDoc").unwrap())
    );
    assert_eq!(calls[0].1[2], CallValue::Addr(test_address(0x01)));
    assert_eq!(calls[0].1[3], CallValue::Addr(test_address(0x03)));
    Ok(())
}

#[tokio::test]
async fn test_steps_never_regress_over_a_full_run() -> anyhow::Result<()> {
    let h = Harness::new(ContractRole::GrantFactory).await;
    h.session.set_workspace(Some(test_workspace(vec![])));
    let grant = test_address(0x77);
    h.contract.push_outcome(CallOutcome::Mined(receipt_with(vec![(
        "GrantCreated",
        json!({ "grantAddress": grant.as_str() }),
    )])));
    h.services
        .state
        .push_graphql(json!({ "grants": [{ "id": grant.as_str() }] }));

    let handle = create_grant(
        h.session.clone(),
        CreateGrant {
            chain: None,
            workspace_id: WorkspaceId::from(7),
            payload: grant_payload(),
        },
    );
    let mut rx = handle.progress();
    // The watch holds only the latest value, so a slow reader may skip
    // intermediate steps; what it must never see is a step moving backwards.
    let collector = tokio::spawn(async move {
        let mut steps = Vec::new();
        while rx.changed().await.is_ok() {
            if let Some(step) = rx.borrow().step {
                steps.push(step);
            }
        }
        steps
    });

    handle.join().await?;
    let steps = collector.await?;

    assert!(!steps.is_empty());
    assert!(
        steps.windows(2).all(|pair| pair[0] <= pair[1]),
        "steps regressed: {steps:?}"
    );
    assert_eq!(steps.last(), Some(&Step::Done));
    Ok(())
}

#[tokio::test]
async fn test_validator_rejection_stops_before_chain() -> anyhow::Result<()> {
    let h = Harness::new(ContractRole::GrantFactory).await;
    h.session.set_workspace(Some(test_workspace(vec![])));
    h.services
        .state
        .reject_documents(400, "deadline must be in the future");

    let handle = create_grant(
        h.session.clone(),
        CreateGrant {
            chain: None,
            workspace_id: WorkspaceId::from(7),
            payload: grant_payload(),
        },
    );
    let rx = handle.progress();
    let result = handle.join().await;

    match result {
        Err(Error::Validation(message)) => assert!(message.contains("deadline")),
        other => panic!("expected Validation, got {other:?}"),
    }
    assert!(h.contract.calls().is_empty(), "no chain call after rejection");
    assert_eq!(h.services.state.graphql_hits(), 0);

    let state = rx.borrow();
    assert_eq!(state.step, None, "terminal failure resets the step");
    assert_eq!(
        state.error.as_deref(),
        Some("validation failed: deadline must be in the future")
    );
    Ok(())
}

#[tokio::test]
async fn test_edit_grant_waits_for_the_new_document_hash() -> anyhow::Result<()> {
    let h = Harness::new(ContractRole::GrantFactory).await;
    h.session.set_workspace(Some(test_workspace(vec![])));
    h.services.state.issue_hash("QmNewDoc");
    let grant = test_address(0x77);
    // The indexer serves the stale document first.
    h.services.state.push_graphql(json!({
        "grants": [{ "id": grant.as_str(), "metadataHash": "QmOldDoc" }]
    }));
    h.services.state.push_graphql(json!({
        "grants": [{ "id": grant.as_str(), "metadataHash": "QmNewDoc" }]
    }));

    edit_grant(
        h.session.clone(),
        EditGrant {
            chain: None,
            grant: grant.clone(),
            payload: grant_payload(),
        },
    )
    .join()
    .await?;

    assert!(
        h.services.state.graphql_hits() >= 2,
        "expected the stale hash to force a retry"
    );
    let calls = h.contract.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "updateGrant");
    assert_eq!(calls[0].1[0], CallValue::Addr(grant));
    assert_eq!(calls[0].1[1], CallValue::Text("7".to_string()));
    assert_eq!(
        calls[0].1[2],
        CallValue::Hash(ContentHash::new("QmNewDoc").unwrap())
    );
    Ok(())
}
