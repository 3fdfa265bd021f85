//! Review submission, public or sealed.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use grantforge_types::{Address, ChainId, ReviewSet, Workspace};

use crate::chain::{CallValue, ContractRole};
use crate::error::Error;
use crate::gate::preflight;
use crate::progress::{launch, ActionHandle, Step};
use crate::sealed::{self, RecipientKey};
use crate::session::Session;
use crate::validator::ReviewSetRequest;

// --- Convergence wire types ---

const REVIEW_COUNTERS_QUERY: &str = "query($reviewerAddress: String!, $applicationsCount: Int!) { \
     grantReviewerCounters(where: { reviewerAddress: $reviewerAddress, \
     counter_gte: $applicationsCount }) { grant { id } } }";

#[derive(Debug, Deserialize)]
struct ReviewCountersData {
    #[serde(rename = "grantReviewerCounters")]
    grant_reviewer_counters: Vec<ReviewCounterRow>,
}

#[derive(Debug, Deserialize)]
struct ReviewCounterRow {
    grant: GrantRef,
}

#[derive(Debug, Deserialize)]
struct GrantRef {
    id: String,
}

/// Input for [`submit_review`].
#[derive(Debug, Clone)]
pub struct SubmitReview {
    /// Target chain; `None` uses the active workspace's chain.
    pub chain: Option<ChainId>,
    /// Indexer id of the application under review.
    pub application_id: String,
    /// The grant's contract address.
    pub grant: Address,
    pub review: ReviewSet,
    /// Sealed review: ciphertext per recipient, no public copy.
    pub private: bool,
}

/// Submit the connected reviewer's scores for one application.
///
/// A private review is sealed to the reviewer and every keyed admin or
/// owner, and all ciphertext uploads complete before validation; the
/// cleartext never leaves the client. A public review uploads one cleartext
/// document instead. Either way the contract receives only the
/// validator-issued hash.
pub fn submit_review(session: Arc<Session>, input: SubmitReview) -> ActionHandle {
    launch("submit_review", move |cx| async move {
        let workspace = super::active_workspace(&session)?;
        let target = session.target_chain(input.chain)?;
        let contract = preflight(&session, target, ContractRole::ReviewRegistry)
            .await
            .into_result()?;
        let reviewer = super::connected_account(&session).await?;

        let review_json = serde_json::to_vec(&input.review)
            .map_err(|e| Error::Unknown(format!("review serialization failed: {e}")))?;

        cx.advance(Step::Preparing);
        let (public_hash, encrypted) = if input.private {
            let recipients = sealed_recipients(&workspace, &reviewer)?;
            let encrypted = sealed::seal_for_recipients(
                session.content_store(),
                &review_json,
                &recipients,
                cx.cancel_token(),
            )
            .await?;
            (String::new(), encrypted)
        } else {
            let hash = cx
                .checkpoint(session.content_store().upload(review_json))
                .await?;
            (hash.as_str().to_string(), BTreeMap::new())
        };

        cx.advance(Step::Validating);
        let request = ReviewSetRequest {
            reviewer: reviewer.clone(),
            public_review_data_hash: public_hash,
            encrypted_review: encrypted,
        };
        let doc_hash = cx
            .checkpoint(session.validator().validate_review_set(&request))
            .await?;

        let args = vec![
            CallValue::Addr(reviewer.clone()),
            CallValue::Text(workspace.id.as_str().to_string()),
            CallValue::Text(input.application_id.clone()),
            CallValue::Addr(input.grant.clone()),
            CallValue::Hash(doc_hash),
        ];
        let (tx_hash, receipt) =
            super::submit_and_confirm(&cx, &contract, "submitReview", args).await?;

        let indexer = session.indexer(target)?.clone();
        let reviewer_id = reviewer.as_str().to_string();
        let grant_id = input.grant.as_str().to_string();
        super::converge(&cx, &session, &tx_hash, move || {
            let indexer = indexer.clone();
            let reviewer_id = reviewer_id.clone();
            let grant_id = grant_id.clone();
            async move {
                let data: ReviewCountersData = indexer
                    .query(
                        REVIEW_COUNTERS_QUERY,
                        serde_json::json!({
                            "reviewerAddress": reviewer_id,
                            "applicationsCount": 1,
                        }),
                    )
                    .await?;
                Ok(data
                    .grant_reviewer_counters
                    .iter()
                    .any(|row| row.grant.id == grant_id))
            }
        })
        .await?;

        Ok(super::outcome(&session, target, receipt, None))
    })
}

/// The reviewer plus every keyed admin and owner, deduplicated by address.
///
/// A reviewer without a published key can still seal to the admins; the
/// review just stays unreadable to its own author. No recipient at all
/// means the sealed payload would be unreadable by everyone.
fn sealed_recipients(
    workspace: &Workspace,
    reviewer: &Address,
) -> Result<Vec<(Address, RecipientKey)>, Error> {
    let mut out: Vec<(Address, RecipientKey)> = Vec::new();
    if let Some(member) = workspace.member(reviewer) {
        if let Some(key) = member.public_key.as_deref().filter(|k| !k.is_empty()) {
            out.push((member.actor_id.clone(), RecipientKey::from_hex(key)?));
        }
    }
    for member in workspace.encryption_recipients() {
        if out.iter().any(|(address, _)| address == &member.actor_id) {
            continue;
        }
        let Some(key) = member.public_key.as_deref() else {
            continue;
        };
        out.push((member.actor_id.clone(), RecipientKey::from_hex(key)?));
    }
    if out.is_empty() {
        return Err(Error::Validation("no recipients with published keys".into()));
    }
    Ok(out)
}
