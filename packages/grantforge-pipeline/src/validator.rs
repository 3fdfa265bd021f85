//! Off-chain document validator client.
//!
//! Every submission document is schema-checked and pinned by a remote
//! validator before it goes on chain; the contract call receives exactly the
//! hash this service issues. Rejections are terminal for the attempt, the
//! pipeline never retries them.

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use grantforge_types::{Address, ContentHash, GrantPayload, WorkspaceId};

use crate::error::Error;
use crate::metrics::METRICS;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the grant validator service.
#[derive(Debug, Clone)]
pub struct ValidatorClient {
    http: reqwest::Client,
    base_url: String,
}

// --- Wire types ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceCreateRequest {
    pub title: String,
    pub about: String,
    pub logo_ipfs_hash: ContentHash,
    pub creator_id: Address,
    pub socials: Vec<SocialLink>,
    pub supported_networks: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    pub name: String,
    pub value: String,
}

/// Partial update; absent fields keep their current values.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_ipfs_hash: Option<ContentHash>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub socials: Vec<SocialLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantCreateRequest {
    #[serde(flatten)]
    pub payload: GrantPayload,
    pub creator_id: Address,
    pub workspace_id: WorkspaceId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSetRequest {
    pub reviewer: Address,
    /// Empty when the review is private; readers go through
    /// `encrypted_review` instead.
    pub public_review_data_hash: String,
    pub encrypted_review: BTreeMap<Address, ContentHash>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateResponse {
    #[serde(default)]
    data: Option<ValidateData>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateData {
    #[serde(default)]
    ipfs_hash: String,
}

impl ValidatorClient {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn validate_workspace_create(
        &self,
        request: &WorkspaceCreateRequest,
    ) -> Result<ContentHash, Error> {
        self.post("/validate/workspace-create", request).await
    }

    pub async fn validate_workspace_update(
        &self,
        request: &WorkspaceUpdateRequest,
    ) -> Result<ContentHash, Error> {
        self.post("/validate/workspace-update", request).await
    }

    pub async fn validate_grant_create(
        &self,
        request: &GrantCreateRequest,
    ) -> Result<ContentHash, Error> {
        self.post("/validate/grant-create", request).await
    }

    pub async fn validate_grant_update(&self, payload: &GrantPayload) -> Result<ContentHash, Error> {
        self.post("/validate/grant-update", payload).await
    }

    pub async fn validate_review_set(
        &self,
        request: &ReviewSetRequest,
    ) -> Result<ContentHash, Error> {
        self.post("/validate/review-set", request).await
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ContentHash, Error> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Unknown(format!("validator unreachable: {e}")))?;

        let status = response.status();
        let parsed: ValidateResponse = match response.json().await {
            Ok(p) => p,
            Err(e) if status.is_success() => {
                return Err(Error::Unknown(format!("validator response parse error: {e}")));
            }
            Err(_) => {
                METRICS.validator_rejections.fetch_add(1, Ordering::Relaxed);
                return Err(Error::Validation(format!("validator HTTP {status}")));
            }
        };

        if !status.is_success() {
            METRICS.validator_rejections.fetch_add(1, Ordering::Relaxed);
            let message = parsed
                .error
                .or(parsed.message)
                .unwrap_or_else(|| format!("validator HTTP {status}"));
            warn!(status = %status, path, message, "validator rejected document");
            return Err(Error::Validation(message));
        }

        let hash = parsed.data.map(|d| d.ipfs_hash).unwrap_or_default();
        if hash.is_empty() {
            METRICS.validator_rejections.fetch_add(1, Ordering::Relaxed);
            return Err(Error::Validation("validator returned no content hash".into()));
        }

        debug!(path, hash, "document validated");
        ContentHash::new(hash).map_err(|e| Error::Validation(e.to_string()))
    }
}
