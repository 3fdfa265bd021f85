//! Content-addressed store client.

use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use grantforge_types::ContentHash;

use crate::error::Error;
use crate::metrics::METRICS;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the content-addressed store. Uploads return the hash the store
/// derived; the hash, never the bytes, is what goes on chain.
#[derive(Debug, Clone)]
pub struct ContentStoreClient {
    http: reqwest::Client,
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    hash: String,
}

impl ContentStoreClient {
    pub fn new(upload_url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            upload_url: upload_url.to_string(),
        })
    }

    /// Upload raw bytes (user media, sealed blobs).
    pub async fn upload(&self, bytes: Vec<u8>) -> Result<ContentHash, Error> {
        METRICS.uploads_total.fetch_add(1, Ordering::Relaxed);
        let result = self.upload_inner(bytes).await;
        if result.is_err() {
            METRICS.upload_errors.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Serialize and upload a JSON document.
    pub async fn upload_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<ContentHash, Error> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| Error::Upload(format!("serialize failed: {e}")))?;
        self.upload(bytes).await
    }

    async fn upload_inner(&self, bytes: Vec<u8>) -> Result<ContentHash, Error> {
        let size = bytes.len();
        let response = self
            .http
            .post(&self.upload_url)
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Upload(format!("content store unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upload(format!("content store HTTP {status}")));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Upload(format!("content store response parse error: {e}")))?;
        if parsed.hash.is_empty() {
            return Err(Error::Upload("content store returned no hash".into()));
        }

        debug!(hash = parsed.hash, size, "content uploaded");
        ContentHash::new(parsed.hash).map_err(|e| Error::Upload(e.to_string()))
    }
}
