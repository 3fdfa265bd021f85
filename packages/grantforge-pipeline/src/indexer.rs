//! GraphQL indexer client and convergence polling.
//!
//! Transaction inclusion and index availability are decoupled systems with no
//! shared completion signal; polling the indexer is the only consistency
//! bridge the client has. The poll is bounded: capped exponential backoff
//! under an overall budget.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::PollPolicy;
use crate::error::Error;
use crate::metrics::METRICS;

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one chain's grants subgraph.
#[derive(Debug, Clone)]
pub struct IndexerClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl IndexerClient {
    pub fn new(url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST one GraphQL query; `T` is the shape under `data`.
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, Error> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Indexer(format!("indexer unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Indexer(format!("indexer HTTP {status}")));
        }

        let parsed: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Indexer(format!("indexer response parse error: {e}")))?;
        if let Some(first) = parsed.errors.first() {
            return Err(Error::Indexer(first.message.clone()));
        }
        parsed
            .data
            .ok_or_else(|| Error::Indexer("indexer returned no data".into()))
    }
}

/// Poll `probe` until it observes the target entity.
///
/// Queries immediately, then backs off per `policy`. Transient probe errors
/// count as misses; the overall budget decides failure, not the first
/// transport hiccup. The final probe runs at the deadline itself.
/// Cancellation wins any race.
pub async fn await_indexed<F, Fut>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<(), Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, Error>>,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        METRICS.poll_queries.fetch_add(1, Ordering::Relaxed);
        match probe().await {
            Ok(true) => {
                debug!(attempt, elapsed = ?started.elapsed(), "entity indexed");
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => {
                warn!(attempt, error = %e, "convergence probe failed, treating as miss");
            }
        }

        let remaining = policy.timeout().saturating_sub(started.elapsed());
        if remaining.is_zero() {
            METRICS.poll_timeouts.fetch_add(1, Ordering::Relaxed);
            return Err(Error::IndexingTimeout {
                tx_hash: None,
                waited: started.elapsed(),
            });
        }

        let delay = policy.delay_for(attempt).min(remaining);
        attempt += 1;

        tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
