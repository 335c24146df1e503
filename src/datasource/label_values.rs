//! Label-values federation across every datasource
//!
//! Each datasource is queried concurrently with its own timeout. Backends
//! that fail, time out, or answer with anything but a successful payload are
//! logged and skipped: the merged answer is always reported as a success.

use crate::config::Datasource;
use crate::error::{AppError, AppResult};
use crate::metrics::{BackendFailure, Metrics, log_recording_failure};
use crate::shared::forward::{transport_error, upstream_url};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Status value of a successful label-values payload
pub const STATUS_SUCCESS: &str = "success";

/// Label-values payload, both as consumed from backends and as served
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelValuesResponse {
    pub status: String,
    /// Absent on error payloads
    #[serde(default)]
    pub data: Vec<String>,
}

impl LabelValuesResponse {
    /// Successful payload carrying `data`
    pub fn success(data: Vec<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            data,
        }
    }
}

/// Fans label-values requests out to all datasources and merges the answers
#[derive(Clone)]
pub struct LabelValuesAggregator {
    client: reqwest::Client,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl LabelValuesAggregator {
    /// Create an aggregator applying `timeout` to each backend call
    pub fn new(client: reqwest::Client, timeout: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            client,
            timeout,
            metrics,
        }
    }

    /// Per-backend timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query every datasource for `path` and merge the results
    ///
    /// Returns the union of all successfully retrieved values, deduplicated
    /// and sorted in byte order. Completes only once every backend has
    /// answered, failed, or timed out.
    pub async fn aggregate(
        &self,
        datasources: &[Datasource],
        path: &str,
        query: Option<&str>,
    ) -> Vec<String> {
        let mut tasks = JoinSet::new();

        for datasource in datasources {
            let url = upstream_url(datasource.url(), path, query);
            let client = self.client.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                let result = fetch_label_values(&client, &url, timeout).await;
                (url, result)
            });
        }

        // Each task owns its result; merging happens here after join, so no
        // lock is shared between tasks.
        let mut merged = BTreeSet::new();
        let mut failed_backends = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(values))) => merged.extend(values),
                Ok((url, Err(e))) => {
                    failed_backends += 1;
                    tracing::warn!(
                        datasource = %url,
                        error = %e,
                        "Ignoring label values from datasource"
                    );
                    log_recording_failure(
                        self.metrics.record_backend_failure(BackendFailure::from(&e)),
                        "record_backend_failure",
                    );
                }
                Err(e) => {
                    failed_backends += 1;
                    tracing::error!(error = %e, "Label values fan-out task failed");
                    log_recording_failure(
                        self.metrics
                            .record_backend_failure(BackendFailure::TaskFailed),
                        "record_backend_failure",
                    );
                }
            }
        }

        tracing::debug!(
            datasources = datasources.len(),
            failed_backends = failed_backends,
            merged_values = merged.len(),
            "Label values aggregation complete"
        );

        merged.into_iter().collect()
    }
}

/// Fetch one backend's label values
///
/// Anything other than HTTP 200 with a `success` payload is an error.
async fn fetch_label_values(
    client: &reqwest::Client,
    url: &Url,
    timeout: Duration,
) -> AppResult<Vec<String>> {
    let response = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| transport_error(url, e, Some(timeout)))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(AppError::BadUpstreamPayload {
            url: url.to_string(),
            reason: format!("status code {}", status.as_u16()),
        });
    }

    let payload: LabelValuesResponse = response
        .json()
        .await
        .map_err(|e| transport_error(url, e, Some(timeout)))?;

    if payload.status != STATUS_SUCCESS {
        return Err(AppError::BadUpstreamPayload {
            url: url.to_string(),
            reason: format!("status is {:?}", payload.status),
        });
    }

    Ok(payload.data)
}
