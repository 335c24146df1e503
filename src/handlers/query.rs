//! Instant and range query handlers
//!
//! Both pick one datasource from the query's time parameters and then proxy
//! the untouched request to it.

use crate::config::Datasource;
use crate::datasource::{RangeQuery, select_for_instant, select_for_range};
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::metrics::{Endpoint, log_recording_failure};
use crate::middleware::RequestId;
use crate::shared::forward::forward;
use crate::shared::params::{parse_duration, parse_time};
use axum::{
    Extension,
    extract::{Query, Request, State},
    http::Uri,
    response::Response,
};
use chrono::Utc;

/// Query-string pairs in the order the client sent them
///
/// Routing reads only the first value of a repeated key; the full query
/// string is forwarded untouched. Form-encoded request bodies are forwarded
/// but never inspected.
struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    fn from_uri(uri: &Uri) -> AppResult<Self> {
        Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map(|Query(pairs)| Self(pairs))
            .map_err(|e| AppError::BadParameter {
                name: "query string",
                value: uri.query().unwrap_or_default().to_string(),
                reason: e.body_text(),
            })
    }

    /// First value given for `key`, empty when absent
    fn first(&self, key: &str) -> &str {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    }
}

/// `/api/v1/query` handler
///
/// Routes to the finest-resolution datasource retaining `time`.
pub async fn instant_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    request: Request,
) -> AppResult<Response> {
    let endpoint = Endpoint::Query;
    log_recording_failure(state.metrics().record_request(endpoint), "record_request");

    let params = QueryPairs::from_uri(request.uri())?;
    let time = parse_time("time", params.first("time"))?;

    let datasource = select_for_instant(state.datasources(), time, Utc::now())
        .ok_or_else(|| no_datasource(&state, endpoint, request_id))?;

    tracing::info!(
        request_id = %request_id,
        endpoint = endpoint.as_str(),
        datasource = %datasource.url(),
        time = %time,
        "Routing query"
    );

    forward_to(&state, endpoint, datasource, request).await
}

/// `/api/v1/query_range` handler
///
/// Routes to the coarsest datasource that honours `step` and retains the
/// whole `[start, end]` window.
pub async fn range_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    request: Request,
) -> AppResult<Response> {
    let endpoint = Endpoint::QueryRange;
    log_recording_failure(state.metrics().record_request(endpoint), "record_request");

    let params = QueryPairs::from_uri(request.uri())?;
    let step = parse_duration("step", params.first("step"))?;
    let start = parse_time("start", params.first("start"))?;
    let end = parse_time("end", params.first("end"))?;
    let query = RangeQuery { start, end, step };

    let datasource = select_for_range(state.datasources(), &query, Utc::now())
        .ok_or_else(|| no_datasource(&state, endpoint, request_id))?;

    tracing::info!(
        request_id = %request_id,
        endpoint = endpoint.as_str(),
        datasource = %datasource.url(),
        step = ?step,
        start = %start,
        end = %end,
        "Routing query"
    );

    forward_to(&state, endpoint, datasource, request).await
}

fn no_datasource(state: &AppState, endpoint: Endpoint, request_id: RequestId) -> AppError {
    tracing::warn!(
        request_id = %request_id,
        endpoint = endpoint.as_str(),
        "No datasource can serve the query"
    );
    log_recording_failure(
        state.metrics().record_no_datasource(endpoint),
        "record_no_datasource",
    );
    AppError::NoEligibleDatasource
}

async fn forward_to(
    state: &AppState,
    endpoint: Endpoint,
    datasource: &Datasource,
    request: Request,
) -> AppResult<Response> {
    let datasource_label = datasource.url().as_str();
    log_recording_failure(
        state.metrics().record_selection(endpoint, datasource_label),
        "record_selection",
    );

    forward(state.client(), datasource, request)
        .await
        .inspect_err(|e| {
            tracing::error!(
                endpoint = endpoint.as_str(),
                datasource = datasource_label,
                error = %e,
                "Forwarding to datasource failed"
            );
            log_recording_failure(
                state.metrics().record_forward_failure(datasource_label),
                "record_forward_failure",
            );
        })
}
