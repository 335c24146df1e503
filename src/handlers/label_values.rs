//! `/api/v1/label/{name}/values` handler
//!
//! The lookup is sent to every datasource and the answers merged, so the
//! caller sees values from all resolutions and retentions at once.

use crate::datasource::LabelValuesResponse;
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::metrics::{Endpoint, log_recording_failure};
use crate::middleware::RequestId;
use axum::{
    Extension,
    extract::{Path, State},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};

/// Merge label values from every datasource
///
/// Always answers 200 with `status: "success"`; failing backends only
/// shrink the list.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(name): Path<String>,
    uri: Uri,
) -> AppResult<Response> {
    log_recording_failure(
        state.metrics().record_request(Endpoint::LabelValues),
        "record_request",
    );

    let values = state
        .label_values()
        .aggregate(state.datasources(), uri.path(), uri.query())
        .await;

    tracing::info!(
        request_id = %request_id,
        endpoint = Endpoint::LabelValues.as_str(),
        label = %name,
        datasources = state.datasources().len(),
        values = values.len(),
        "Merged label values"
    );

    let mut body = serde_json::to_string(&LabelValuesResponse::success(values))
        .map_err(|e| AppError::ResponseSerialization(e.to_string()))?;
    body.push('\n');

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}
