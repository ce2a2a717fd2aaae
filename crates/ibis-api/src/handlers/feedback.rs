use axum::{extract::State, Json};
use ibis_observability::LogSeverity;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::middleware::logging::record_run_id;
use crate::schema::{Feedback, StatusResponse};
use crate::state::AppState;

/// Collect and log feedback for a run
#[utoipa::path(
    post,
    path = "/feedback",
    request_body = Feedback,
    responses(
        (status = 200, description = "Feedback recorded", body = StatusResponse),
        (status = 422, description = "Malformed feedback")
    ),
    tag = "feedback"
)]
pub async fn collect_feedback(
    State(state): State<Arc<AppState>>,
    Json(feedback): Json<Feedback>,
) -> ApiResult<Json<StatusResponse>> {
    record_run_id(&feedback.run_id);
    tracing::info!(score = %feedback.score, "Feedback received");

    state
        .feedback_log
        .write_struct(feedback.into_record(), LogSeverity::Info)
        .await
        .map_err(|e| ApiError::Feedback(e.to_string()))?;

    Ok(Json(StatusResponse {
        status: "success".to_string(),
    }))
}
