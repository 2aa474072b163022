use attache_core::DispatchData;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DispatchAccepted {
    pub job_id: Uuid,
}

/// Queue a cached attachment for remote processing.
#[tracing::instrument(skip(state, data), fields(record = %data.record, attachment = %data.name))]
pub async fn enqueue_dispatch(
    State(state): State<Arc<AppState>>,
    ValidatedJson(data): ValidatedJson<DispatchData>,
) -> Result<(StatusCode, Json<DispatchAccepted>), HttpAppError> {
    // Reject undecodable attachments now rather than inside the worker
    data.cached_file()
        .map_err(|e| ApiError::InvalidBody(format!("attachment: {}", e)))?;

    let job_id = state.dispatch_queue.submit(data)?;
    Ok((StatusCode::ACCEPTED, Json(DispatchAccepted { job_id })))
}
