use attache_core::{AttachmentState, RecordRef};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub record: RecordRef,
    pub name: String,
    pub state: Option<AttachmentState>,
}

/// Completion notification from the remote processing function.
///
/// A signature mismatch answers 401 with an empty body; nothing about the
/// record or the expected signature is disclosed.
#[tracing::instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn lambda_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpAppError> {
    match state.plugin.handle_callback(&headers, &body).await? {
        Some(attacher) => {
            tracing::info!(
                record = %attacher.record(),
                attachment = %attacher.name(),
                "Callback reconciled"
            );
            let response = CallbackResponse {
                record: attacher.record().clone(),
                name: attacher.name().to_string(),
                state: attacher.state(),
            };
            Ok((StatusCode::OK, Json(response)).into_response())
        }
        None => Ok(StatusCode::UNAUTHORIZED.into_response()),
    }
}
