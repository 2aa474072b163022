use attache_core::FunctionDescriptor;
use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FunctionListQuery {
    /// Bypass the memoized listing
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct FunctionListResponse {
    pub functions: Vec<FunctionDescriptor>,
    pub count: usize,
}

#[tracing::instrument(skip(state))]
pub async fn list_functions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FunctionListQuery>,
) -> Result<Json<FunctionListResponse>, HttpAppError> {
    let functions = state.plugin.functions(query.force).await?;
    Ok(Json(FunctionListResponse {
        count: functions.len(),
        functions,
    }))
}
