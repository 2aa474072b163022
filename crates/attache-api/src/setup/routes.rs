//! Route configuration and setup

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

const CALLBACK_PATH: &str = "/lambda/callback";
const MAX_CONCURRENT_REQUESTS: usize = 512;

/// Build the application router.
///
/// The callback route accepts both `PUT` and `POST`; the remote function signs
/// its request as `PUT` whatever method it ends up sending.
pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            CALLBACK_PATH,
            put(handlers::callback::lambda_callback).post(handlers::callback::lambda_callback),
        )
        .route("/lambda/dispatch", post(handlers::dispatch::enqueue_dispatch))
        .route("/lambda/functions", get(handlers::functions::list_functions))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
