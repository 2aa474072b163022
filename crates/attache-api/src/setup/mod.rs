//! Application setup and initialization

pub mod hook;
pub mod routes;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use attache_db::{InMemoryRecordRepository, PgRecordRepository, RecordRepository};
use attache_lambda::LambdaPlugin;
use axum::Router;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;
use crate::job_queue::DispatchQueue;
use crate::state::AppState;
use crate::telemetry;
use hook::ConfiguredHook;

/// Initialize the application: telemetry, persistence, the Lambda plugin and routes.
pub async fn initialize_app(config: AppConfig) -> Result<(Arc<AppState>, Router)> {
    telemetry::init_telemetry();

    tracing::info!("Starting attache API server");

    let repository = setup_repository(&config).await?;
    let hook = Arc::new(ConfiguredHook::new(
        config.processing_function.clone(),
        config.processing_versions.clone(),
    ));

    let plugin = LambdaPlugin::with_aws(config.lambda.clone(), config.storages(), hook, repository)
        .await
        .context("Failed to configure Lambda plugin")?;

    let dispatch_queue = DispatchQueue::new(
        plugin.clone(),
        config.dispatch_queue_size,
        config.dispatch_max_concurrent,
    );

    let state = Arc::new(AppState::new(plugin, dispatch_queue));
    let router = routes::build_router(state.clone(), config.max_body_bytes);

    Ok((state, router))
}

async fn setup_repository(config: &AppConfig) -> Result<Arc<dyn RecordRepository>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, records are kept in memory");
        return Ok(Arc::new(InMemoryRecordRepository::new()));
    };

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected successfully"
    );

    let repository = config
        .record_tables
        .iter()
        .fold(PgRecordRepository::new(pool), |repo, (record_type, table)| {
            repo.with_table(record_type, table)
        });
    Ok(Arc::new(repository))
}
