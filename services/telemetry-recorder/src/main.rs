mod app;
mod config;
mod error;
mod handlers;
mod lambda;
mod models;
mod normalize;
mod record;
mod recorder;
mod state;
mod store;

use devicedata_common::{bind_listener, init_tracing, shutdown_signal};
use std::sync::Arc;

use crate::config::{RecorderConfig, StoreBackend};
use crate::recorder::Recorder;
use crate::state::AppState;
use crate::store::{DynamoStore, MemoryStore, TelemetryStore};

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    let _guards = init_tracing("telemetry-recorder");

    let config = RecorderConfig::from_env();
    // One store handle per process, shared by every invocation.
    let store = build_store(&config).await;
    tracing::info!(store = %store.describe(), backend = %config.store, "telemetry store ready");
    if !config.store.is_durable() {
        tracing::warn!(
            backend = %config.store,
            "records are held in process memory without bound; local runs and tests only"
        );
    }
    let recorder = Recorder::new(store);

    if config.lambda {
        return lambda::run(recorder).await;
    }

    let app = app::build_router(AppState::new(recorder));
    let listener = bind_listener(config.port).await?;
    tracing::info!(port = config.port, "serving telemetry recorder over http");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn build_store(config: &RecorderConfig) -> Arc<dyn TelemetryStore> {
    match config.store {
        StoreBackend::DynamoDb => {
            Arc::new(DynamoStore::new(config.table.clone(), config.endpoint.clone()).await)
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    }
}
