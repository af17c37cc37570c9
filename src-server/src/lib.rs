pub mod config;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use parking_lot::Mutex;
use phytopulse_core::{ReplayEngine, ReplayOptions, TraceStore, init_tracing};
use serde_json::json;
use tracing::{error, info, instrument};

use crate::config::ServerConfig;

pub const PLANT_DATA_ROUTE: &str = "/api/plant-data";

/// Shared handler state. The mutex serializes cursor advancement and trace swaps.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<Mutex<ReplayEngine>>,
}

impl AppState {
    #[must_use]
    pub fn new(engine: ReplayEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(PLANT_DATA_ROUTE, get(plant_data))
        .with_state(state)
}

#[instrument(skip(state))]
async fn plant_data(State(state): State<AppState>) -> Response {
    let engine = Arc::clone(&state.engine);
    match tokio::task::spawn_blocking(move || engine.lock().next_packet_or_simulated()).await {
        Ok(packet) => (StatusCode::OK, Json(packet)).into_response(),
        Err(error) => {
            error!(%error, "plant data task failed");
            let body = json!({ "ok": false, "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let telemetry = init_tracing(&config.diagnostics.log_settings())?;

    let store = TraceStore::new(&config.data.trace_dir, &config.data.label_dir);
    let engine = ReplayEngine::open(
        store,
        ReplayOptions {
            window_size: config.replay.window_size,
            seed: None,
        },
    );
    let mode = if engine.is_simulated() {
        "simulated"
    } else {
        "replay"
    };

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        %addr,
        mode,
        traces = engine.trace_count(),
        session_id = %telemetry.session_id,
        "phytopulse server listening"
    );

    axum::serve(listener, router(AppState::new(engine)))
        .await
        .context("http server terminated")
}
