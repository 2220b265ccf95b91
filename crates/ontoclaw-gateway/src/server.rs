//! Gateway server: WebSocket JSON-RPC plus a health endpoint

use crate::rpc::health_json;
use crate::ws::{handle_connection, WsState};
use ontoclaw_agent::TaskExecutor;
use ontoclaw_core::OntoclawConfig;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

pub fn router(state: Arc<WsState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

pub async fn start_gateway(config: OntoclawConfig, executor: TaskExecutor) -> anyhow::Result<()> {
    let bind_addr: SocketAddr = format!("{}:{}", config.gateway.bind.to_addr(), config.gateway.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {}", e))?;

    let state = Arc::new(WsState::new(config, executor));
    if state.auth.locked_out() {
        warn!("Token auth is on but no token is configured; every client will be rejected");
    }

    info!("Ontoclaw Gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  WebSocket: ws://{}/ws", bind_addr);
    info!("  Auth mode: {:?}", state.config.gateway.auth.mode);
    if let Some(ws) = &state.config.workspace {
        info!("  Workspace: {}", ws.display());
    }

    if let Some(minutes) = state.config.gateway.session_idle_minutes {
        info!("  Idle sessions dropped after: {} min", minutes);
        tokio::spawn(evict_idle_sessions(state.clone(), minutes));
    }

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn evict_idle_sessions(state: Arc<WsState>, minutes: u64) {
    let max_idle = chrono::Duration::minutes(minutes as i64);
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
    loop {
        ticker.tick().await;
        state.sessions.evict_idle(max_idle);
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn health_handler(State(state): State<Arc<WsState>>) -> impl IntoResponse {
    Json(health_json(&state))
}
