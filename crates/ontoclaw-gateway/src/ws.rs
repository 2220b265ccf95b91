//! WebSocket connection handling
//!
//! One connection may drive any number of sessions; every request names its
//! session. Requests on a connection are answered in order.

use crate::auth::ResolvedAuth;
use crate::rpc::{self, ConnectionContext};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use ontoclaw_agent::{SessionRegistry, TaskExecutor};
use ontoclaw_core::{EventMessage, IncomingMessage, OntoclawConfig, RpcResponse};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared state for WebSocket connections.
pub struct WsState {
    pub auth: ResolvedAuth,
    pub sessions: Arc<SessionRegistry>,
    pub executor: Arc<TaskExecutor>,
    pub config: OntoclawConfig,
    /// When the gateway started.
    pub started_at: std::time::Instant,
}

impl WsState {
    pub fn new(config: OntoclawConfig, executor: TaskExecutor) -> Self {
        Self {
            auth: ResolvedAuth::from_config(&config.gateway.auth),
            sessions: Arc::new(SessionRegistry::new()),
            executor: Arc::new(executor),
            config,
            started_at: std::time::Instant::now(),
        }
    }
}

pub async fn handle_connection(socket: WebSocket, state: Arc<WsState>) {
    let conn = Uuid::new_v4();
    let (mut ws_tx, mut ws_rx) = socket.split();
    info!(%conn, "Client connected");

    let info_event = EventMessage::info(env!("CARGO_PKG_VERSION"));
    if let Ok(json) = serde_json::to_string(&info_event) {
        let _ = ws_tx.send(WsMessage::Text(json)).await;
    }

    let mut authenticated = state.auth.open();

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => {
                for response in handle_text_message(&text, &state, &mut authenticated).await {
                    if ws_tx.send(WsMessage::Text(response)).await.is_err() {
                        return;
                    }
                }
            }
            Ok(WsMessage::Ping(_)) => {
                if let Ok(json) = serde_json::to_string(&EventMessage::pong()) {
                    let _ = ws_tx.send(WsMessage::Text(json)).await;
                }
            }
            Ok(WsMessage::Close(_)) => break,
            Err(e) => {
                warn!(%conn, error = %e, "WebSocket error");
                return;
            }
            _ => {}
        }
    }
    info!(%conn, "Client disconnected");
}

/// Handle a text message. Returns JSON strings to send back to the client.
pub async fn handle_text_message(
    text: &str,
    state: &Arc<WsState>,
    authenticated: &mut bool,
) -> Vec<String> {
    let mut responses = Vec::new();

    match serde_json::from_str::<IncomingMessage>(text) {
        Ok(IncomingMessage::Rpc(req)) => {
            if req.method == "auth" {
                let resp = match state.auth.verify_token(req.params["token"].as_str()) {
                    Ok(()) => {
                        *authenticated = true;
                        info!("Client authenticated (RPC)");
                        RpcResponse::ok(&req.id, serde_json::json!({ "ok": true }))
                    }
                    Err(e) => {
                        warn!("Auth failed: {}", e);
                        RpcResponse::auth_error(&req.id, e.to_string())
                    }
                };
                if let Ok(json) = serde_json::to_string(&resp) {
                    responses.push(json);
                }
                return responses;
            }

            debug!(id = %req.id, method = %req.method, "RPC request");
            let ctx = ConnectionContext {
                authenticated: *authenticated,
                state: state.clone(),
            };
            let result = rpc::route_rpc(&req.method, req.params, &ctx).await;
            if let Ok(json) = serde_json::to_string(&rpc::to_response(&req.id, result)) {
                responses.push(json);
            }
        }

        Ok(IncomingMessage::Auth { token }) => {
            let evt = match state.auth.verify_token(token.as_deref()) {
                Ok(()) => {
                    *authenticated = true;
                    info!("Client authenticated (shorthand)");
                    EventMessage::auth_result(true, None)
                }
                Err(e) => {
                    warn!("Auth failed: {}", e);
                    EventMessage::auth_result(false, Some(&e.to_string()))
                }
            };
            if let Ok(json) = serde_json::to_string(&evt) {
                responses.push(json);
            }
        }

        Err(_) => {
            warn!("Unparseable message: {}", text.chars().take(100).collect::<String>());
        }
    }

    responses
}
