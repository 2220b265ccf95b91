//! WebSocket protocol, JSON-RPC style
//!
//! Wire format:
//!
//! Client → Server (RPC request):
//!   { "id": "req-1", "method": "chat.send", "params": { "session": "main", "message": "align 'Acme Corp'" } }
//!   { "id": "req-2", "method": "ui.select", "params": { "session": "main", "key": "radio_align_…", "index": 0 } }
//!   { "id": "req-3", "method": "ui.callback", "params": { "session": "main", "event": { "element_id": "…", "action": "button_click", "spec": { … } } } }
//!
//! Server → Client (RPC response):
//!   { "id": "req-1", "result": { "turns": [...], "ui": [...] } }
//!   { "id": "req-1", "error": { "code": -32602, "message": "Missing required param: session" } }
//!
//! Server → Client (Event push, no id):
//!   { "event": "info", "data": { "version": "0.3.0" } }
//!
//! Authentication:
//!   { "token": "secret" }  (shorthand)
//!   { "id": "1", "method": "auth", "params": { "token": "secret" } }  (RPC style)

use serde::{Deserialize, Serialize};

/// RPC request from client.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// RPC response to client.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn method_not_found(id: impl Into<String>, method: &str) -> Self {
        Self::err(id, codes::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn auth_error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::err(id, codes::AUTH, message)
    }
}

/// RPC error detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// Error codes used in [`RpcError::code`].
pub mod codes {
    pub const AUTH: i32 = -32000;
    pub const NOT_FOUND: i32 = -32001;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL: i32 = -32603;
}

/// Server-pushed event (no id, no request correlation).
#[derive(Debug, Clone, Serialize)]
pub struct EventMessage {
    pub event: String,
    pub data: serde_json::Value,
}

impl EventMessage {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Auth result event (for shorthand auth without RPC id).
    pub fn auth_result(ok: bool, error: Option<&str>) -> Self {
        Self::new("auth", serde_json::json!({ "ok": ok, "error": error }))
    }

    /// Info event (sent on connection).
    pub fn info(version: &str) -> Self {
        Self::new("info", serde_json::json!({ "version": version }))
    }

    pub fn pong() -> Self {
        Self::new("pong", serde_json::json!({}))
    }
}

/// Unified incoming message. Serde tries RPC first, then Auth shorthand.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncomingMessage {
    Rpc(RpcRequest),
    Auth { token: Option<String> },
}
