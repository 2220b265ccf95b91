//! RPC router: dispatches JSON-RPC method calls to handlers
//!
//! Methods that run a cycle (`chat.send`, `ui.callback`, `ontology.load`,
//! `document.add`) answer with the turns appended and the UI specs now
//! pending. Returned radios count as rendered, so their default option is
//! published as the selection straight away.

use crate::ws::WsState;
use ontoclaw_agent::{SessionKey, SharedSession, TurnOutcome};
use ontoclaw_core::{codes, Error, RpcResponse, UiElement, UiSpec};
use ontoclaw_graph::OntologyFormat;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Connection context passed to RPC handlers.
pub struct ConnectionContext {
    pub authenticated: bool,
    pub state: Arc<WsState>,
}

/// Result type for RPC handlers.
pub type RpcResult = Result<Value, (i32, String)>;

pub async fn route_rpc(method: &str, params: Value, ctx: &ConnectionContext) -> RpcResult {
    if !ctx.authenticated && method != "health" {
        return Err((codes::AUTH, "Not authenticated".to_string()));
    }

    match method {
        "chat.send" => handle_chat_send(params, ctx).await,
        "ui.select" => handle_ui_select(params, ctx).await,
        "ui.callback" => handle_ui_callback(params, ctx).await,
        "ontology.load" => handle_ontology_load(params, ctx).await,
        "document.add" => handle_document_add(params, ctx).await,
        "session.state" => handle_session_state(params, ctx).await,
        "sessions.list" => handle_sessions_list(ctx),
        "sessions.delete" => handle_sessions_delete(params, ctx),
        "health" => handle_health(ctx),
        _ => Err(Error::MethodNotFound(method.to_string()).into()),
    }
}

/// Convert an RPC result to an RpcResponse.
pub fn to_response(id: &str, result: RpcResult) -> RpcResponse {
    match result {
        Ok(value) => RpcResponse::ok(id, value),
        Err((code, message)) => RpcResponse::err(id, code, message),
    }
}

fn required_str<'a>(params: &'a Value, name: &str) -> Result<&'a str, (i32, String)> {
    params[name]
        .as_str()
        .ok_or_else(|| (codes::INVALID_PARAMS, format!("Missing required param: {}", name)))
}

fn session_key(params: &Value) -> Result<SessionKey, (i32, String)> {
    required_str(params, "session").map(SessionKey::new)
}

fn existing_session(ctx: &ConnectionContext, key: &SessionKey) -> Result<SharedSession, (i32, String)> {
    ctx.state
        .sessions
        .get(key)
        .ok_or_else(|| Error::SessionNotFound(key.to_string()).into())
}

fn outcome_json(outcome: &TurnOutcome) -> RpcResult {
    serde_json::to_value(outcome).map_err(|e| Error::Internal(e.to_string()).into())
}

fn format_param(params: &Value) -> Result<Option<OntologyFormat>, (i32, String)> {
    params["format"]
        .as_str()
        .map(|f| f.parse().map_err(|e: ontoclaw_graph::GraphError| (codes::INVALID_PARAMS, e.to_string())))
        .transpose()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// chat.send
// ---------------------------------------------------------------------------

async fn handle_chat_send(params: Value, ctx: &ConnectionContext) -> RpcResult {
    let key = session_key(&params)?;
    let message = required_str(&params, "message")?;
    info!(session = %key, "chat.send: {}", message.chars().take(50).collect::<String>());

    let shared = ctx.state.sessions.get_or_create(&key);
    let mut session = shared.lock().await;
    let outcome = ctx.state.executor.handle_user_input(&mut session, message).await;
    session.publish_defaults();
    outcome_json(&outcome)
}

// ---------------------------------------------------------------------------
// ui.select / ui.callback
// ---------------------------------------------------------------------------

async fn handle_ui_select(params: Value, ctx: &ConnectionContext) -> RpcResult {
    let key = session_key(&params)?;
    let widget = required_str(&params, "key")?;
    let shared = existing_session(ctx, &key)?;
    let mut session = shared.lock().await;

    let selected = if let Some(index) = params["index"].as_u64() {
        session.select_index(widget, index as usize)
    } else if !params["value"].is_null() {
        let value = params["value"].clone();
        session.select(widget, value.clone()).map(|()| value)
    } else {
        return Err((
            codes::INVALID_PARAMS,
            "Missing required param: value or index".to_string(),
        ));
    };
    selected
        .map(|value| json!({ "ok": true, "key": widget, "value": value }))
        .map_err(Into::into)
}

/// `{session, element_id, data?, spec?}`. A widget that is no longer pending
/// can still be reported by sending back the `spec` the client rendered; the
/// executor then decides whether the stale interaction means anything.
async fn handle_ui_callback(params: Value, ctx: &ConnectionContext) -> RpcResult {
    let key = session_key(&params)?;
    let element_id = required_str(&params, "element_id")?;
    let data = params["data"].as_object().cloned().unwrap_or_default();
    let shared = existing_session(ctx, &key)?;
    let mut session = shared.lock().await;

    let pending = session
        .pending_ui()
        .iter()
        .find(|s| s.id() == element_id)
        .cloned();
    let spec = match (pending, params.get("spec")) {
        (Some(spec), _) => spec,
        (None, Some(raw)) if !raw.is_null() => {
            let spec = UiSpec::from_value(raw.clone())?;
            if spec.id() != element_id {
                return Err((
                    codes::INVALID_PARAMS,
                    format!("spec id {} does not match element_id {}", spec.id(), element_id),
                ));
            }
            debug!(session = %key, element = %element_id, "Callback for a widget no longer pending");
            spec
        }
        _ => {
            return Err((
                codes::NOT_FOUND,
                format!("No pending widget: {}", element_id),
            ))
        }
    };
    let event = match spec.element {
        UiElement::Form { .. } => spec.submit(data),
        _ => spec.click(),
    }?;

    let outcome = ctx.state.executor.handle_callback(&mut session, event).await;
    session.publish_defaults();
    outcome_json(&outcome)
}

// ---------------------------------------------------------------------------
// ontology.load / document.add
// ---------------------------------------------------------------------------

/// `{session, path, format?}` reads a file on the gateway host;
/// `{session, name, content, format?}` loads inline text.
async fn handle_ontology_load(params: Value, ctx: &ConnectionContext) -> RpcResult {
    let key = session_key(&params)?;
    let format = format_param(&params)?;
    let shared = ctx.state.sessions.get_or_create(&key);
    let mut session = shared.lock().await;

    let outcome = match params["content"].as_str() {
        Some(content) => {
            let name = params["name"].as_str().unwrap_or("ontology.ttl");
            ctx.state
                .executor
                .load_ontology_text(&mut session, name, content, format)
        }
        None => {
            let path = ctx.state.config.resolve_path(required_str(&params, "path")?);
            ctx.state.executor.load_ontology(&mut session, &path, format)
        }
    };
    outcome_json(&outcome)
}

/// `{session, name, content}` or `{session, path}`.
async fn handle_document_add(params: Value, ctx: &ConnectionContext) -> RpcResult {
    let key = session_key(&params)?;
    let (name, content) = match params["content"].as_str() {
        Some(content) => (required_str(&params, "name")?.to_string(), content.to_string()),
        None => {
            let path = ctx.state.config.resolve_path(required_str(&params, "path")?);
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                (
                    codes::INVALID_PARAMS,
                    format!("Cannot read {}: {}", path.display(), e),
                )
            })?;
            (file_name(&path), content)
        }
    };

    let shared = ctx.state.sessions.get_or_create(&key);
    let mut session = shared.lock().await;
    let outcome = ctx.state.executor.add_document(&mut session, &name, &content);
    outcome_json(&outcome)
}

// ---------------------------------------------------------------------------
// session.state / sessions.list / sessions.delete
// ---------------------------------------------------------------------------

async fn handle_session_state(params: Value, ctx: &ConnectionContext) -> RpcResult {
    let key = session_key(&params)?;
    let shared = existing_session(ctx, &key)?;
    let session = shared.lock().await;
    Ok(json!({
        "state": session.state(),
        "history": session.history(),
    }))
}

fn handle_sessions_list(ctx: &ConnectionContext) -> RpcResult {
    let sessions: Vec<String> = ctx
        .state
        .sessions
        .list()
        .into_iter()
        .map(|k| k.as_str().to_string())
        .collect();
    Ok(json!({ "sessions": sessions }))
}

fn handle_sessions_delete(params: Value, ctx: &ConnectionContext) -> RpcResult {
    let key = session_key(&params)?;
    match ctx.state.sessions.remove(&key) {
        Some(_) => Ok(json!({ "ok": true })),
        None => Err(Error::SessionNotFound(key.to_string()).into()),
    }
}

// ---------------------------------------------------------------------------
// health
// ---------------------------------------------------------------------------

fn handle_health(ctx: &ConnectionContext) -> RpcResult {
    Ok(health_json(&ctx.state))
}

pub fn health_json(state: &WsState) -> Value {
    json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    })
}
