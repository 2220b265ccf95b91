//! Tests for ontoclaw-gateway: RPC routing, authentication, and the terminal surface

use ontoclaw_agent::{ExecutorConfig, SessionKey, TaskExecutor};
use ontoclaw_core::{codes, AuthMode, OntoclawConfig};
use ontoclaw_gateway::rpc::{route_rpc, ConnectionContext};
use ontoclaw_gateway::ws::handle_text_message;
use ontoclaw_gateway::{Terminal, WsState};
use ontoclaw_llm::{PlaceholderLlm, RuleResolver};
use serde_json::{json, Value};
use std::sync::Arc;

const ONTOLOGY: &str = r#"
@prefix ex: <http://ex.org/> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

ex:Company a owl:Class ; rdfs:label "Company" .
ex:Acme a owl:NamedIndividual, ex:Company ; rdfs:label "Acme" .
"#;

// ===========================================================================
// Helpers
// ===========================================================================

fn executor() -> TaskExecutor {
    TaskExecutor::new(
        Arc::new(RuleResolver::new()),
        Arc::new(PlaceholderLlm::new()),
        ExecutorConfig::default(),
    )
}

fn state(mode: AuthMode, token: Option<&str>) -> Arc<WsState> {
    let mut config = OntoclawConfig::default();
    config.gateway.auth.mode = mode;
    config.gateway.auth.token = token.map(String::from);
    Arc::new(WsState::new(config, executor()))
}

fn open_ctx() -> ConnectionContext {
    ConnectionContext {
        authenticated: true,
        state: state(AuthMode::None, None),
    }
}

async fn call(ctx: &ConnectionContext, method: &str, params: Value) -> Value {
    match route_rpc(method, params, ctx).await {
        Ok(v) => v,
        Err((code, msg)) => panic!("{} failed ({}): {}", method, code, msg),
    }
}

fn contents(outcome: &Value) -> Vec<String> {
    outcome["turns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["content"].as_str().unwrap().to_string())
        .collect()
}

fn widget<'a>(outcome: &'a Value, kind: &str) -> Option<&'a Value> {
    outcome["ui"].as_array().unwrap().iter().find(|u| u["type"] == kind)
}

// ===========================================================================
// Authentication
// ===========================================================================

#[tokio::test]
async fn unauthenticated_calls_are_rejected() {
    let ctx = ConnectionContext {
        authenticated: false,
        state: state(AuthMode::Token, Some("secret")),
    };
    let err = route_rpc("chat.send", json!({"session": "s", "message": "hi"}), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.0, codes::AUTH);

    let health = route_rpc("health", json!({}), &ctx).await.unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn rpc_auth_then_call() {
    let st = state(AuthMode::Token, Some("secret"));
    let mut authed = false;

    let bad = handle_text_message(
        r#"{"id":"1","method":"auth","params":{"token":"wrong"}}"#,
        &st,
        &mut authed,
    )
    .await;
    let bad: Value = serde_json::from_str(&bad[0]).unwrap();
    assert_eq!(bad["error"]["code"], codes::AUTH);
    assert!(!authed);

    let ok = handle_text_message(
        r#"{"id":"2","method":"auth","params":{"token":"secret"}}"#,
        &st,
        &mut authed,
    )
    .await;
    let ok: Value = serde_json::from_str(&ok[0]).unwrap();
    assert_eq!(ok["result"]["ok"], true);
    assert!(authed);

    let resp = handle_text_message(
        r#"{"id":"3","method":"chat.send","params":{"session":"s","message":"hello"}}"#,
        &st,
        &mut authed,
    )
    .await;
    let resp: Value = serde_json::from_str(&resp[0]).unwrap();
    assert_eq!(resp["id"], "3");
    assert!(resp["result"]["turns"].as_array().unwrap().len() >= 2);
}

#[tokio::test]
async fn shorthand_auth() {
    let st = state(AuthMode::Token, Some("secret"));
    let mut authed = false;
    let out = handle_text_message(r#"{"token":"secret"}"#, &st, &mut authed).await;
    let evt: Value = serde_json::from_str(&out[0]).unwrap();
    assert_eq!(evt["event"], "auth");
    assert_eq!(evt["data"]["ok"], true);
    assert!(authed);
}

#[tokio::test]
async fn garbage_gets_no_reply() {
    let st = state(AuthMode::None, None);
    let mut authed = true;
    assert!(handle_text_message("not json", &st, &mut authed).await.is_empty());
}

// ===========================================================================
// Sessions
// ===========================================================================

#[tokio::test]
async fn chat_creates_session_and_lists_it() {
    let ctx = open_ctx();
    let out = call(&ctx, "chat.send", json!({"session": "b", "message": "help"})).await;
    assert_eq!(out["reset"], false);
    assert_eq!(contents(&out)[0], "help");
    call(&ctx, "chat.send", json!({"session": "a", "message": "hello"})).await;

    let list = call(&ctx, "sessions.list", json!({})).await;
    assert_eq!(list["sessions"], json!(["a", "b"]));

    let state = call(&ctx, "session.state", json!({"session": "a"})).await;
    assert_eq!(state["state"]["key"], "a");
    assert!(state["history"].as_array().unwrap().len() >= 3);

    call(&ctx, "sessions.delete", json!({"session": "a"})).await;
    let err = route_rpc("session.state", json!({"session": "a"}), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.0, codes::NOT_FOUND);
}

#[tokio::test]
async fn missing_params_and_unknown_methods() {
    let ctx = open_ctx();
    let err = route_rpc("chat.send", json!({"session": "s"}), &ctx).await.unwrap_err();
    assert_eq!(err.0, codes::INVALID_PARAMS);
    let err = route_rpc("nope", json!({}), &ctx).await.unwrap_err();
    assert_eq!(err.0, codes::METHOD_NOT_FOUND);
    let err = route_rpc(
        "ontology.load",
        json!({"session": "s", "content": ONTOLOGY, "format": "yaml"}),
        &ctx,
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, codes::INVALID_PARAMS);
}

// ===========================================================================
// Loading and widgets
// ===========================================================================

#[tokio::test]
async fn inline_ontology_and_document() {
    let ctx = open_ctx();
    let out = call(
        &ctx,
        "ontology.load",
        json!({"session": "s", "name": "company.ttl", "content": ONTOLOGY}),
    )
    .await;
    assert!(widget(&out, "info").is_some());

    let out = call(
        &ctx,
        "document.add",
        json!({"session": "s", "name": "memo.txt", "content": "Acme Corp hired Bob."}),
    )
    .await;
    assert!(contents(&out)[0].contains("memo.txt"));

    let state = call(&ctx, "session.state", json!({"session": "s"})).await;
    assert_eq!(state["state"]["ontology_loaded"], true);
    assert_eq!(state["state"]["documents"], json!(["memo.txt"]));
}

#[tokio::test]
async fn document_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "Alice works at Acme.").unwrap();

    let ctx = open_ctx();
    call(
        &ctx,
        "document.add",
        json!({"session": "s", "path": path.to_str().unwrap()}),
    )
    .await;
    let state = call(&ctx, "session.state", json!({"session": "s"})).await;
    assert_eq!(state["state"]["documents"], json!(["notes.txt"]));

    let err = route_rpc(
        "document.add",
        json!({"session": "s", "path": dir.path().join("absent.txt").to_str().unwrap()}),
        &ctx,
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, codes::INVALID_PARAMS);
}

#[tokio::test]
async fn alignment_round_trip_over_rpc() {
    let ctx = open_ctx();
    call(
        &ctx,
        "ontology.load",
        json!({"session": "s", "name": "company.ttl", "content": ONTOLOGY}),
    )
    .await;
    let out = call(&ctx, "chat.send", json!({"session": "s", "message": "align 'Acme Corp'"})).await;

    let radio = widget(&out, "radio").unwrap();
    let radio_id = radio["id"].as_str().unwrap();
    let button = widget(&out, "button").unwrap();
    let button_id = button["id"].as_str().unwrap();

    // The default was published when the outcome was returned.
    let state = call(&ctx, "session.state", json!({"session": "s"})).await;
    assert_eq!(state["state"]["selections"][radio_id], "http://ex.org/Acme");

    let sel = call(
        &ctx,
        "ui.select",
        json!({"session": "s", "key": radio_id, "value": "no_match"}),
    )
    .await;
    assert_eq!(sel["value"], "no_match");

    let out = call(
        &ctx,
        "ui.callback",
        json!({"session": "s", "element_id": button_id}),
    )
    .await;
    assert!(contents(&out).iter().any(|c| c.starts_with("Understood.")));
}

#[tokio::test]
async fn select_rejects_unknown_option() {
    let ctx = open_ctx();
    call(
        &ctx,
        "ontology.load",
        json!({"session": "s", "name": "company.ttl", "content": ONTOLOGY}),
    )
    .await;
    let out = call(&ctx, "chat.send", json!({"session": "s", "message": "align 'Acme'"})).await;
    let radio_id = widget(&out, "radio").unwrap()["id"].as_str().unwrap().to_string();

    let err = route_rpc(
        "ui.select",
        json!({"session": "s", "key": radio_id, "index": 99}),
        &ctx,
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, codes::INVALID_PARAMS);

    let err = route_rpc(
        "ui.callback",
        json!({"session": "s", "element_id": "button_gone"}),
        &ctx,
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, codes::NOT_FOUND);
}

#[tokio::test]
async fn stale_confirm_with_spec_reaches_the_executor() {
    let ctx = open_ctx();
    call(
        &ctx,
        "ontology.load",
        json!({"session": "s", "name": "company.ttl", "content": ONTOLOGY}),
    )
    .await;
    let out = call(&ctx, "chat.send", json!({"session": "s", "message": "align 'Acme Corp'"})).await;
    let button = widget(&out, "button").unwrap().clone();
    let button_id = button["id"].as_str().unwrap().to_string();
    call(&ctx, "chat.send", json!({"session": "s", "message": "hello"})).await;

    let out = call(
        &ctx,
        "ui.callback",
        json!({"session": "s", "element_id": button_id, "spec": button}),
    )
    .await;
    assert_eq!(widget(&out, "error").unwrap()["text"], "Alignment confirmation failed.");
    assert!(contents(&out).iter().any(|c| c.contains("missing selection or context")));

    let err = route_rpc(
        "ui.callback",
        json!({"session": "s", "element_id": "button_other", "spec": button}),
        &ctx,
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, codes::INVALID_PARAMS);
}

// ===========================================================================
// Terminal
// ===========================================================================

fn terminal() -> Terminal {
    Terminal::new(
        Arc::new(executor()),
        SessionKey::new("local"),
        OntoclawConfig::default(),
    )
}

#[tokio::test]
async fn terminal_load_and_align() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("company.ttl");
    std::fs::write(&path, ONTOLOGY).unwrap();

    let mut term = terminal();
    assert!(term.banner().contains("/load"));

    let out = term
        .handle_line(&format!("/load \"{}\"", path.display()))
        .await
        .unwrap();
    assert!(out.contains("[info] Ontology 'company.ttl' loaded."));
    assert!(term.session().ontology_loaded());

    let out = term.handle_line("align 'Acme Corp'").await.unwrap();
    assert!(out.contains("[1] Select match for 'Acme Corp':"));
    assert!(out.contains("(*) 1. Acme"));

    let out = term.handle_line("/select 1 2").await.unwrap();
    assert!(out.contains("no_match"));

    let out = term.handle_line("/click 2").await.unwrap();
    assert!(out.contains("Understood."));
    assert!(term.session().last_alignment_suggestion.is_none());
}

#[tokio::test]
async fn terminal_doc_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memo.txt");
    std::fs::write(&path, "Bob joined Initech.").unwrap();

    let mut term = terminal();
    let out = term
        .handle_line(&format!("/doc \"{}\" memo", path.display()))
        .await
        .unwrap();
    assert!(out.contains("Document 'memo' added"));
    assert!(term.session().documents.contains_key("memo"));

    let out = term.handle_line("/click 7").await.unwrap();
    assert!(out.contains("[error] no widget [7]"));
    let out = term.handle_line("/load x.ttl yaml").await.unwrap();
    assert!(out.contains("[error]"));
    assert!(term.handle_line("/quit").await.is_none());
}
