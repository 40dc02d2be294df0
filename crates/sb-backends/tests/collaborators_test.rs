//! Mission dispatch and event emission against mock collaborators.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use sb_backends::dispatch::{DispatchError, MissionDispatcher};
use sb_backends::events::EventEmitter;
use sb_core::types::{AgentEvent, BackendKind, DispatchRequest};
use serde_json::{json, Value};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn request(title: &str) -> DispatchRequest {
    DispatchRequest {
        title: title.to_string(),
        description: Some("from the dashboard".to_string()),
        backend: BackendKind::Kanban,
    }
}

// ===========================================================================
// Dispatch
// ===========================================================================

#[tokio::test]
async fn dispatch_forwards_body_and_reads_mission_id() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let app = Router::new()
        .route(
            "/api/missions",
            post(|State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(body);
                (StatusCode::CREATED, Json(json!({"data": {"id": "m-42"}})))
            }),
        )
        .with_state(seen.clone());
    let base = serve(app).await;

    let outcome = MissionDispatcher::new(&base, reqwest::Client::new())
        .dispatch(&request("Refactor parser"))
        .await
        .unwrap();

    assert_eq!(outcome.status, 201);
    assert_eq!(outcome.mission_id.as_deref(), Some("m-42"));

    let bodies = seen.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["title"], "Refactor parser");
    assert_eq!(bodies[0]["backend"], "kanban");
    assert_eq!(bodies[0]["description"], "from the dashboard");
}

#[tokio::test]
async fn dispatch_reports_rejection_without_retry() {
    let calls: Arc<Mutex<u32>> = Arc::default();
    let app = Router::new()
        .route(
            "/api/missions",
            post(|State(calls): State<Arc<Mutex<u32>>>| async move {
                *calls.lock().unwrap() += 1;
                (StatusCode::BAD_GATEWAY, "upstream down")
            }),
        )
        .with_state(calls.clone());
    let base = serve(app).await;

    let err = MissionDispatcher::new(&base, reqwest::Client::new())
        .dispatch(&request("Anything"))
        .await
        .unwrap_err();

    match err {
        DispatchError::Rejected { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "upstream down");
        }
        other => panic!("Expected Rejected, got: {other}"),
    }
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn dispatch_rejects_blank_title_locally() {
    let dispatcher = MissionDispatcher::new("http://127.0.0.1:9", reqwest::Client::new());
    let err = dispatcher.dispatch(&request("   ")).await.unwrap_err();
    assert!(matches!(err, DispatchError::EmptyTitle));
}

#[tokio::test]
async fn dispatch_tolerates_body_without_id() {
    let app = Router::new().route("/api/missions", post(|| async { StatusCode::ACCEPTED }));
    let base = serve(app).await;

    let outcome = MissionDispatcher::new(&base, reqwest::Client::new())
        .dispatch(&request("Quiet service"))
        .await
        .unwrap();
    assert_eq!(outcome.status, 202);
    assert!(outcome.mission_id.is_none());
}

// ===========================================================================
// Events
// ===========================================================================

#[tokio::test]
async fn emitted_event_reaches_sink() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let app = Router::new()
        .route(
            "/api/events",
            post(|State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(body);
                StatusCode::NO_CONTENT
            }),
        )
        .with_state(seen.clone());
    let base = serve(app).await;

    let emitter = EventEmitter::new(Some(&base), reqwest::Client::new());
    assert!(emitter.is_enabled());

    let event = AgentEvent::new("agents.snapshot", "sb-cli", json!({"total": 2})).with_context("c-1");
    emitter.emit(event).expect("enabled emitter spawns").await.unwrap();

    let bodies = seen.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["type"], "agents.snapshot");
    assert_eq!(bodies[0]["source"], "sb-cli");
    assert_eq!(bodies[0]["context_id"], "c-1");
    assert_eq!(bodies[0]["payload"]["total"], 2);
}

#[tokio::test]
async fn failed_emission_is_swallowed() {
    let emitter = EventEmitter::new(Some("http://127.0.0.1:9"), reqwest::Client::new());
    let handle = emitter
        .emit(AgentEvent::new("x", "test", json!(null)))
        .unwrap();
    // The task completes normally even though the sink is unreachable.
    handle.await.unwrap();
}

#[tokio::test]
async fn disabled_emitter_does_nothing() {
    let emitter = EventEmitter::disabled();
    assert!(!emitter.is_enabled());
    assert!(emitter.emit(AgentEvent::new("x", "test", json!({}))).is_none());
}
