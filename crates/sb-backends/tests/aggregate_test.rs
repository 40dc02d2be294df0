//! Fan-out behaviour of the aggregation engine.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::{Json, Router};
use sb_backends::actions::ActionsAdapter;
use sb_backends::fleet::FleetAdapter;
use sb_backends::kanban::KanbanAdapter;
use sb_backends::{aggregate, AdapterBinding, AggregationEngine, BackendHttp, BackendTarget};
use sb_core::types::{BackendKind, CanonicalStatus};
use serde_json::json;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn healthy_kanban() -> Router {
    Router::new().route(
        "/api/kanban/tasks",
        get(|| async {
            Json(json!({"data": [
                {"runner": "r1", "status": "in_progress", "updated_at": "2026-06-01T00:00:00Z"},
                {"runner": "r2", "status": "done"}
            ]}))
        }),
    )
}

fn hanging_actions() -> Router {
    Router::new().route(
        "/api/agents/actions",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Json(json!({"data": {"actions": []}}))
        }),
    )
}

#[tokio::test]
async fn slow_backend_does_not_affect_healthy_one() {
    let kanban = serve(healthy_kanban()).await;
    let actions = serve(hanging_actions()).await;

    let engine = AggregationEngine::new(BackendHttp::new(Duration::from_millis(300)))
        .with_binding(Arc::new(KanbanAdapter::new()), BackendTarget::new(kanban))
        .with_binding(Arc::new(ActionsAdapter::default()), BackendTarget::new(actions));

    let agents = engine.aggregate().await;

    let kanban_nodes: Vec<_> = agents.iter().filter(|a| a.backend == BackendKind::Kanban).collect();
    assert_eq!(kanban_nodes.len(), 2);
    assert!(kanban_nodes.iter().all(|a| a.error_message.is_none()));
    let r1 = kanban_nodes.iter().find(|a| a.id == "kanban::r1").unwrap();
    assert_eq!(r1.status, CanonicalStatus::Working);

    let actions_nodes: Vec<_> = agents.iter().filter(|a| a.backend == BackendKind::Actions).collect();
    assert_eq!(actions_nodes.len(), 1);
    assert_eq!(actions_nodes[0].id, "actions::conductor");
    assert_eq!(actions_nodes[0].status, CanonicalStatus::Error);
    assert_eq!(
        actions_nodes[0].error_message.as_deref(),
        Some("timed out after 300 ms")
    );
}

#[tokio::test]
async fn backends_are_polled_concurrently() {
    let slow = Router::new()
        .route(
            "/api/kanban/tasks",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({"data": []}))
            }),
        )
        .route(
            "/api/agents/actions",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({"data": {"actions": []}}))
            }),
        )
        .route(
            "/api/fleet/agents",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({"data": []}))
            }),
        );
    let base = serve(slow).await;
    let target = BackendTarget::new(base);

    let bindings = vec![
        AdapterBinding::new(Arc::new(KanbanAdapter::new()), target.clone()),
        AdapterBinding::new(Arc::new(ActionsAdapter::default()), target.clone()),
        AdapterBinding::new(Arc::new(FleetAdapter::new()), target),
    ];

    let started = Instant::now();
    let agents = aggregate(&BackendHttp::new(Duration::from_millis(500)), &bindings).await;
    let elapsed = started.elapsed();

    assert_eq!(agents.len(), 3);
    assert!(agents.iter().all(|a| a.is_degraded()));
    // Sequential polling would take at least 1.5s.
    assert!(elapsed < Duration::from_millis(1400), "took {elapsed:?}");
}

#[tokio::test]
async fn consecutive_cycles_have_identical_ids() {
    let kanban = serve(healthy_kanban()).await;
    let fleet = serve(Router::new().route(
        "/api/fleet/agents",
        get(|| async {
            Json(json!({"data": [
                {"name": "scout", "state": "busy"},
                {"name": "miner", "state": "idle"}
            ]}))
        }),
    ))
    .await;

    let engine = AggregationEngine::new(BackendHttp::default())
        .with_binding(Arc::new(KanbanAdapter::new()), BackendTarget::new(kanban))
        .with_binding(Arc::new(FleetAdapter::new()), BackendTarget::new(fleet));

    let first: BTreeSet<String> = engine.aggregate().await.into_iter().map(|a| a.id).collect();
    let second: BTreeSet<String> = engine.aggregate().await.into_iter().map(|a| a.id).collect();

    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[tokio::test]
async fn overlapping_cycles_are_independent() {
    let kanban = serve(healthy_kanban()).await;
    let engine = AggregationEngine::new(BackendHttp::default())
        .with_binding(Arc::new(KanbanAdapter::new()), BackendTarget::new(kanban));

    let (a, b) = tokio::join!(engine.aggregate(), engine.aggregate());
    assert_eq!(a, b);
}

#[tokio::test]
async fn same_native_id_on_two_backends_stays_distinct() {
    let kanban = serve(Router::new().route(
        "/api/kanban/tasks",
        get(|| async { Json(json!({"data": [{"runner": "alpha", "status": "done"}]})) }),
    ))
    .await;
    let fleet = serve(Router::new().route(
        "/api/fleet/agents",
        get(|| async { Json(json!({"data": [{"name": "alpha", "state": "busy"}]})) }),
    ))
    .await;

    let engine = AggregationEngine::new(BackendHttp::default())
        .with_binding(Arc::new(KanbanAdapter::new()), BackendTarget::new(kanban))
        .with_binding(Arc::new(FleetAdapter::new()), BackendTarget::new(fleet));

    let snapshot = engine.snapshot().await;
    let ids = snapshot.ids();
    assert!(ids.contains("kanban::alpha"));
    assert!(ids.contains("fleet::alpha"));
    assert_eq!(snapshot.agents.len(), 2);
}
