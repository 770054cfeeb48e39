//! Shared test fixtures: an in-process mock tracker speaking just enough of
//! the REST surface for the gateway, plus raw-issue JSON builders.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

/// Closed status ids in the fixture deployment (closed, rejected, cancelled).
const CLOSED_STATUS_IDS: [i64; 3] = [5, 6, 8];

#[derive(Default)]
pub struct MockTracker {
    pub issues: Vec<Value>,
    pub projects: Vec<Value>,
    /// project id -> versions
    pub versions: HashMap<i64, Vec<Value>>,
    pub users: Vec<Value>,
    /// Status code for /users.json; 403 simulates a denied listing.
    pub users_status: Option<u16>,
}

/// Spawn the mock on an ephemeral port; returns its base URL.
pub async fn spawn_tracker(tracker: MockTracker) -> String {
    let state = Arc::new(tracker);
    let app = Router::new()
        .route("/issues.json", get(issues))
        .route("/issues/:id", get(issue_detail))
        .route("/projects.json", get(projects))
        .route("/projects/:id/versions.json", get(versions))
        .route("/users.json", get(users))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock tracker");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock tracker");
    });
    format!("http://{}", addr)
}

fn is_closed(issue: &Value) -> bool {
    issue["status"]["id"]
        .as_i64()
        .map(|id| CLOSED_STATUS_IDS.contains(&id))
        .unwrap_or(false)
}

fn matches(issue: &Value, params: &HashMap<String, String>) -> bool {
    for (key, path) in [
        ("project_id", "project"),
        ("tracker_id", "tracker"),
        ("priority_id", "priority"),
        ("fixed_version_id", "fixed_version"),
    ] {
        if let Some(wanted) = params.get(key).and_then(|v| v.parse::<i64>().ok()) {
            if issue[path]["id"].as_i64() != Some(wanted) {
                return false;
            }
        }
    }
    match params.get("status_id").map(String::as_str) {
        Some("open") => !is_closed(issue),
        Some("closed") => is_closed(issue),
        Some("*") | None => true,
        Some(exact) => match exact.parse::<i64>() {
            Ok(id) => issue["status"]["id"].as_i64() == Some(id),
            Err(_) => true,
        },
    }
}

async fn issues(
    State(tracker): State<Arc<MockTracker>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let filtered: Vec<&Value> = tracker
        .issues
        .iter()
        .filter(|i| matches(i, &params))
        .collect();
    let total = filtered.len();
    let offset: usize = params
        .get("offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(25);
    let page: Vec<Value> = filtered
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    Json(json!({
        "issues": page,
        "total_count": total,
        "offset": offset,
        "limit": limit,
    }))
}

async fn issue_detail(
    State(tracker): State<Arc<MockTracker>>,
    Path(id): Path<String>,
) -> Response {
    let id: i64 = id.trim_end_matches(".json").parse().unwrap_or(-1);
    match tracker
        .issues
        .iter()
        .find(|i| i["id"].as_i64() == Some(id))
    {
        Some(issue) => Json(json!({ "issue": issue })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response(),
    }
}

async fn projects(State(tracker): State<Arc<MockTracker>>) -> Json<Value> {
    Json(json!({
        "projects": tracker.projects,
        "total_count": tracker.projects.len(),
    }))
}

async fn versions(State(tracker): State<Arc<MockTracker>>, Path(id): Path<i64>) -> Json<Value> {
    let versions = tracker.versions.get(&id).cloned().unwrap_or_default();
    Json(json!({ "versions": versions }))
}

async fn users(State(tracker): State<Arc<MockTracker>>) -> Response {
    if let Some(status) = tracker.users_status {
        if status != 200 {
            return (
                StatusCode::from_u16(status).unwrap_or(StatusCode::FORBIDDEN),
                Json(json!({"error": "denied"})),
            )
                .into_response();
        }
    }
    Json(json!({
        "users": tracker.users,
        "total_count": tracker.users.len(),
    }))
    .into_response()
}

/// A raw open issue in project 6.
pub fn raw_issue(id: i64, tracker_id: i64, tracker_name: &str) -> Value {
    json!({
        "id": id,
        "subject": format!("Issue {}", id),
        "project": {"id": 6, "name": "NCEL"},
        "tracker": {"id": tracker_id, "name": tracker_name},
        "status": {"id": 1, "name": "New"},
        "priority": {"id": 2, "name": "Normal"},
        "created_on": "2026-01-10T08:00:00Z",
        "updated_on": "2026-01-10T08:00:00Z"
    })
}

pub fn close_issue(mut issue: Value) -> Value {
    issue["status"] = json!({"id": 5, "name": "Closed"});
    issue["closed_on"] = json!("2026-01-20T08:00:00Z");
    issue
}

pub fn with_priority(mut issue: Value, id: i64, name: &str) -> Value {
    issue["priority"] = json!({"id": id, "name": name});
    issue
}

pub fn ncel_project() -> Value {
    json!({
        "id": 6,
        "identifier": "ncel",
        "name": "NCEL",
        "description": "Flagship project"
    })
}

/// The seed fixture from the gateway contract: 3 bugs (2 closed, 1 open
/// urgent) and 2 stories (1 closed).
pub fn seed_issues() -> Vec<Value> {
    vec![
        close_issue(raw_issue(1, 1, "Bug")),
        close_issue(raw_issue(2, 1, "Bug")),
        with_priority(raw_issue(3, 1, "Bug"), 4, "Urgent"),
        close_issue(raw_issue(4, 4, "Story")),
        raw_issue(5, 4, "Story"),
    ]
}
