//! Mock PostgREST server for exercising `RestClient` over real HTTP.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bookshelf_db::Row;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const TEST_KEY: &str = "test-anon-key";

/// Mock table state shared with the server task.
#[derive(Clone, Default)]
pub struct MockRestState {
    pub rows: Arc<Mutex<Vec<Row>>>,
    /// Query strings seen by the server, in arrival order.
    pub queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl MockRestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, row: Value) {
        self.rows
            .lock()
            .unwrap()
            .push(row.as_object().cloned().unwrap());
    }

    pub fn last_query(&self) -> HashMap<String, String> {
        self.queries.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
    apikey == Some(TEST_KEY) && bearer == Some(format!("Bearer {TEST_KEY}").as_str())
}

fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Invalid API key", "hint": null})),
    )
        .into_response()
}

fn id_filter(query: &HashMap<String, String>) -> Option<String> {
    query
        .get("id")
        .and_then(|value| value.strip_prefix("eq."))
        .map(str::to_string)
}

fn has_id(row: &Row, id: &str) -> bool {
    row.get("id").and_then(Value::as_str) == Some(id)
}

/// Handler for GET /rest/v1/books
async fn select_rows(
    State(state): State<MockRestState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> axum::response::Response {
    state.queries.lock().unwrap().push(query.clone());
    if !authorized(&headers) {
        return unauthorized();
    }

    let mut rows = state.rows.lock().unwrap().clone();
    if query.get("order").map(String::as_str) == Some("created_at.desc") {
        rows.sort_by(|a, b| {
            let a = a.get("created_at").and_then(Value::as_str).unwrap_or_default();
            let b = b.get("created_at").and_then(Value::as_str).unwrap_or_default();
            b.cmp(a)
        });
    }
    Json(rows).into_response()
}

/// Handler for POST /rest/v1/books
async fn insert_rows(
    State(state): State<MockRestState>,
    headers: HeaderMap,
    Json(rows): Json<Vec<Row>>,
) -> axum::response::Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let mut created = Vec::new();
    for mut row in rows {
        let condition = row.get("condition").and_then(Value::as_str).unwrap_or_default();
        if !["excellent", "good", "fair", "poor"].contains(&condition) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "code": "23514",
                    "message": "new row for relation \"books\" violates check constraint \"books_condition_check\"",
                })),
            )
                .into_response();
        }
        row.insert("id".into(), json!(Uuid::now_v7().to_string()));
        row.insert("created_at".into(), json!("2024-05-01T10:00:00+00:00"));
        row.insert("updated_at".into(), json!("2024-05-01T10:00:00+00:00"));
        created.push(row);
    }

    state.rows.lock().unwrap().extend(created.clone());
    (StatusCode::CREATED, Json(created)).into_response()
}

/// Handler for PATCH /rest/v1/books?id=eq.{id}
async fn update_rows(
    State(state): State<MockRestState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(patch): Json<Row>,
) -> axum::response::Response {
    state.queries.lock().unwrap().push(query.clone());
    if !authorized(&headers) {
        return unauthorized();
    }

    let Some(id) = id_filter(&query) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut rows = state.rows.lock().unwrap();
    let updated: Vec<Row> = rows
        .iter_mut()
        .filter(|row| has_id(row, &id))
        .map(|row| {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            row.insert("updated_at".into(), json!("2024-06-01T09:30:00+00:00"));
            row.clone()
        })
        .collect();
    Json(updated).into_response()
}

/// Handler for DELETE /rest/v1/books?id=eq.{id}
async fn delete_rows(
    State(state): State<MockRestState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> axum::response::Response {
    state.queries.lock().unwrap().push(query.clone());
    if !authorized(&headers) {
        return unauthorized();
    }

    let Some(id) = id_filter(&query) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut rows = state.rows.lock().unwrap();
    let removed: Vec<Row> = rows.iter().filter(|row| has_id(row, &id)).cloned().collect();
    rows.retain(|row| !has_id(row, &id));
    Json(removed).into_response()
}

/// Start a mock PostgREST server
///
/// Returns the base URL and a handle to the server task
pub async fn start_mock_rest_server(state: MockRestState) -> (String, JoinHandle<()>) {
    let app = Router::new()
        .route(
            "/rest/v1/books",
            get(select_rows)
                .post(insert_rows)
                .patch(update_rows)
                .delete(delete_rows),
        )
        .route(
            "/rest/v1/broken",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "upstream connect error") }),
        )
        .with_state(state);

    // Bind to random port
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let local_addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", local_addr);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base_url, handle)
}
