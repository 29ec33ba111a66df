//! HTTP table client for PostgREST-style hosted databases.
//!
//! Every request carries the access key both as the `apikey` header and as a
//! bearer token, and asks for `return=representation` so writes echo the
//! affected rows back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::Deserialize;

use crate::client::{Order, Row, TableClient};
use crate::error::{StorageError, StorageResult};

const REST_PATH: &str = "rest/v1";

/// Table client that speaks the PostgREST dialect over HTTP.
#[derive(Clone)]
pub struct RestClient {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

/// Error body returned by PostgREST on non-success statuses.
#[derive(Debug, Deserialize)]
struct RestErrorBody {
    message: Option<String>,
}

impl RestClient {
    /// Create a new REST table client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Project URL of the hosted database (e.g., "https://xyz.example.co")
    /// * `api_key` - Access key sent with every request
    /// * `timeout_ms` - Request timeout in milliseconds
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_ms: u64,
    ) -> StorageResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let base_url: String = base_url.into();
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, REST_PATH, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
    }

    async fn send(&self, request: RequestBuilder) -> StorageResult<Vec<Row>> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        read_rows(response).await
    }
}

#[async_trait]
impl TableClient for RestClient {
    async fn select(&self, table: &str, order: &Order) -> StorageResult<Vec<Row>> {
        let request = self
            .http_client
            .get(self.table_url(table))
            .query(&[("select", "*".to_string()), ("order", order.to_query_value())]);

        let rows = self.send(request).await?;
        tracing::debug!(table, count = rows.len(), "selected rows");
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> StorageResult<Row> {
        let request = self
            .http_client
            .post(self.table_url(table))
            .json(&vec![row]);

        self.send(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::InvalidResponse("insert returned no rows".to_string()))
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> StorageResult<Row> {
        let request = self
            .http_client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .json(&patch);

        self.send(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::not_found(table, id))
    }

    async fn delete(&self, table: &str, id: &str) -> StorageResult<()> {
        let request = self
            .http_client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))]);

        let removed = self.send(request).await?;
        if removed.is_empty() {
            return Err(StorageError::not_found(table, id));
        }
        Ok(())
    }
}

async fn read_rows(response: Response) -> StorageResult<Vec<Row>> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| StorageError::Transport(e.to_string()))?;

    if !status.is_success() {
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request rejected").to_string());
        return Err(StorageError::rejected(status.as_u16(), message));
    }

    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str::<Vec<Row>>(&body).map_err(|e| StorageError::InvalidResponse(e.to_string()))
}

/// Pulls a human-readable message out of an error body, if there is one.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<RestErrorBody>(trimmed) {
        Ok(RestErrorBody {
            message: Some(message),
        }) => Some(message),
        _ => Some(trimmed.to_string()),
    }
}
