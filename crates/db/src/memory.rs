//! In-memory table backend for testing and development

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::client::{Order, Row, TableClient};
use crate::error::{StorageError, StorageResult};

/// Table operation, used to target injected failures and call counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

/// Table client that keeps rows in process memory.
///
/// Mirrors what the hosted store does on write: assigns `id`, stamps
/// `created_at` on insert and refreshes `updated_at` on every update.
/// Failures can be injected per operation to exercise error paths.
#[derive(Clone, Default)]
pub struct MemoryTable {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Row>>,
    failures: HashMap<Operation, String>,
    calls: HashMap<Operation, usize>,
    last_stamp: Option<OffsetDateTime>,
}

impl MemoryState {
    /// Wall-clock time, nudged forward so no two writes share a timestamp.
    fn next_stamp(&mut self) -> StorageResult<String> {
        let mut now = OffsetDateTime::now_utc();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now.format(&Rfc3339)
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))
    }

    fn begin(&mut self, operation: Operation) -> StorageResult<()> {
        *self.calls.entry(operation).or_default() += 1;
        match self.failures.remove(&operation) {
            Some(message) => Err(StorageError::Unavailable(message)),
            None => Ok(()),
        }
    }
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table client whose `table` already holds `rows`, as they would come
    /// back from storage.
    pub fn with_rows(table: &str, rows: Vec<Row>) -> Self {
        let mut state = MemoryState::default();
        state.tables.insert(table.to_string(), rows);
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Append `rows` to `table`. Visible through every clone of this client.
    pub async fn seed(&self, table: &str, rows: Vec<Row>) {
        self.state
            .write()
            .await
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Make the next call of `operation` fail with `message`.
    pub async fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        self.state
            .write()
            .await
            .failures
            .insert(operation, message.into());
    }

    /// Number of times `operation` has been attempted, failed calls included.
    pub async fn calls(&self, operation: Operation) -> usize {
        self.state
            .read()
            .await
            .calls
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    /// Current rows of `table` in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TableClient for MemoryTable {
    async fn select(&self, table: &str, order: &Order) -> StorageResult<Vec<Row>> {
        let mut state = self.state.write().await;
        state.begin(Operation::Select)?;

        let mut rows = state.tables.get(table).cloned().unwrap_or_default();
        rows.sort_by(|a, b| {
            let ordering = compare_values(a.get(&order.column), b.get(&order.column));
            if order.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> StorageResult<Row> {
        let mut state = self.state.write().await;
        state.begin(Operation::Insert)?;

        let stamp = state.next_stamp()?;
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::now_v7().to_string()));
        row.insert("created_at".to_string(), Value::String(stamp.clone()));
        row.insert("updated_at".to_string(), Value::String(stamp));

        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> StorageResult<Row> {
        let mut state = self.state.write().await;
        state.begin(Operation::Update)?;

        let stamp = state.next_stamp()?;
        let row = state
            .tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row_has_id(row, id)))
            .ok_or_else(|| StorageError::not_found(table, id))?;

        for (column, value) in patch {
            if column != "id" {
                row.insert(column, value);
            }
        }
        row.insert("updated_at".to_string(), Value::String(stamp));
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state.begin(Operation::Delete)?;

        let rows = state
            .tables
            .get_mut(table)
            .ok_or_else(|| StorageError::not_found(table, id))?;
        let before = rows.len();
        rows.retain(|row| !row_has_id(row, id));
        if rows.len() == before {
            return Err(StorageError::not_found(table, id));
        }
        Ok(())
    }
}

fn row_has_id(row: &Row, id: &str) -> bool {
    matches!(row.get("id"), Some(Value::String(value)) if value == id)
}

/// Orders column values the way the store would: timestamps chronologically,
/// numbers numerically, other strings lexically, nulls last.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (
                OffsetDateTime::parse(a, &Rfc3339),
                OffsetDateTime::parse(b, &Rfc3339),
            ) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
