use async_trait::async_trait;

use crate::error::StorageResult;

/// One table row as exchanged with storage.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Sort order applied to a `select`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    /// Renders the order as a PostgREST `order` query value.
    pub fn to_query_value(&self) -> String {
        let direction = if self.ascending { "asc" } else { "desc" };
        format!("{}.{}", self.column, direction)
    }
}

/// Row-level access to a remote tabular store.
///
/// Every call is independent. Implementations guarantee per-row atomicity
/// and nothing more.
#[async_trait]
pub trait TableClient: Send + Sync {
    /// Fetch every row of `table` in the given order.
    async fn select(&self, table: &str, order: &Order) -> StorageResult<Vec<Row>>;

    /// Insert one row and return it as stored, with server-assigned columns.
    async fn insert(&self, table: &str, row: Row) -> StorageResult<Row>;

    /// Apply `patch` to the row with `id` and return the updated row.
    async fn update(&self, table: &str, id: &str, patch: Row) -> StorageResult<Row>;

    /// Remove the row with `id`.
    async fn delete(&self, table: &str, id: &str) -> StorageResult<()>;
}
