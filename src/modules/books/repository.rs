//! Book repository: the in-memory mirror of the `books` table.
//!
//! Every consumer reads the collection through a [`BookRepository`] and every
//! write goes through it. The repository calls storage first and only then
//! applies the returned row to its collection, so the mirror never shows a
//! change storage did not accept.
//!
//! Operations are not serialized against each other. Two concurrent
//! mutations race at the storage layer and their effects land in the order
//! their responses arrive. The state lock is never held across a storage
//! call.

use std::sync::Arc;

use bookshelf_db::{Order, Row, StorageError, TableClient};
use bookshelf_events::EventBus;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

use super::filter::BookFilter;
use super::models::{Book, BookId, BookPatch, NewBook, ValidationError};
use super::stats::LibraryStats;

const ORDER_COLUMN: &str = "created_at";

/// Failure of a repository operation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Storage returned a row that does not decode into a [`Book`].
    #[error("unreadable book row: {0}")]
    InvalidRow(String),
}

/// Change notification published after the collection or error state moves.
#[derive(Debug, Clone, PartialEq)]
pub enum BookEvent {
    Refreshed { count: usize },
    Created(Book),
    Updated(Book),
    Deleted(BookId),
    Failed {
        operation: &'static str,
        message: String,
    },
}

/// Consistent copy of everything a consumer renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    /// Newest first.
    pub books: Vec<Book>,
    /// True while a create, update or delete is in flight.
    pub is_loading: bool,
    /// Message of the most recent failure, cleared when the next operation starts.
    pub error: Option<String>,
}

#[derive(Default)]
struct Inner {
    books: Vec<Book>,
    in_flight: usize,
    error: Option<String>,
}

impl Inner {
    /// Drop one loading marker and fold `result` into the state.
    /// Returns the failure message, if any.
    fn finish<T>(
        &mut self,
        result: &Result<T, RepositoryError>,
        apply: impl FnOnce(&mut Vec<Book>, &T),
    ) -> Option<String> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(value) => {
                apply(&mut self.books, value);
                None
            }
            Err(err) => {
                let message = err.to_string();
                self.error = Some(message.clone());
                Some(message)
            }
        }
    }
}

/// Owns the book collection for one client session.
pub struct BookRepository {
    client: Arc<dyn TableClient>,
    table: String,
    state: RwLock<Inner>,
    events: EventBus<BookEvent>,
}

impl BookRepository {
    /// Build an empty repository without touching storage.
    pub fn new(client: Arc<dyn TableClient>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            state: RwLock::new(Inner::default()),
            events: EventBus::new(),
        }
    }

    /// Build a repository and load the collection once.
    ///
    /// A failed initial load is not fatal: the repository starts empty with
    /// `error` set, and the caller may `refresh` again.
    pub async fn open(client: Arc<dyn TableClient>, table: impl Into<String>) -> Self {
        let repository = Self::new(client, table);
        repository.refresh().await;
        repository
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> CatalogState {
        let state = self.state.read().await;
        CatalogState {
            books: state.books.clone(),
            is_loading: state.in_flight > 0,
            error: state.error.clone(),
        }
    }

    pub async fn books(&self) -> Vec<Book> {
        self.state.read().await.books.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.in_flight > 0
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn find(&self, id: &BookId) -> Option<Book> {
        self.state
            .read()
            .await
            .books
            .iter()
            .find(|book| book.id == *id)
            .cloned()
    }

    /// Books matching `filter`, newest first.
    pub async fn filtered(&self, filter: &BookFilter) -> Vec<Book> {
        let state = self.state.read().await;
        filter.apply(&state.books).into_iter().cloned().collect()
    }

    pub async fn stats(&self) -> LibraryStats {
        LibraryStats::from_books(&self.state.read().await.books)
    }

    /// Reload the whole collection, newest first.
    ///
    /// Failures are recorded in `error` and the previous collection is kept;
    /// nothing is returned to the caller.
    pub async fn refresh(&self) {
        self.state.write().await.error = None;

        let result = self
            .client
            .select(&self.table, &Order::desc(ORDER_COLUMN))
            .await
            .map_err(RepositoryError::from)
            .and_then(decode_rows);

        match result {
            Ok(books) => {
                let count = books.len();
                self.state.write().await.books = books;
                tracing::debug!(table = %self.table, count, "book collection refreshed");
                self.events.publish(BookEvent::Refreshed { count });
            }
            Err(err) => {
                let message = err.to_string();
                self.state.write().await.error = Some(message.clone());
                self.report_failure("refresh", message);
            }
        }
    }

    /// Add a book. The stored copy, with its id and timestamps, goes to the
    /// front of the collection.
    pub async fn create(&self, book: NewBook) -> Result<Book, RepositoryError> {
        book.validate()?;
        self.begin_mutation().await;

        let result = self
            .client
            .insert(&self.table, book.to_row())
            .await
            .map_err(RepositoryError::from)
            .and_then(decode_row);

        let created = self
            .complete("create", result, |books, created| {
                books.insert(0, created.clone());
            })
            .await?;

        tracing::info!(table = %self.table, book_id = %created.id, "book created");
        self.events.publish(BookEvent::Created(created.clone()));
        Ok(created)
    }

    /// Apply `patch` to the book with `id`, keeping its position in the
    /// collection.
    pub async fn update(&self, id: &BookId, patch: BookPatch) -> Result<Book, RepositoryError> {
        patch.validate()?;
        self.begin_mutation().await;

        let result = self
            .client
            .update(&self.table, id.as_str(), patch.to_row())
            .await
            .map_err(RepositoryError::from)
            .and_then(decode_row);

        let updated = self
            .complete("update", result, |books, updated| {
                if let Some(slot) = books.iter_mut().find(|book| book.id == updated.id) {
                    *slot = updated.clone();
                }
            })
            .await?;

        tracing::info!(table = %self.table, book_id = %updated.id, "book updated");
        self.events.publish(BookEvent::Updated(updated.clone()));
        Ok(updated)
    }

    /// Remove the book with `id` from storage, then from the collection.
    pub async fn delete(&self, id: &BookId) -> Result<(), RepositoryError> {
        self.begin_mutation().await;

        let result = self
            .client
            .delete(&self.table, id.as_str())
            .await
            .map_err(RepositoryError::from);

        self.complete("delete", result, |books, _| {
            books.retain(|book| book.id != *id);
        })
        .await?;

        tracing::info!(table = %self.table, book_id = %id, "book deleted");
        self.events.publish(BookEvent::Deleted(id.clone()));
        Ok(())
    }

    async fn begin_mutation(&self) {
        let mut state = self.state.write().await;
        state.error = None;
        state.in_flight += 1;
    }

    /// Close out a mutation under one write guard, then report a failure
    /// once the guard is released.
    async fn complete<T>(
        &self,
        operation: &'static str,
        result: Result<T, RepositoryError>,
        apply: impl FnOnce(&mut Vec<Book>, &T),
    ) -> Result<T, RepositoryError> {
        let failure = self.state.write().await.finish(&result, apply);
        if let Some(message) = failure {
            self.report_failure(operation, message);
        }
        result
    }

    fn report_failure(&self, operation: &'static str, message: String) {
        tracing::error!(table = %self.table, operation, error = %message, "book operation failed");
        self.events.publish(BookEvent::Failed { operation, message });
    }
}

fn decode_row(row: Row) -> Result<Book, RepositoryError> {
    Book::from_row(row).map_err(|e| RepositoryError::InvalidRow(e.to_string()))
}

fn decode_rows(rows: Vec<Row>) -> Result<Vec<Book>, RepositoryError> {
    rows.into_iter().map(decode_row).collect()
}
