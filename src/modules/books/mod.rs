pub mod filter;
pub mod models;
pub mod repository;
pub mod stats;

use std::sync::Arc;

use async_trait::async_trait;
use bookshelf_kernel::{InitCtx, Module};
use once_cell::sync::OnceCell;

pub use filter::BookFilter;
pub use models::{Book, BookId, BookPatch, Condition, FieldUpdate, NewBook, ValidationError};
pub use repository::{BookEvent, BookRepository, CatalogState, RepositoryError};
pub use stats::LibraryStats;

/// Books module: owns the session's [`BookRepository`] once started.
#[derive(Default)]
pub struct BooksModule {
    repository: OnceCell<Arc<BookRepository>>,
}

impl BooksModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// The repository, available after `start`.
    pub fn repository(&self) -> Option<Arc<BookRepository>> {
        self.repository.get().cloned()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            table = %ctx.settings.storage.table,
            "books module initialized"
        );
        Ok(())
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if self.repository.get().is_some() {
            anyhow::bail!("books module already started");
        }

        let repository =
            BookRepository::open(Arc::clone(ctx.db), ctx.settings.storage.table.clone()).await;
        let state = repository.snapshot().await;
        match &state.error {
            Some(error) => tracing::warn!(
                module = self.name(),
                %error,
                "initial book load failed; starting with an empty collection"
            ),
            None => tracing::info!(
                module = self.name(),
                count = state.books.len(),
                "books module started"
            ),
        }

        self.repository
            .set(Arc::new(repository))
            .map_err(|_| anyhow::anyhow!("books module already started"))?;
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<BooksModule> {
    Arc::new(BooksModule::new())
}
