//! Process bootstrap shared by the binaries.

use std::sync::Arc;

use anyhow::Context;
use bookshelf_db::{RestClient, TableClient};
use bookshelf_kernel::settings::{Settings, StorageSettings};
use bookshelf_kernel::{InitCtx, ModuleRegistry};

use crate::modules::{self, books::BooksModule};
use crate::BookRepository;

/// A started application: settings and running modules.
pub struct App {
    pub settings: Settings,
    registry: ModuleRegistry,
    books: Arc<BooksModule>,
}

impl App {
    /// Register, initialize and start every module against `db`.
    pub async fn start(settings: Settings, db: Arc<dyn TableClient>) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        let books = modules::register_all(&mut registry);

        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        registry.init_all(&ctx).await?;
        registry.start_all(&ctx).await?;
        tracing::debug!(modules = registry.len(), "application started");

        Ok(Self {
            settings,
            registry,
            books,
        })
    }

    /// Start against the hosted table described by `settings.storage`.
    pub async fn connect(settings: Settings) -> anyhow::Result<Self> {
        let db = rest_client(&settings.storage)?;
        Self::start(settings, db).await
    }

    pub fn books(&self) -> anyhow::Result<Arc<BookRepository>> {
        self.books
            .repository()
            .context("books module has not been started")
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.registry.stop_all().await
    }
}

/// Build the REST table client for the configured storage endpoint.
pub fn rest_client(storage: &StorageSettings) -> anyhow::Result<Arc<dyn TableClient>> {
    let client = RestClient::new(&storage.url, &storage.api_key, storage.request_timeout_ms)
        .with_context(|| format!("failed to create storage client for {}", storage.url))?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_db::{MemoryTable, Operation};

    #[tokio::test]
    async fn app_starts_books_module_and_shuts_down() {
        let table = MemoryTable::new();
        let app = App::start(Settings::default(), Arc::new(table.clone()))
            .await
            .unwrap();

        let books = app.books().unwrap();
        assert!(books.books().await.is_empty());
        assert_eq!(table.calls(Operation::Select).await, 1);

        app.shutdown().await.unwrap();
    }
}
