use anyhow::Context;
use bookshelf_app::bootstrap::App;
use bookshelf_app::utils;
use bookshelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        storage = %settings.storage.url,
        "bookshelf-app bootstrap starting"
    );

    let app = App::connect(settings).await?;
    let books = app.books()?;
    let state = books.snapshot().await;

    if let Some(error) = &state.error {
        eprintln!("Database error: {error}");
    }
    println!("{}", utils::render_stats(&books.stats().await));

    app.shutdown().await?;
    tracing::info!("bookshelf-app bootstrap complete");
    Ok(())
}
