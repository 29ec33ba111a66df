mod commands;

use anyhow::Context;
use bookshelf_app::bootstrap::App;
use clap::Parser;

use commands::Command;

/// Personal library catalog
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    /// Log at the configured level instead of warnings only
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = bookshelf_kernel::settings::Settings::load()
        .with_context(|| "failed to load bookshelf settings")?;
    if !cli.verbose {
        settings.telemetry.filter = "warn".to_string();
    }
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::debug!(command = ?cli.command, "running command");
    let app = App::connect(settings).await?;
    let books = app.books()?;

    let mut stdout = std::io::stdout().lock();
    let result = commands::execute(cli.command, &books, &mut stdout).await;

    app.shutdown().await?;
    result
}
