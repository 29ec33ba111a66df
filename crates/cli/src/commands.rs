use std::io::Write;

use anyhow::{bail, Context};
use bookshelf_app::utils::{render_book_line, render_stats};
use bookshelf_app::{BookFilter, BookId, BookPatch, BookRepository, Condition, FieldUpdate, NewBook};
use clap::{Args, Subcommand};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List books, newest first
    List(ListArgs),
    /// Add a book to the library
    Add(AddArgs),
    /// Change fields of a book; an empty value clears optional fields
    Edit(EditArgs),
    /// Remove a book from the library
    Remove {
        /// Book id
        id: String,
    },
    /// Show library statistics
    Stats,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Match title or author, case-insensitive
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    condition: Option<Condition>,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    author: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long, default_value = "good")]
    condition: Condition,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Book id
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    condition: Option<Condition>,
    #[arg(long)]
    notes: Option<String>,
}

impl EditArgs {
    fn into_patch(self) -> BookPatch {
        fn field(value: Option<String>) -> FieldUpdate<String> {
            value.map_or(FieldUpdate::Keep, FieldUpdate::from_input)
        }

        BookPatch {
            title: self.title,
            author: self.author,
            description: field(self.description),
            genre: field(self.genre),
            condition: self.condition,
            notes: field(self.notes),
        }
    }
}

/// Run one command against the repository, writing human output to `out`.
pub async fn execute(
    command: Command,
    books: &BookRepository,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::List(args) => {
            // The initial load does not fail the session; an empty listing
            // would hide the outage.
            if let Some(error) = books.error().await {
                bail!("failed to load books: {error}");
            }

            let filter = BookFilter {
                search: args.search,
                genre: args.genre,
                condition: args.condition,
            };
            let matched = books.filtered(&filter).await;
            if matched.is_empty() {
                writeln!(out, "No books found.")?;
            }
            for book in &matched {
                writeln!(out, "{}", render_book_line(book))?;
            }
        }
        Command::Add(args) => {
            let mut new_book = NewBook::new(args.title, args.author, args.condition);
            new_book.description = args.description;
            new_book.genre = args.genre;
            new_book.notes = args.notes;

            let created = books
                .create(new_book)
                .await
                .context("failed to add book")?;
            writeln!(out, "Added \"{}\" ({})", created.title, created.id)?;
        }
        Command::Edit(args) => {
            let id = BookId::new(args.id.clone());
            let patch = args.into_patch();
            if patch.is_empty() {
                bail!("nothing to change; pass at least one field");
            }

            let updated = books
                .update(&id, patch)
                .await
                .context("failed to update book")?;
            writeln!(out, "Updated {}", render_book_line(&updated))?;
        }
        Command::Remove { id } => {
            let id = BookId::new(id);
            let title = books.find(&id).await.map(|book| book.title);
            books
                .delete(&id)
                .await
                .context("failed to delete book")?;
            writeln!(out, "Removed \"{}\"", title.unwrap_or_else(|| id.to_string()))?;
        }
        Command::Stats => {
            writeln!(out, "{}", render_stats(&books.stats().await))?;
        }
    }

    Ok(())
}
