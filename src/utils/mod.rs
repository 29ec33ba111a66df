//! Rendering helpers shared by the binaries.

use crate::modules::books::{Book, Condition, LibraryStats};

/// Five-slot star bar for a condition, e.g. `★★★★☆`.
pub fn render_stars(condition: Condition) -> String {
    let filled = usize::from(condition.stars());
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// One-line listing entry: id, title, author, genre and condition.
pub fn render_book_line(book: &Book) -> String {
    let genre = book.genre.as_deref().unwrap_or("-");
    format!(
        "{}  {} by {}  [{}]  {} {}",
        book.id,
        book.title,
        book.author,
        genre,
        render_stars(book.condition),
        book.condition
    )
}

pub fn render_stats(stats: &LibraryStats) -> String {
    format!(
        "Total books: {}\nGenres: {}{}\nAverage condition: {:.1}/5",
        stats.total,
        stats.genre_count,
        if stats.genres.is_empty() {
            String::new()
        } else {
            format!(" ({})", stats.genres.join(", "))
        },
        stats.average_condition
    )
}
