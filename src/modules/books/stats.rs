use std::collections::BTreeSet;

use serde::Serialize;

use super::models::Book;

/// Summary figures for the library dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryStats {
    pub total: usize,
    /// Distinct genres, sorted.
    pub genres: Vec<String>,
    pub genre_count: usize,
    /// Mean condition stars; 0 for an empty library.
    pub average_condition: f64,
}

impl LibraryStats {
    pub fn from_books(books: &[Book]) -> Self {
        let genres: Vec<String> = books
            .iter()
            .filter_map(|book| book.genre.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let average_condition = if books.is_empty() {
            0.0
        } else {
            let stars: u32 = books
                .iter()
                .map(|book| u32::from(book.condition.stars()))
                .sum();
            f64::from(stars) / books.len() as f64
        };

        Self {
            total: books.len(),
            genre_count: genres.len(),
            genres,
            average_condition,
        }
    }
}
