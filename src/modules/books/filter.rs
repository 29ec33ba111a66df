use super::models::{Book, Condition};

/// Dashboard-style criteria for narrowing the collection.
///
/// Unset criteria match every book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    /// Case-insensitive substring of the title or author.
    pub search: Option<String>,
    /// Exact genre.
    pub genre: Option<String>,
    pub condition: Option<Condition>,
}

impl BookFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn matches(&self, book: &Book) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                book.title.to_lowercase().contains(&term)
                    || book.author.to_lowercase().contains(&term)
            }
        };

        let matches_genre = match self.genre.as_deref() {
            None | Some("") => true,
            Some(genre) => book.genre.as_deref() == Some(genre),
        };

        let matches_condition = self
            .condition
            .map_or(true, |condition| book.condition == condition);

        matches_search && matches_genre && matches_condition
    }

    /// Matching books in their original order.
    pub fn apply<'a>(&self, books: &'a [Book]) -> Vec<&'a Book> {
        books.iter().filter(|book| self.matches(book)).collect()
    }
}
