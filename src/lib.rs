//! Bookshelf application library
//!
//! The books module (model, repository, filters, statistics) plus the small
//! bootstrap helpers shared by the binaries.

pub mod bootstrap;
pub mod modules;
pub mod utils;

pub use modules::books::{
    Book, BookEvent, BookFilter, BookId, BookPatch, BookRepository, BooksModule, CatalogState,
    Condition, FieldUpdate, LibraryStats, NewBook, RepositoryError,
};
