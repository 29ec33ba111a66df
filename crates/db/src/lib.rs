//! Table client for the hosted books store.
//!
//! The repository layer talks to storage only through [`TableClient`]. Two
//! implementations ship here: [`RestClient`] for a PostgREST-style hosted
//! database and [`MemoryTable`] for tests and local runs.

pub mod client;
pub mod error;
pub mod memory;
pub mod rest;

pub use client::{Order, Row, TableClient};
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryTable, Operation};
pub use rest::RestClient;
