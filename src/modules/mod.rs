pub mod books;

use std::sync::Arc;

use bookshelf_kernel::ModuleRegistry;

/// Register all modules with the registry.
///
/// Returns the books module so callers can reach its repository once the
/// registry has started.
pub fn register_all(registry: &mut ModuleRegistry) -> Arc<books::BooksModule> {
    let books = books::create_module();
    registry.register(books.clone());
    books
}
