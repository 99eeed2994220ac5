//! Book storage
//!
//! Export only needs to look books up by id, but the store also accepts writes
//! so the CLI and tests can seed it.

use crate::error::StorageError;
use crate::types::Book;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use uuid::Uuid;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Persistent lookup of books by id
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Fetch a book, or `None` if no book has this id
    async fn get(&self, id: Uuid) -> StorageResult<Option<Book>>;

    /// Insert or replace a book
    async fn put(&self, book: &Book) -> StorageResult<()>;
}

/// Stores each book as `<root>/books/<id>.json`
pub struct LocalBookStore {
    root: PathBuf,
}

impl LocalBookStore {
    /// Create a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn books_dir(&self) -> PathBuf {
        self.root.join("books")
    }

    // The id is a parsed UUID, so the file name can't escape the books directory
    fn book_path(&self, id: Uuid) -> PathBuf {
        self.books_dir().join(format!("{}.json", id))
    }

    async fn read_book(path: &Path) -> StorageResult<Book> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        serde_json::from_slice(&data).map_err(|e| StorageError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl BookStore for LocalBookStore {
    async fn get(&self, id: Uuid) -> StorageResult<Option<Book>> {
        let path = self.book_path(id);
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        if !exists {
            return Ok(None);
        }

        let book = Self::read_book(&path).await?;
        if book.id != id {
            return Err(StorageError::Corrupt {
                path: path.display().to_string(),
                reason: format!("file holds book {}", book.id),
            });
        }
        Ok(Some(book))
    }

    async fn put(&self, book: &Book) -> StorageResult<()> {
        let dir = self.books_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let data = serde_json::to_vec_pretty(book)
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        // Write then rename so readers never see a half-written file
        let path = self.book_path(book.id);
        let tmp = dir.join(format!("{}.json.tmp", book.id));
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        tracing::debug!(book_id = %book.id, path = %path.display(), "Stored book");
        Ok(())
    }
}

/// In-memory book store (for testing)
#[derive(Default)]
pub struct MemoryBookStore {
    books: RwLock<HashMap<Uuid, Book>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn get(&self, id: Uuid) -> StorageResult<Option<Book>> {
        let books = self
            .books
            .read()
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        Ok(books.get(&id).cloned())
    }

    async fn put(&self, book: &Book) -> StorageResult<()> {
        self.books
            .write()
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .insert(book.id, book.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chapter;
    use tempfile::TempDir;

    fn sample(owner: Uuid, title: &str) -> Book {
        Book::new(owner, title, "Author").with_chapter(Chapter::new("One").with_content("Text"))
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryBookStore::new();
        let owner = Uuid::new_v4();
        let book = sample(owner, "First");

        assert!(store.get(book.id).await.unwrap().is_none());
        store.put(&book).await.unwrap();
        assert_eq!(store.get(book.id).await.unwrap(), Some(book.clone()));

        let mut revised = book.clone();
        revised.title = "Revised".to_string();
        store.put(&revised).await.unwrap();
        assert_eq!(store.get(book.id).await.unwrap().unwrap().title, "Revised");
    }

    #[tokio::test]
    async fn test_local_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = LocalBookStore::new(dir.path());
        let owner = Uuid::new_v4();
        let book = sample(owner, "On Disk");

        assert!(store.get(book.id).await.unwrap().is_none());

        store.put(&book).await.unwrap();
        assert!(dir.path().join("books").join(format!("{}.json", book.id)).exists());
        assert_eq!(store.get(book.id).await.unwrap(), Some(book.clone()));
        assert!(!dir.path().join("books").join(format!("{}.json.tmp", book.id)).exists());
    }

    #[tokio::test]
    async fn test_local_store_reports_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let store = LocalBookStore::new(dir.path());
        let id = Uuid::new_v4();

        std::fs::create_dir_all(dir.path().join("books")).unwrap();
        std::fs::write(dir.path().join("books").join(format!("{}.json", id)), b"{nope").unwrap();

        let err = store.get(id).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }
}
