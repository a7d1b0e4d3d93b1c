//! Relational catalog store (SQLite).
//!
//! One `Database` wraps one connection. Callers open it for a batch and
//! drop it when the batch ends; every table module adds its own methods.

mod schema;
pub mod files;
pub mod folders;
pub mod imagesets;
pub mod interviews;
pub mod sections;

use rusqlite::Connection;
use std::path::Path;

use crate::error::{CatalogError, Result, StoreContext};

pub use files::{FileRow, NewFile};
pub use folders::FolderRow;
pub use imagesets::{ImagesetRow, NewImageset};
pub use interviews::{InterviewRow, NewInterview};
pub use schema::SCHEMA;
pub use sections::SectionRow;

pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Open (creating if needed) the store at `path` for `operation`.
    pub fn open(path: &Path, operation: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
            }
        }

        let connection_error = |source| CatalogError::StoreConnection {
            operation: operation.to_string(),
            target: path.to_path_buf(),
            source,
        };

        let conn = Connection::open(path).map_err(connection_error)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(connection_error)?;

        tracing::debug!("Opened catalog store {:?} for {}", path, operation);
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA).during("initialize schema")?;
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Timestamp format used for every `created_at` / `updated_at` column.
pub fn now() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.f")
        .to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Database;
    use tempfile::TempDir;

    /// A fresh, initialized store in its own temp dir.
    pub fn open_temp() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("catalog.db"), "test").unwrap();
        db.initialize().unwrap();
        (dir, db)
    }
}
