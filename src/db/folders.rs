//! Registered parent folders.

use rusqlite::{params, OptionalExtension, Row};

use super::{now, Database};
use crate::error::{Result, StoreContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRow {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub created_at: String,
    pub updated_at: String,
}

impl FolderRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            path: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

const COLUMNS: &str = "id, name, path, created_at, updated_at";

impl Database {
    /// Insert or update a folder by name, returning its id.
    pub fn upsert_folder(&self, name: &str, path: &str) -> Result<i64> {
        let timestamp = now();
        match self.get_folder_by_name(name)? {
            Some(existing) => {
                self.conn
                    .execute(
                        "UPDATE folders SET path = ?, updated_at = ? WHERE id = ?",
                        params![path, timestamp, existing.id],
                    )
                    .during("update folder")?;
                Ok(existing.id)
            }
            None => {
                self.conn
                    .execute(
                        "INSERT INTO folders (name, path, created_at, updated_at) VALUES (?, ?, ?, ?)",
                        params![name, path, timestamp, timestamp],
                    )
                    .during("insert folder")?;
                tracing::info!("Registered folder {} at {}", name, path);
                Ok(self.conn.last_insert_rowid())
            }
        }
    }

    pub fn get_folder_by_name(&self, name: &str) -> Result<Option<FolderRow>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM folders WHERE name = ?", COLUMNS),
                [name],
                FolderRow::from_row,
            )
            .optional()
            .during("get folder")
    }

    pub fn list_folders(&self) -> Result<Vec<FolderRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM folders ORDER BY name", COLUMNS))
            .during("list folders")?;
        let rows = stmt
            .query_map([], FolderRow::from_row)
            .during("list folders")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .during("list folders")?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::open_temp;

    #[test]
    fn test_upsert_folder_keeps_id() {
        let (_dir, db) = open_temp();
        let id = db.upsert_folder("new", "/images/new").unwrap();
        let first = db.get_folder_by_name("new").unwrap().unwrap();

        let again = db.upsert_folder("new", "/mnt/images/new").unwrap();
        let second = db.get_folder_by_name("new").unwrap().unwrap();

        assert_eq!(id, again);
        assert_eq!(second.path, "/mnt/images/new");
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(db.list_folders().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_folder_is_none() {
        let (_dir, db) = open_temp();
        assert!(db.get_folder_by_name("nope").unwrap().is_none());
    }
}
