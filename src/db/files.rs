//! Imageset files and their tags.

use rusqlite::{params, OptionalExtension, Row};

use super::{now, Database};
use crate::error::{Result, StoreContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub id: i64,
    pub imageset_id: i64,
    pub filename: String,
    pub fullpath: String,
    pub extension: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl FileRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            imageset_id: row.get(1)?,
            filename: row.get(2)?,
            fullpath: row.get(3)?,
            extension: row.get(4)?,
            file_type: row.get(5)?,
            file_size: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub filename: String,
    pub fullpath: String,
    pub extension: String,
    pub file_type: String,
    pub file_size: i64,
}

const COLUMNS: &str =
    "id, imageset_id, filename, fullpath, extension, file_type, file_size, created_at, updated_at";

impl Database {
    pub fn upsert_file(&self, imageset_id: i64, file: &NewFile) -> Result<i64> {
        let timestamp = now();
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM imagesetfiles WHERE imageset_id = ? AND filename = ?",
                params![imageset_id, file.filename],
                |row| row.get(0),
            )
            .optional()
            .during("get file")?;

        match existing {
            Some(id) => {
                self.conn
                    .execute(
                        r#"
                        UPDATE imagesetfiles
                        SET fullpath = ?, extension = ?, file_type = ?, file_size = ?, updated_at = ?
                        WHERE id = ?
                        "#,
                        params![
                            file.fullpath,
                            file.extension,
                            file.file_type,
                            file.file_size,
                            timestamp,
                            id
                        ],
                    )
                    .during("update file")?;
                Ok(id)
            }
            None => {
                self.conn
                    .execute(
                        r#"
                        INSERT INTO imagesetfiles
                            (imageset_id, filename, fullpath, extension, file_type, file_size, created_at, updated_at)
                        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                        "#,
                        params![
                            imageset_id,
                            file.filename,
                            file.fullpath,
                            file.extension,
                            file.file_type,
                            file.file_size,
                            timestamp,
                            timestamp
                        ],
                    )
                    .during("insert file")?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }

    pub fn list_files(&self, imageset_id: i64) -> Result<Vec<FileRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM imagesetfiles WHERE imageset_id = ? ORDER BY filename",
                COLUMNS
            ))
            .during("list files")?;
        let rows = stmt
            .query_map([imageset_id], FileRow::from_row)
            .during("list files")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .during("list files")?;
        Ok(rows)
    }

    /// Delete file rows (and their tags) whose filename is not in `keep`.
    pub fn delete_files_except(&self, imageset_id: i64, keep: &[&str]) -> Result<usize> {
        let mut removed = 0;
        for row in self.list_files(imageset_id)? {
            if !keep.contains(&row.filename.as_str()) {
                removed += self
                    .conn
                    .execute("DELETE FROM imagesetfiles WHERE id = ?", [row.id])
                    .during("delete file")?;
                tracing::debug!("Removed vanished file {}", row.fullpath);
            }
        }
        Ok(removed)
    }

    pub fn file_tags(&self, file_id: i64) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag FROM imagesetfile_tags WHERE imagesetfile_id = ? ORDER BY tag")
            .during("list tags")?;
        let tags = stmt
            .query_map([file_id], |row| row.get(0))
            .during("list tags")?
            .collect::<rusqlite::Result<Vec<String>>>()
            .during("list tags")?;
        Ok(tags)
    }

    /// Make the file's tag rows equal `tags`. Returns (added, removed).
    pub fn sync_file_tags(&self, file_id: i64, tags: &[String]) -> Result<(usize, usize)> {
        let current = self.file_tags(file_id)?;

        let mut removed = 0;
        for stale in current.iter().filter(|t| !tags.contains(t)) {
            removed += self
                .conn
                .execute(
                    "DELETE FROM imagesetfile_tags WHERE imagesetfile_id = ? AND tag = ?",
                    params![file_id, stale],
                )
                .during("delete tag")?;
        }

        let mut added = 0;
        for tag in tags.iter().filter(|t| !current.contains(t)) {
            added += self
                .conn
                .execute(
                    "INSERT OR IGNORE INTO imagesetfile_tags (imagesetfile_id, tag) VALUES (?, ?)",
                    params![file_id, tag],
                )
                .during("insert tag")?;
        }

        Ok((added, removed))
    }
}
