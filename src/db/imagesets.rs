//! Imageset rows.

use rusqlite::{params, OptionalExtension, Row};

use super::{now, Database};
use crate::error::{Result, StoreContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagesetRow {
    pub id: i64,
    pub folder_id: i64,
    pub name: String,
    pub folder_path: String,
    pub imageset_folder_path: String,
    pub status: Option<String>,
    pub edits: Option<String>,
    pub needs: Option<String>,
    pub good_for: Option<String>,
    pub source: Option<String>,
    pub prompt: Option<String>,
    pub cover_image_path: Option<String>,
    pub orig_image_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ImagesetRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            folder_id: row.get(1)?,
            name: row.get(2)?,
            folder_path: row.get(3)?,
            imageset_folder_path: row.get(4)?,
            status: row.get(5)?,
            edits: row.get(6)?,
            needs: row.get(7)?,
            good_for: row.get(8)?,
            source: row.get(9)?,
            prompt: row.get(10)?,
            cover_image_path: row.get(11)?,
            orig_image_path: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }
}

/// Record-derived columns written on import.
#[derive(Debug, Clone, Default)]
pub struct NewImageset {
    pub folder_path: String,
    pub imageset_folder_path: String,
    /// `None` stores NULL, for records that never stated a status.
    pub status: Option<String>,
    pub edits: String,
    pub needs: String,
    pub good_for: Option<String>,
    pub source: String,
    pub prompt: Option<String>,
}

const COLUMNS: &str = "id, folder_id, name, folder_path, imageset_folder_path, status, edits, needs, \
                       good_for, source, prompt, cover_image_path, orig_image_path, created_at, updated_at";

impl Database {
    /// Insert or update the imageset matched by (folder, name), returning its id.
    pub fn upsert_imageset(&self, folder_id: i64, name: &str, values: &NewImageset) -> Result<i64> {
        let timestamp = now();
        match self.get_imageset(folder_id, name)? {
            Some(existing) => {
                self.conn
                    .execute(
                        r#"
                        UPDATE imagesets
                        SET folder_path = ?, imageset_folder_path = ?, status = ?, edits = ?,
                            needs = ?, good_for = ?, source = ?, prompt = ?, updated_at = ?
                        WHERE id = ?
                        "#,
                        params![
                            values.folder_path,
                            values.imageset_folder_path,
                            values.status,
                            values.edits,
                            values.needs,
                            values.good_for,
                            values.source,
                            values.prompt,
                            timestamp,
                            existing.id
                        ],
                    )
                    .during("update imageset")?;
                Ok(existing.id)
            }
            None => {
                self.conn
                    .execute(
                        r#"
                        INSERT INTO imagesets (
                            folder_id, name, folder_path, imageset_folder_path, status, edits,
                            needs, good_for, source, prompt, created_at, updated_at
                        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                        "#,
                        params![
                            folder_id,
                            name,
                            values.folder_path,
                            values.imageset_folder_path,
                            values.status,
                            values.edits,
                            values.needs,
                            values.good_for,
                            values.source,
                            values.prompt,
                            timestamp,
                            timestamp
                        ],
                    )
                    .during("insert imageset")?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }

    pub fn set_image_paths(&self, id: i64, orig: Option<&str>, cover: Option<&str>) -> Result<()> {
        self.conn
            .execute(
                "UPDATE imagesets SET orig_image_path = ?, cover_image_path = ? WHERE id = ?",
                params![orig, cover, id],
            )
            .during("update image paths")?;
        Ok(())
    }

    pub fn get_imageset(&self, folder_id: i64, name: &str) -> Result<Option<ImagesetRow>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM imagesets WHERE folder_id = ? AND name = ?",
                    COLUMNS
                ),
                params![folder_id, name],
                ImagesetRow::from_row,
            )
            .optional()
            .during("get imageset")
    }

    pub fn list_imagesets(&self, folder_id: i64) -> Result<Vec<ImagesetRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM imagesets WHERE folder_id = ? ORDER BY name",
                COLUMNS
            ))
            .during("list imagesets")?;
        let rows = stmt
            .query_map([folder_id], ImagesetRow::from_row)
            .during("list imagesets")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .during("list imagesets")?;
        Ok(rows)
    }

    /// Remove an imageset row; sections, files, tags and interviews cascade.
    pub fn delete_imageset(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM imagesets WHERE id = ?", [id])
            .during("delete imageset")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::open_temp;

    fn values(status: &str) -> NewImageset {
        NewImageset {
            folder_path: "/images/new".to_string(),
            imageset_folder_path: "/images/new/shot".to_string(),
            status: Some(status.to_string()),
            source: "unknown".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_imageset_updates_in_place() {
        let (_dir, db) = open_temp();
        let folder_id = db.upsert_folder("new", "/images/new").unwrap();

        let id = db.upsert_imageset(folder_id, "shot", &values("new")).unwrap();
        let created = db.get_imageset(folder_id, "shot").unwrap().unwrap().created_at;
        let again = db.upsert_imageset(folder_id, "shot", &values("keep")).unwrap();
        let row = db.get_imageset(folder_id, "shot").unwrap().unwrap();

        assert_eq!(id, again);
        assert_eq!(row.status.as_deref(), Some("keep"));
        assert_eq!(row.created_at, created);
        assert_eq!(db.list_imagesets(folder_id).unwrap().len(), 1);
    }

    #[test]
    fn test_image_paths_survive_upsert() {
        let (_dir, db) = open_temp();
        let folder_id = db.upsert_folder("new", "/images/new").unwrap();
        let id = db.upsert_imageset(folder_id, "shot", &values("new")).unwrap();
        db.set_image_paths(id, Some("/o.png"), Some("/t.png")).unwrap();

        db.upsert_imageset(folder_id, "shot", &values("new")).unwrap();
        let row = db.get_imageset(folder_id, "shot").unwrap().unwrap();
        assert_eq!(row.orig_image_path.as_deref(), Some("/o.png"));
        assert_eq!(row.cover_image_path.as_deref(), Some("/t.png"));
    }
}
