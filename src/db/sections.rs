//! Imageset sections, stored as JSON objects.

use rusqlite::{params, OptionalExtension, Row};

use super::{now, Database};
use crate::error::{Result, StoreContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRow {
    pub id: i64,
    pub imageset_id: i64,
    pub section_name: String,
    pub section_data: String,
    pub created_at: String,
    pub updated_at: String,
}

impl SectionRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            imageset_id: row.get(1)?,
            section_name: row.get(2)?,
            section_data: row.get::<_, Option<String>>(3)?.unwrap_or_else(|| "{}".to_string()),
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

const COLUMNS: &str = "id, imageset_id, section_name, section_data, created_at, updated_at";

impl Database {
    pub fn upsert_section(&self, imageset_id: i64, name: &str, data: &str) -> Result<i64> {
        let timestamp = now();
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM imageset_sections WHERE imageset_id = ? AND section_name = ?",
                params![imageset_id, name],
                |row| row.get(0),
            )
            .optional()
            .during("get section")?;

        match existing {
            Some(id) => {
                self.conn
                    .execute(
                        "UPDATE imageset_sections SET section_data = ?, updated_at = ? WHERE id = ?",
                        params![data, timestamp, id],
                    )
                    .during("update section")?;
                Ok(id)
            }
            None => {
                self.conn
                    .execute(
                        r#"
                        INSERT INTO imageset_sections
                            (imageset_id, section_name, section_data, created_at, updated_at)
                        VALUES (?, ?, ?, ?, ?)
                        "#,
                        params![imageset_id, name, data, timestamp, timestamp],
                    )
                    .during("insert section")?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }

    pub fn get_sections(&self, imageset_id: i64) -> Result<Vec<SectionRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM imageset_sections WHERE imageset_id = ? ORDER BY section_name",
                COLUMNS
            ))
            .during("list sections")?;
        let rows = stmt
            .query_map([imageset_id], SectionRow::from_row)
            .during("list sections")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .during("list sections")?;
        Ok(rows)
    }

    /// Delete every section of the imageset whose name is not in `keep`.
    pub fn delete_sections_except(&self, imageset_id: i64, keep: &[&str]) -> Result<usize> {
        let mut removed = 0;
        for row in self.get_sections(imageset_id)? {
            if !keep.contains(&row.section_name.as_str()) {
                removed += self
                    .conn
                    .execute("DELETE FROM imageset_sections WHERE id = ?", [row.id])
                    .during("delete section")?;
                tracing::debug!("Removed section {} of imageset {}", row.section_name, imageset_id);
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::open_temp;
    use crate::db::NewImageset;

    #[test]
    fn test_section_upsert_and_prune() {
        let (_dir, db) = open_temp();
        let folder_id = db.upsert_folder("new", "/images/new").unwrap();
        let id = db
            .upsert_imageset(folder_id, "shot", &NewImageset::default())
            .unwrap();

        let review = db.upsert_section(id, "review", r#"{"needs":"crop"}"#).unwrap();
        db.upsert_section(id, "biz", r#"{"good_for":"poster"}"#).unwrap();
        let again = db.upsert_section(id, "review", r#"{"needs":"upscale"}"#).unwrap();
        assert_eq!(review, again);

        let removed = db.delete_sections_except(id, &["review"]).unwrap();
        assert_eq!(removed, 1);

        let sections = db.get_sections(id).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section_data, r#"{"needs":"upscale"}"#);
    }

    #[test]
    fn test_sections_cascade_with_imageset() {
        let (_dir, db) = open_temp();
        let folder_id = db.upsert_folder("new", "/images/new").unwrap();
        let id = db
            .upsert_imageset(folder_id, "shot", &NewImageset::default())
            .unwrap();
        db.upsert_section(id, "review", "{}").unwrap();

        db.delete_imageset(id).unwrap();
        assert!(db.get_sections(id).unwrap().is_empty());
    }
}
