//! Interview artifacts, one row per (imageset, template).

use rusqlite::{params, OptionalExtension, Row};

use super::{now, Database};
use crate::error::{Result, StoreContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewRow {
    pub id: i64,
    pub imageset_id: i64,
    pub interview_template: String,
    pub image_file_path: String,
    pub interview_response: Option<String>,
    pub interview_raw: Option<String>,
    pub interview_parsed: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl InterviewRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            imageset_id: row.get(1)?,
            interview_template: row.get(2)?,
            image_file_path: row.get(3)?,
            interview_response: row.get(4)?,
            interview_raw: row.get(5)?,
            interview_parsed: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewInterview {
    pub interview_template: String,
    pub image_file_path: String,
    pub interview_response: Option<String>,
    pub interview_raw: Option<String>,
    pub interview_parsed: Option<String>,
}

const COLUMNS: &str = "id, imageset_id, interview_template, image_file_path, interview_response, \
                       interview_raw, interview_parsed, created_at, updated_at";

impl Database {
    pub fn upsert_interview(&self, imageset_id: i64, interview: &NewInterview) -> Result<i64> {
        let timestamp = now();
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM interviews WHERE imageset_id = ? AND interview_template = ?",
                params![imageset_id, interview.interview_template],
                |row| row.get(0),
            )
            .optional()
            .during("get interview")?;

        match existing {
            Some(id) => {
                self.conn
                    .execute(
                        r#"
                        UPDATE interviews
                        SET image_file_path = ?, interview_response = ?, interview_raw = ?,
                            interview_parsed = ?, updated_at = ?
                        WHERE id = ?
                        "#,
                        params![
                            interview.image_file_path,
                            interview.interview_response,
                            interview.interview_raw,
                            interview.interview_parsed,
                            timestamp,
                            id
                        ],
                    )
                    .during("update interview")?;
                Ok(id)
            }
            None => {
                self.conn
                    .execute(
                        r#"
                        INSERT INTO interviews (
                            imageset_id, interview_template, image_file_path, interview_response,
                            interview_raw, interview_parsed, created_at, updated_at
                        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                        "#,
                        params![
                            imageset_id,
                            interview.interview_template,
                            interview.image_file_path,
                            interview.interview_response,
                            interview.interview_raw,
                            interview.interview_parsed,
                            timestamp,
                            timestamp
                        ],
                    )
                    .during("insert interview")?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }

    pub fn list_interviews(&self, imageset_id: i64) -> Result<Vec<InterviewRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM interviews WHERE imageset_id = ? ORDER BY interview_template",
                COLUMNS
            ))
            .during("list interviews")?;
        let rows = stmt
            .query_map([imageset_id], InterviewRow::from_row)
            .during("list interviews")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .during("list interviews")?;
        Ok(rows)
    }
}
