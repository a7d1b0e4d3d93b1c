//! Interview artifacts: `<base>_interview.txt` holds the response, with an
//! optional `<base>_interview_raw.txt` (raw JSON) and `<base>_interview.json`
//! (parsed JSON) next to it.

use std::fs;
use std::path::{Path, PathBuf};

use super::files::{FileSync, FileType};
use crate::db::{Database, InterviewRow, NewInterview};
use crate::error::{CatalogError, Result};

pub const DEFAULT_TEMPLATE: &str = "default";

const RESPONSE_SUFFIX: &str = "_interview.txt";
const RAW_SUFFIX: &str = "_interview_raw.txt";
const PARSED_SUFFIX: &str = "_interview.json";

/// Store every interview found among the imageset's files. Returns how many were stored.
pub fn import_interviews(
    db: &Database,
    imageset_id: i64,
    imageset_dir: &Path,
    files: &FileSync,
    template: &str,
) -> Result<usize> {
    let image_path = files.orig_image.clone().or_else(|| {
        files
            .files
            .iter()
            .find(|f| f.file_type == FileType::Image)
            .map(|f| f.path.clone())
    });

    let mut stored = 0;
    for file in files
        .files
        .iter()
        .filter(|f| f.file_type == FileType::Interview)
    {
        let Some(base) = file.filename.strip_suffix(RESPONSE_SUFFIX) else {
            continue;
        };
        let Some(image_path) = image_path.as_ref() else {
            tracing::warn!("Interview {:?} has no image to attach to", file.path);
            continue;
        };

        let response = fs::read_to_string(&file.path).map_err(|e| CatalogError::io(&file.path, e))?;
        let interview = NewInterview {
            interview_template: template.to_string(),
            image_file_path: image_path.to_string_lossy().to_string(),
            interview_response: Some(response),
            interview_raw: read_json(&imageset_dir.join(format!("{}{}", base, RAW_SUFFIX))),
            interview_parsed: read_json(&imageset_dir.join(format!("{}{}", base, PARSED_SUFFIX))),
        };
        db.upsert_interview(imageset_id, &interview)?;
        stored += 1;
    }

    Ok(stored)
}

/// JSON file contents, or `None` when missing or not JSON.
fn read_json(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(_) => Some(content),
        Err(e) => {
            tracing::warn!("Ignoring {:?}: not valid JSON ({})", path, e);
            None
        }
    }
}

/// Write interview files for stored interviews that have none on disk yet.
///
/// Existing artifacts are left alone.
pub fn export_interviews(interviews: &[InterviewRow], imageset_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for interview in interviews {
        let base = Path::new(&interview.image_file_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if base.is_empty() {
            continue;
        }

        let artifacts = [
            (RESPONSE_SUFFIX, &interview.interview_response),
            (RAW_SUFFIX, &interview.interview_raw),
            (PARSED_SUFFIX, &interview.interview_parsed),
        ];
        for (suffix, content) in artifacts {
            let Some(content) = content else {
                continue;
            };
            let path = imageset_dir.join(format!("{}{}", base, suffix));
            if path.exists() {
                continue;
            }
            fs::write(&path, content).map_err(|e| CatalogError::io(&path, e))?;
            written.push(path);
        }
    }
    Ok(written)
}
