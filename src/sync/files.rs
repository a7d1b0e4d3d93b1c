//! File and tag rows mirror the live contents of an imageset folder.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::CatalogConfig;
use crate::db::{Database, NewFile};
use crate::error::Result;
use crate::scanner::listing::{self, Listing};
use crate::scanner::{extract_tags, FileTags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Image,
    Record,
    Text,
    Interview,
    Other,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Record => "record",
            FileType::Text => "text",
            FileType::Interview => "interview",
            FileType::Other => "other",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const INTERVIEW_TAG: &str = "interview";

/// Classify a file: record, interview artifact, image, plain text, other.
pub fn classify(catalog: &CatalogConfig, filename: &str, tags: &FileTags) -> FileType {
    let extension = tags.extension.to_lowercase();
    if extension == catalog.record_extension.to_lowercase() {
        FileType::Record
    } else if tags.has(INTERVIEW_TAG) || filename.to_lowercase().contains(INTERVIEW_TAG) {
        FileType::Interview
    } else if catalog.is_image_extension(&extension) {
        FileType::Image
    } else if extension == "txt" {
        FileType::Text
    } else {
        FileType::Other
    }
}

/// One file seen on disk during an import.
#[derive(Debug, Clone)]
pub struct LiveFile {
    pub filename: String,
    pub path: PathBuf,
    pub tags: FileTags,
    pub file_type: FileType,
}

#[derive(Debug, Clone, Default)]
pub struct FileSync {
    pub files: Vec<LiveFile>,
    pub orig_image: Option<PathBuf>,
    pub cover_image: Option<PathBuf>,
    pub removed: usize,
}

/// Bring the imageset's file and tag rows in line with `imageset_dir`.
pub fn sync_files(
    db: &Database,
    catalog: &CatalogConfig,
    imageset_id: i64,
    imageset_dir: &Path,
) -> Result<FileSync> {
    let mut sync = FileSync::default();

    for entry in Listing::new(imageset_dir, catalog.reserved_prefix.clone()).files() {
        let filename = listing::entry_name(&entry);
        let size = match entry.metadata() {
            Ok(metadata) => metadata.len() as i64,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", entry.path(), e);
                continue;
            }
        };
        let tags = extract_tags(&filename, &catalog.file_tags);
        let file_type = classify(catalog, &filename, &tags);

        let file_id = db.upsert_file(
            imageset_id,
            &NewFile {
                filename: filename.clone(),
                fullpath: entry.path().to_string_lossy().to_string(),
                extension: tags.extension.clone(),
                file_type: file_type.as_str().to_string(),
                file_size: size,
            },
        )?;
        db.sync_file_tags(file_id, &tags.tags)?;

        sync.files.push(LiveFile {
            filename,
            path: entry.into_path(),
            tags,
            file_type,
        });
    }

    let keep: Vec<&str> = sync.files.iter().map(|f| f.filename.as_str()).collect();
    sync.removed = db.delete_files_except(imageset_id, &keep)?;

    let images: Vec<&LiveFile> = sync
        .files
        .iter()
        .filter(|f| f.file_type == FileType::Image)
        .collect();
    let originals: Vec<&LiveFile> = images
        .iter()
        .copied()
        .filter(|f| f.tags.has(&catalog.orig_tag))
        .collect();
    if originals.len() > 1 {
        tracing::warn!(
            "{} images tagged {} in {:?}, using {}",
            originals.len(),
            catalog.orig_tag,
            imageset_dir,
            originals[0].filename
        );
    }

    sync.orig_image = originals.first().map(|f| f.path.clone());
    sync.cover_image = images
        .iter()
        .find(|f| f.tags.has(&catalog.thumb_tag))
        .or_else(|| originals.first())
        .or_else(|| images.first())
        .map(|f| f.path.clone());

    Ok(sync)
}
