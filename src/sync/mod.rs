//! Import and export between text records and the catalog store.
//!
//! Both directions are caller-chosen overwrites: import replaces the store's
//! copy of top-level fields and sections with the text record, export does
//! the reverse. Nothing detects a record and a row that were both edited
//! since the last sync; whichever side is the destination loses its edits.

pub mod files;
pub mod interviews;

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db::{Database, ImagesetRow, NewImageset};
use crate::error::{BatchSummary, CatalogError, Result};
use crate::record::{Fields, ImagesetRecord, Section, Status, TextRecordStore};
use crate::scanner::{self, listing, Listing};

pub struct SyncEngine {
    config: Config,
    store: TextRecordStore,
}

impl SyncEngine {
    pub fn new(config: Config) -> Self {
        Self {
            store: TextRecordStore::new(&config.catalog),
            config,
        }
    }

    fn open(&self, operation: &str) -> Result<Database> {
        let db = Database::open(&self.config.db_path, operation)?;
        db.initialize()?;
        Ok(db)
    }

    pub fn initialize_schema(&self) -> Result<()> {
        self.open("initialize schema")?;
        tracing::info!("Catalog schema ready at {:?}", self.config.db_path);
        Ok(())
    }

    /// Import every imageset under each folder. Store failures abort the batch.
    pub fn import_all(&self, folders: &[PathBuf]) -> Result<BatchSummary> {
        let db = self.open("import")?;
        let mut summary = BatchSummary::default();
        for folder in folders {
            summary.absorb(self.import_folder(&db, folder)?);
        }
        tracing::info!("Import complete: {}", summary);
        Ok(summary)
    }

    pub fn export_all(&self, folders: &[PathBuf]) -> Result<BatchSummary> {
        let db = self.open("export")?;
        let mut summary = BatchSummary::default();
        for folder in folders {
            summary.absorb(self.export_folder(&db, folder)?);
        }
        tracing::info!("Export complete: {}", summary);
        Ok(summary)
    }

    pub fn import_imageset(&self, folder: &Path, name: &str) -> Result<()> {
        scanner::ensure_dir(&folder.join(name))?;
        let db = self.open("import")?;
        let folder_id = self.register_folder(&db, folder)?;
        self.import_into(&db, folder_id, folder, name)
    }

    /// Write one imageset's record from the store. Returns the record path.
    pub fn export_imageset(&self, folder: &Path, name: &str) -> Result<PathBuf> {
        let db = self.open("export")?;
        let not_found = || CatalogError::NotFound(format!("imageset {} in {:?}", name, folder));
        let folder_row = db
            .get_folder_by_name(&self.config.folder_name(folder))?
            .ok_or_else(not_found)?;
        self.export_from(&db, folder_row.id, folder, name)?
            .ok_or_else(not_found)
    }

    /// Upsert the folder row under its configured name.
    fn register_folder(&self, db: &Database, folder: &Path) -> Result<i64> {
        let path = std::fs::canonicalize(folder).unwrap_or_else(|_| folder.to_path_buf());
        db.upsert_folder(&self.config.folder_name(folder), &path.to_string_lossy())
    }

    fn imageset_dirs(&self, folder: &Path) -> Vec<String> {
        Listing::new(folder, self.config.catalog.reserved_prefix.clone())
            .dirs()
            .map(|entry| listing::entry_name(&entry))
            .collect()
    }

    fn import_folder(&self, db: &Database, folder: &Path) -> Result<BatchSummary> {
        scanner::ensure_dir(folder)?;
        let folder_id = self.register_folder(db, folder)?;
        let names = self.imageset_dirs(folder);
        tracing::info!("Importing {} imagesets from {:?}", names.len(), folder);

        let mut summary = BatchSummary::default();
        for name in &names {
            match self.import_into(db, folder_id, folder, name) {
                Ok(()) => summary.record_processed(name),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err @ CatalogError::MalformedRecord { .. }) => {
                    tracing::warn!("Skipping imageset {}: {}", name, err);
                    summary.record_skipped(name, err.to_string());
                }
                Err(err) => {
                    tracing::error!("Failed to import imageset {}: {}", name, err);
                    summary.record_failed(name, err.to_string());
                }
            }
        }

        // Imagesets whose folder is gone from disk go with it.
        for row in db.list_imagesets(folder_id)? {
            if !names.contains(&row.name) {
                tracing::warn!("Removing imageset {} from catalog: folder no longer exists", row.name);
                db.delete_imageset(row.id)?;
            }
        }

        Ok(summary)
    }

    /// Import one imageset inside a single transaction.
    fn import_into(&self, db: &Database, folder_id: i64, folder: &Path, name: &str) -> Result<()> {
        let imageset_dir = folder.join(name);
        // A synthesized record starts out new; a written one keeps whatever it states.
        let (record, status) = match self.store.load(&imageset_dir)? {
            Some(record) => {
                let status = record.status;
                (record, status)
            }
            None => (ImagesetRecord::empty(name), Some(Status::New)),
        };

        let tx = db
            .conn()
            .unchecked_transaction()
            .map_err(|source| CatalogError::Store {
                operation: format!("begin import of {}", name),
                source,
            })?;

        let values = NewImageset {
            folder_path: folder.to_string_lossy().to_string(),
            imageset_folder_path: imageset_dir.to_string_lossy().to_string(),
            status: status.map(|s| s.as_str().to_string()),
            edits: record.edits.clone(),
            needs: record.needs.clone(),
            good_for: record.good_for(),
            source: record.source.as_str().to_string(),
            prompt: record.prompt(),
        };
        let imageset_id = db.upsert_imageset(folder_id, name, &values)?;

        let mut kept: Vec<&str> = Vec::new();
        for (section_name, section) in &record.sections {
            if section.is_empty() {
                continue;
            }
            let data = Value::Object(section.fields().into_iter().collect()).to_string();
            db.upsert_section(imageset_id, section_name, &data)?;
            kept.push(section_name);
        }
        db.delete_sections_except(imageset_id, &kept)?;

        let files = files::sync_files(db, &self.config.catalog, imageset_id, &imageset_dir)?;
        db.set_image_paths(
            imageset_id,
            files.orig_image.as_deref().map(|p| p.to_string_lossy()).as_deref(),
            files.cover_image.as_deref().map(|p| p.to_string_lossy()).as_deref(),
        )?;

        let template = record
            .template_used()
            .unwrap_or_else(|| interviews::DEFAULT_TEMPLATE.to_string());
        interviews::import_interviews(db, imageset_id, &imageset_dir, &files, &template)?;

        tx.commit().map_err(|source| CatalogError::Store {
            operation: format!("commit import of {}", name),
            source,
        })?;

        tracing::debug!(
            "Imported {}: {} sections, {} files, {} stale file rows dropped",
            name,
            kept.len(),
            files.files.len(),
            files.removed
        );
        Ok(())
    }

    fn export_folder(&self, db: &Database, folder: &Path) -> Result<BatchSummary> {
        scanner::ensure_dir(folder)?;
        let names = self.imageset_dirs(folder);
        let mut summary = BatchSummary::default();

        let Some(folder_row) = db.get_folder_by_name(&self.config.folder_name(folder))? else {
            tracing::warn!("Folder {:?} is not in the catalog, nothing to export", folder);
            for name in &names {
                summary.record_skipped(name, "folder not in catalog");
            }
            return Ok(summary);
        };

        tracing::info!("Exporting {} imagesets to {:?}", names.len(), folder);
        for name in &names {
            match self.export_from(db, folder_row.id, folder, name) {
                Ok(Some(_)) => summary.record_processed(name),
                Ok(None) => summary.record_skipped(name, "not in catalog"),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::error!("Failed to export imageset {}: {}", name, err);
                    summary.record_failed(name, err.to_string());
                }
            }
        }
        Ok(summary)
    }

    fn export_from(
        &self,
        db: &Database,
        folder_id: i64,
        folder: &Path,
        name: &str,
    ) -> Result<Option<PathBuf>> {
        let Some(row) = db.get_imageset(folder_id, name)? else {
            tracing::debug!("Imageset {} has no catalog row", name);
            return Ok(None);
        };
        let imageset_dir = folder.join(name);

        let mut record = record_from_rows(db, &row)?;
        match self.store.load(&imageset_dir) {
            Ok(Some(existing)) => record.extras = existing.extras,
            Ok(None) => {}
            Err(err) => tracing::warn!("Replacing unreadable record for {}: {}", name, err),
        }

        let path = self.store.save(&imageset_dir, &record)?;
        for written in interviews::export_interviews(&db.list_interviews(row.id)?, &imageset_dir)? {
            tracing::info!("Restored interview artifact {:?}", written);
        }

        tracing::debug!("Exported {} to {:?}", name, path);
        Ok(Some(path))
    }
}

/// Rebuild a record from its imageset row and section rows.
fn record_from_rows(db: &Database, row: &ImagesetRow) -> Result<ImagesetRecord> {
    let mut record = ImagesetRecord::empty(&row.name);

    record.status = match row.status.as_deref().map(str::parse::<Status>) {
        Some(Ok(status)) => Some(status),
        Some(Err(reason)) => {
            tracing::warn!("Imageset {} has {} in the catalog", row.name, reason);
            None
        }
        None => None,
    };
    record.edits = row.edits.clone().unwrap_or_default();
    record.needs = row.needs.clone().unwrap_or_default();
    record.source = row
        .source
        .as_deref()
        .unwrap_or("")
        .parse()
        .unwrap_or_else(|reason| {
            tracing::warn!("Imageset {} has {} in the catalog", row.name, reason);
            Default::default()
        });

    for section in db.get_sections(row.id)? {
        match serde_json::from_str::<Value>(&section.section_data) {
            Ok(Value::Object(map)) => {
                let fields: Fields = map.into_iter().collect();
                record.sections.insert(
                    section.section_name.clone(),
                    Section::from_fields(&section.section_name, fields),
                );
            }
            _ => tracing::warn!(
                "Section {} of imageset {} is not a JSON object, leaving it out",
                section.section_name,
                row.name
            ),
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::text;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const RECORD: &str = r#"
imageset = "shot"
status = "keep"
edits = "crop"
needs = "review"
source = "midjourney"
rating = 4

[review]
needs = "upscale"

[biz]
good_for = "poster"
posted_to = "etsy"

[interview]
interview_date = "2025-01-02"
template_used = "etsy"
title = "A cat"
description = "A cat on a mat"

[midjourney]
description = "a cat Job ID: 1234"
prompt = "a cat"
jobid = "1234"
"#;

    struct Fixture {
        _root: TempDir,
        folder: PathBuf,
        engine: SyncEngine,
    }

    fn fixture() -> Fixture {
        let root = tempdir().unwrap();
        let folder = root.path().join("new");
        fs::create_dir_all(&folder).unwrap();

        let mut config = Config::default();
        config.db_path = root.path().join("db").join("catalog.db");
        config.folders.insert("new".to_string(), folder.clone());

        Fixture {
            folder,
            engine: SyncEngine::new(config),
            _root: root,
        }
    }

    fn add_imageset(folder: &Path, name: &str, record: Option<&str>) -> PathBuf {
        let dir = folder.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}_orig.png", name)), b"png").unwrap();
        fs::write(dir.join(format!("{}_thumb.png", name)), b"png").unwrap();
        if let Some(record) = record {
            fs::write(dir.join(format!("{}.toml", name)), record).unwrap();
        }
        dir
    }

    fn db(fx: &Fixture) -> Database {
        Database::open(&fx.engine.config.db_path, "test").unwrap()
    }

    /// Every row of every table, minus timestamps.
    fn snapshot(db: &Database) -> Vec<String> {
        let queries = [
            "SELECT id, name, path FROM folders",
            "SELECT id, folder_id, name, folder_path, imageset_folder_path, status, edits, needs, \
             good_for, source, prompt, cover_image_path, orig_image_path FROM imagesets",
            "SELECT id, imageset_id, section_name, section_data FROM imageset_sections",
            "SELECT id, imageset_id, interview_template, image_file_path, interview_response, \
             interview_raw, interview_parsed FROM interviews",
            "SELECT id, imageset_id, filename, fullpath, extension, file_type, file_size FROM imagesetfiles",
            "SELECT id, imagesetfile_id, tag FROM imagesetfile_tags",
        ];
        let mut rows = Vec::new();
        for query in queries {
            let mut stmt = db.conn().prepare(query).unwrap();
            let columns = stmt.column_count();
            let mut result = stmt.query([]).unwrap();
            while let Some(row) = result.next().unwrap() {
                let values: Vec<String> = (0..columns)
                    .map(|i| format!("{:?}", row.get_ref(i).unwrap()))
                    .collect();
                rows.push(format!("{}: {}", query, values.join("|")));
            }
        }
        rows
    }

    #[test]
    fn test_import_populates_store() {
        let fx = fixture();
        add_imageset(&fx.folder, "shot", Some(RECORD));

        let summary = fx.engine.import_all(&[fx.folder.clone()]).unwrap();
        assert_eq!(summary.processed, vec!["shot"]);

        let db = db(&fx);
        let folder = db.get_folder_by_name("new").unwrap().unwrap();
        let row = db.get_imageset(folder.id, "shot").unwrap().unwrap();
        assert_eq!(row.status.as_deref(), Some("keep"));
        assert_eq!(row.source.as_deref(), Some("midjourney"));
        assert_eq!(row.prompt.as_deref(), Some("a cat"));
        assert_eq!(row.good_for.as_deref(), Some("poster"));
        assert!(row.orig_image_path.unwrap().ends_with("shot_orig.png"));
        assert!(row.cover_image_path.unwrap().ends_with("shot_thumb.png"));

        let sections: Vec<String> = db
            .get_sections(row.id)
            .unwrap()
            .into_iter()
            .map(|s| s.section_name)
            .collect();
        assert_eq!(sections, vec!["biz", "interview", "midjourney", "review"]);
        assert_eq!(db.list_files(row.id).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_record_imports_as_new() {
        let fx = fixture();
        add_imageset(&fx.folder, "bare", None);

        fx.engine.import_all(&[fx.folder.clone()]).unwrap();

        let db = db(&fx);
        let folder = db.get_folder_by_name("new").unwrap().unwrap();
        let row = db.get_imageset(folder.id, "bare").unwrap().unwrap();
        assert_eq!(row.status.as_deref(), Some("new"));
        assert_eq!(row.source.as_deref(), Some("unknown"));
        assert_eq!(row.prompt, None);
        assert!(!fx.folder.join("bare/bare.toml").exists());
    }

    #[test]
    fn test_export_of_import_is_identity() {
        let fx = fixture();
        let dir = add_imageset(&fx.folder, "shot", Some(RECORD));
        let before = text::parse("shot", RECORD).unwrap();

        fx.engine.import_all(&[fx.folder.clone()]).unwrap();
        fs::remove_file(dir.join("shot.toml")).unwrap();
        fs::write(dir.join("shot.toml"), "rating = 4\n").unwrap();
        let summary = fx.engine.export_all(&[fx.folder.clone()]).unwrap();
        assert_eq!(summary.processed, vec!["shot"]);

        let after = text::parse("shot", &fs::read_to_string(dir.join("shot.toml")).unwrap()).unwrap();
        assert_eq!(after, before);
        assert!(ImagesetRecord::diff(&before, &after).is_empty());
    }

    #[test]
    fn test_round_trip_keeps_typed_values_and_absent_status() {
        let fx = fixture();
        let record = r#"
source = "fooocus"
rating = 4

[fooocus]
prompt = "a dog"
created = 2025-01-02
generated = 2025-01-02T10:30:00Z
steps = 30
guidance = 4.5
refine = true
styles = ["Fooocus V2", "Sharp"]

[interview]
interview_date = 2025-02-03
"#;
        let dir = add_imageset(&fx.folder, "dog", Some(record));
        let before = text::parse("dog", record).unwrap();

        fx.engine.import_all(&[fx.folder.clone()]).unwrap();
        let db = db(&fx);
        let folder = db.get_folder_by_name("new").unwrap().unwrap();
        assert_eq!(db.get_imageset(folder.id, "dog").unwrap().unwrap().status, None);

        fs::write(dir.join("dog.toml"), "rating = 4\n").unwrap();
        fx.engine.export_imageset(&fx.folder, "dog").unwrap();
        let written = fs::read_to_string(dir.join("dog.toml")).unwrap();
        let after = text::parse("dog", &written).unwrap();

        assert!(ImagesetRecord::diff(&before, &after).is_empty());
        assert_eq!(after.status, None);
        assert!(!written.contains("status"));
        assert!(written.contains("created = 2025-01-02\n"));
        assert!(written.contains("generated = 2025-01-02T10:30:00Z"));
        assert!(written.contains("guidance = 4.5"));
        assert!(written.contains("refine = true"));

        let created = after.section("fooocus").unwrap().fields()["created"].clone();
        assert_eq!(crate::record::datetime_text(&created), Some("2025-01-02"));
    }

    #[test]
    fn test_second_import_changes_nothing_but_timestamps() {
        let fx = fixture();
        add_imageset(&fx.folder, "shot", Some(RECORD));
        let other = add_imageset(&fx.folder, "other", None);
        fs::write(other.join("other_orig_interview.txt"), "Title: dog").unwrap();

        fx.engine.import_all(&[fx.folder.clone()]).unwrap();
        let first = snapshot(&db(&fx));
        fx.engine.import_all(&[fx.folder.clone()]).unwrap();
        let second = snapshot(&db(&fx));

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_import_follows_filesystem_and_record_changes() {
        let fx = fixture();
        let dir = add_imageset(&fx.folder, "shot", Some(RECORD));
        fx.engine.import_all(&[fx.folder.clone()]).unwrap();

        fs::remove_file(dir.join("shot_thumb.png")).unwrap();
        fs::rename(dir.join("shot_orig.png"), dir.join("shot_orig_v2.png")).unwrap();
        fs::write(
            dir.join("shot.toml"),
            "status = \"posted\"\nsource = \"midjourney\"\n\n[midjourney]\nprompt = \"a cat\"\n",
        )
        .unwrap();
        fx.engine.import_all(&[fx.folder.clone()]).unwrap();

        let db = db(&fx);
        let folder = db.get_folder_by_name("new").unwrap().unwrap();
        let row = db.get_imageset(folder.id, "shot").unwrap().unwrap();
        assert_eq!(row.status.as_deref(), Some("posted"));
        assert_eq!(row.good_for, None);

        let sections: Vec<String> = db
            .get_sections(row.id)
            .unwrap()
            .into_iter()
            .map(|s| s.section_name)
            .collect();
        assert_eq!(sections, vec!["midjourney"]);

        let files = db.list_files(row.id).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["shot.toml", "shot_orig_v2.png"]);
        assert_eq!(db.file_tags(files[1].id).unwrap(), vec!["orig", "v2"]);
    }

    #[test]
    fn test_malformed_record_is_skipped_not_fatal() {
        let fx = fixture();
        add_imageset(&fx.folder, "broken", Some("status = [\n"));
        add_imageset(&fx.folder, "fine", Some("status = \"edit\"\n"));

        let summary = fx.engine.import_all(&[fx.folder.clone()]).unwrap();

        assert_eq!(summary.processed, vec!["fine"]);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].0, "broken");
        assert!(summary.failed.is_empty());

        let db = db(&fx);
        let folder = db.get_folder_by_name("new").unwrap().unwrap();
        assert!(db.get_imageset(folder.id, "broken").unwrap().is_none());
    }

    #[test]
    fn test_vanished_imageset_is_removed() {
        let fx = fixture();
        add_imageset(&fx.folder, "shot", None);
        let gone = add_imageset(&fx.folder, "gone", None);
        fx.engine.import_all(&[fx.folder.clone()]).unwrap();

        fs::remove_dir_all(gone).unwrap();
        fx.engine.import_all(&[fx.folder.clone()]).unwrap();

        let db = db(&fx);
        let folder = db.get_folder_by_name("new").unwrap().unwrap();
        let names: Vec<String> = db
            .list_imagesets(folder.id)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["shot"]);
    }

    #[test]
    fn test_same_basename_folders_stay_separate() {
        let root = tempdir().unwrap();
        let first = root.path().join("a").join("new");
        let second = root.path().join("b").join("new");
        add_imageset(&first, "alpha", Some(RECORD));
        add_imageset(&second, "beta", None);

        let mut config = Config::default();
        config.db_path = root.path().join("catalog.db");
        config.folders.insert("archive_a".to_string(), first.clone());
        config.folders.insert("archive_b".to_string(), second.clone());
        let engine = SyncEngine::new(config.clone());

        let summary = engine.import_all(&config.folder_paths()).unwrap();
        assert_eq!(summary.processed, vec!["alpha", "beta"]);
        engine.import_all(&config.folder_paths()).unwrap();

        let db = Database::open(&config.db_path, "test").unwrap();
        let folders: Vec<String> = db
            .list_folders()
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(folders, vec!["archive_a", "archive_b"]);

        let a = db.get_folder_by_name("archive_a").unwrap().unwrap();
        let b = db.get_folder_by_name("archive_b").unwrap().unwrap();
        assert!(db.get_imageset(a.id, "alpha").unwrap().is_some());
        assert!(db.get_imageset(b.id, "beta").unwrap().is_some());
        assert!(db.get_imageset(b.id, "alpha").unwrap().is_none());

        let path = engine.export_imageset(&first, "alpha").unwrap();
        assert_eq!(path, first.join("alpha/alpha.toml"));
    }

    #[test]
    fn test_single_imageset_variants() {
        let fx = fixture();
        let dir = add_imageset(&fx.folder, "shot", Some(RECORD));

        fx.engine.import_imageset(&fx.folder, "shot").unwrap();
        fs::write(dir.join("shot.toml"), "").unwrap();
        let path = fx.engine.export_imageset(&fx.folder, "shot").unwrap();
        assert_eq!(path, dir.join("shot.toml"));

        let exported = text::parse("shot", &fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(exported.prompt().as_deref(), Some("a cat"));

        add_imageset(&fx.folder, "unknown", None);
        let err = fx.engine.export_imageset(&fx.folder, "unknown").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn test_export_skips_imagesets_missing_from_store() {
        let fx = fixture();
        add_imageset(&fx.folder, "shot", Some(RECORD));
        fx.engine.import_all(&[fx.folder.clone()]).unwrap();
        add_imageset(&fx.folder, "later", None);

        let summary = fx.engine.export_all(&[fx.folder.clone()]).unwrap();
        assert_eq!(summary.processed, vec!["shot"]);
        assert_eq!(summary.skipped, vec![("later".to_string(), "not in catalog".to_string())]);
        assert!(!fx.folder.join("later/later.toml").exists());
    }

    #[test]
    fn test_unreadable_store_is_fatal() {
        let fx = fixture();
        add_imageset(&fx.folder, "shot", None);
        let db_path = fx.engine.config.db_path.clone();
        fs::create_dir_all(db_path.parent().unwrap()).unwrap();
        fs::write(&db_path, vec![b'x'; 4096]).unwrap();

        let err = fx.engine.import_all(&[fx.folder.clone()]).unwrap_err();
        assert!(err.is_fatal());
    }
}
