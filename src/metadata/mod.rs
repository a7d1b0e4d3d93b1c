//! Source metadata extraction from original images.

pub mod embedded;

use std::path::Path;

use serde_json::Value;

use crate::config::{Config, FooocusSource, MidjourneySource};
use crate::error::{BatchSummary, CatalogError, Result};
use crate::record::{Fields, ImagesetRecord, Section, Source, TextRecordStore};
use crate::scanner::{self, Scanner};

pub use embedded::{read_embedded_fields, EmbeddedFields};

/// What happened to one imageset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Fooocus,
    Midjourney,
    /// No sentinel matched; the record is left alone.
    Unrecognized,
    /// The record already has a prompt for a known source.
    AlreadyPopulated,
    NoOriginal,
}

pub struct MetadataExtractor {
    scanner: Scanner,
    store: TextRecordStore,
    fooocus: FooocusSource,
    midjourney: MidjourneySource,
}

impl MetadataExtractor {
    pub fn new(config: Config) -> Self {
        Self {
            store: TextRecordStore::new(&config.catalog),
            scanner: Scanner::new(config.catalog),
            fooocus: config.sources.fooocus,
            midjourney: config.sources.midjourney,
        }
    }

    /// Extract every listed imageset under `parent`, saving each record as it goes.
    pub fn extract_folder(&self, parent: &Path, imagesets: &[String]) -> Result<BatchSummary> {
        scanner::ensure_dir(parent)?;
        tracing::info!("Extracting metadata for {} imagesets in {:?}", imagesets.len(), parent);

        let mut summary = BatchSummary::default();
        for name in imagesets {
            match self.extract_imageset(parent, name) {
                Ok(Extraction::NoOriginal) => summary.record_skipped(name, "no original image"),
                Ok(Extraction::AlreadyPopulated) => {
                    summary.record_skipped(name, "source metadata already present")
                }
                Ok(_) => summary.record_processed(name),
                Err(err) => {
                    tracing::error!("Metadata extraction failed for {}: {}", name, err);
                    summary.record_failed(name, err.to_string());
                }
            }
        }

        tracing::info!("Metadata extraction for {:?}: {}", parent, summary);
        Ok(summary)
    }

    pub fn extract_imageset(&self, parent: &Path, name: &str) -> Result<Extraction> {
        let imageset_dir = parent.join(name);

        let Some(original) = self.scanner.find_original(&imageset_dir) else {
            tracing::warn!("No original image found for {}", name);
            return Ok(Extraction::NoOriginal);
        };

        let record = self.store.load_or_empty(&imageset_dir)?;
        if record.prompt().is_some() {
            tracing::debug!("{} metadata already exists for {}", record.source, name);
            return Ok(Extraction::AlreadyPopulated);
        }

        let fields = read_embedded_fields(&original)?;
        let Some((source, section)) = self.classify(name, &fields)? else {
            tracing::debug!("No recognizable source metadata in {:?}", original);
            return Ok(Extraction::Unrecognized);
        };

        let mut incoming = ImagesetRecord::empty(name);
        incoming.source = source;
        incoming
            .sections
            .insert(source.as_str().to_string(), section);

        let merged = ImagesetRecord::merge(&record, &incoming);
        self.store.save(&imageset_dir, &merged)?;
        tracing::info!("Extracted {} metadata for {}", source, name);

        Ok(match source {
            Source::Fooocus => Extraction::Fooocus,
            _ => Extraction::Midjourney,
        })
    }

    /// Match the embedded fields against each generator's sentinel, Fooocus first.
    fn classify(&self, name: &str, fields: &EmbeddedFields) -> Result<Option<(Source, Section)>> {
        let sentinel = |field: &str, expected: &str| {
            embedded::lookup(fields, field)
                .map(|value| value.trim().eq_ignore_ascii_case(expected))
                .unwrap_or(false)
        };

        if sentinel(&self.fooocus.scheme_field, &self.fooocus.scheme_value) {
            let payload = embedded::lookup(fields, &self.fooocus.payload_field).unwrap_or("");
            let parsed = parse_fooocus(payload).map_err(|reason| CatalogError::MalformedPayload {
                imageset: name.to_string(),
                source_name: Source::Fooocus.to_string(),
                reason,
            })?;
            return Ok(Some((
                Source::Fooocus,
                Section::from_fields(Source::Fooocus.as_str(), parsed),
            )));
        }

        if sentinel(&self.midjourney.author_field, &self.midjourney.author) {
            let Some(description) = embedded::lookup(fields, &self.midjourney.payload_field) else {
                return Err(CatalogError::MalformedPayload {
                    imageset: name.to_string(),
                    source_name: Source::Midjourney.to_string(),
                    reason: format!("missing {}", self.midjourney.payload_field),
                });
            };
            let parsed = parse_midjourney(description, &self.midjourney.job_marker);
            return Ok(Some((
                Source::Midjourney,
                Section::from_fields(Source::Midjourney.as_str(), parsed),
            )));
        }

        Ok(None)
    }
}

/// Decode a Fooocus parameters document. Top-level nulls are dropped.
pub fn parse_fooocus(payload: &str) -> std::result::Result<Fields, String> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        Ok(other) => Err(format!("expected a JSON object, found {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Split a Midjourney description into prompt and job id around `marker`.
pub fn parse_midjourney(description: &str, marker: &str) -> Fields {
    let (prompt, jobid) = match description.split_once(marker) {
        Some((before, after)) => (
            before.trim(),
            after.split_whitespace().next().unwrap_or(""),
        ),
        None => (description.trim(), ""),
    };

    let mut fields = Fields::new();
    fields.insert("description".to_string(), Value::String(description.to_string()));
    fields.insert("prompt".to_string(), Value::String(prompt.to_string()));
    fields.insert("jobid".to_string(), Value::String(jobid.to_string()));
    fields
}

#[cfg(test)]
mod tests {
    use super::embedded::fixtures::write_png;
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn extractor() -> MetadataExtractor {
        MetadataExtractor::new(Config::default())
    }

    fn imageset(parent: &Path, name: &str, chunks: &[(&str, &str)]) -> std::path::PathBuf {
        let dir = parent.join(name);
        fs::create_dir_all(&dir).unwrap();
        write_png(&dir.join(format!("{}_orig.png", name)), chunks);
        dir
    }

    fn load(dir: &Path) -> ImagesetRecord {
        TextRecordStore::new(&Config::default().catalog)
            .load(dir)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_fooocus_payload_becomes_section() {
        let parent = tempdir().unwrap();
        let dir = imageset(
            parent.path(),
            "shot",
            &[
                ("fooocus_scheme", "fooocus"),
                ("parameters", r#"{"prompt":"a cat","seed":"123","lora":null}"#),
            ],
        );

        let outcome = extractor().extract_imageset(parent.path(), "shot").unwrap();
        assert_eq!(outcome, Extraction::Fooocus);

        let record = load(&dir);
        assert_eq!(record.source, Source::Fooocus);
        assert_eq!(record.prompt().as_deref(), Some("a cat"));
        let fields = record.section("fooocus").unwrap().fields();
        assert_eq!(fields.get("seed"), Some(&json!("123")));
        assert!(!fields.contains_key("lora"));
    }

    #[test]
    fn test_existing_prompt_is_not_overwritten() {
        let parent = tempdir().unwrap();
        let dir = imageset(
            parent.path(),
            "shot",
            &[
                ("fooocus_scheme", "fooocus"),
                ("parameters", r#"{"prompt":"a cat","seed":"123"}"#),
            ],
        );
        fs::write(
            dir.join("shot.toml"),
            "source = \"fooocus\"\n\n[fooocus]\nPrompt = \"a hand-written dog\"\n",
        )
        .unwrap();
        let before = fs::read_to_string(dir.join("shot.toml")).unwrap();

        let outcome = extractor().extract_imageset(parent.path(), "shot").unwrap();

        assert_eq!(outcome, Extraction::AlreadyPopulated);
        assert_eq!(fs::read_to_string(dir.join("shot.toml")).unwrap(), before);
    }

    #[test]
    fn test_midjourney_description_is_split() {
        let parent = tempdir().unwrap();
        let dir = imageset(
            parent.path(),
            "mj",
            &[
                ("Author", "aardvark_fike"),
                ("Description", "a cat on a mat --ar 3:2 Job ID: 0f2c-77aa"),
            ],
        );
        fs::write(dir.join("mj.toml"), "status = \"keep\"\n\n[biz]\ngood_for = \"poster\"\n").unwrap();

        let outcome = extractor().extract_imageset(parent.path(), "mj").unwrap();
        assert_eq!(outcome, Extraction::Midjourney);

        let record = load(&dir);
        assert_eq!(record.source, Source::Midjourney);
        assert_eq!(record.good_for().as_deref(), Some("poster"));
        let fields = record.section("midjourney").unwrap().fields();
        assert_eq!(fields["prompt"], json!("a cat on a mat --ar 3:2"));
        assert_eq!(fields["jobid"], json!("0f2c-77aa"));
        assert_eq!(
            fields["description"],
            json!("a cat on a mat --ar 3:2 Job ID: 0f2c-77aa")
        );
    }

    #[test]
    fn test_unrecognized_image_writes_nothing() {
        let parent = tempdir().unwrap();
        let dir = imageset(parent.path(), "plain", &[("Software", "paint")]);

        let outcome = extractor().extract_imageset(parent.path(), "plain").unwrap();
        assert_eq!(outcome, Extraction::Unrecognized);
        assert!(!dir.join("plain.toml").exists());
    }

    #[test]
    fn test_bad_fooocus_json_fails_that_imageset_only() {
        let parent = tempdir().unwrap();
        let bad = imageset(
            parent.path(),
            "bad",
            &[("fooocus_scheme", "fooocus"), ("parameters", "[1, 2]")],
        );
        imageset(
            parent.path(),
            "good",
            &[("Author", "aardvark_fike"), ("Description", "a dog Job ID: 42")],
        );
        fs::create_dir_all(parent.path().join("empty")).unwrap();

        let names: Vec<String> = ["bad", "empty", "good"].iter().map(|s| s.to_string()).collect();
        let summary = extractor().extract_folder(parent.path(), &names).unwrap();

        assert_eq!(summary.processed, vec!["good"]);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].0, "empty");
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "bad");
        assert!(summary.failed[0].1.contains("an array"));
        assert!(!bad.join("bad.toml").exists());
    }

    #[test]
    fn test_parse_midjourney_without_marker() {
        let fields = parse_midjourney("  just a prompt ", "Job ID:");
        assert_eq!(fields["prompt"], json!("just a prompt"));
        assert_eq!(fields["jobid"], json!(""));
    }
}
