//! TOML text records, one per imageset folder: `<imageset>/<imageset>.toml`.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Fields, ImagesetRecord, Section, Source, BIZ, INTERVIEW, REVIEW};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};

/// Parse the text of a record belonging to imageset `name`.
pub fn parse(name: &str, content: &str) -> Result<ImagesetRecord> {
    parse_at(name, content, Path::new(&format!("{}.toml", name)))
}

fn parse_at(name: &str, content: &str, path: &Path) -> Result<ImagesetRecord> {
    let malformed = |reason: String| CatalogError::MalformedRecord {
        imageset: name.to_string(),
        path: path.to_path_buf(),
        reason,
    };

    let table: toml::Table =
        toml::from_str(content).map_err(|e: toml::de::Error| malformed(e.message().to_string()))?;

    let mut record = ImagesetRecord::empty(name);
    for (key, value) in table {
        match key.as_str() {
            "imageset" => {
                let stated = scalar_string(&value);
                if !stated.is_empty() && stated != name {
                    tracing::warn!(
                        "Record {:?} names imageset '{}', using folder name '{}'",
                        path,
                        stated,
                        name
                    );
                }
            }
            "status" => {
                let status = scalar_string(&value);
                if !status.trim().is_empty() {
                    record.status = Some(status.parse().map_err(malformed)?);
                }
            }
            "edits" => record.edits = scalar_string(&value),
            "needs" => record.needs = scalar_string(&value),
            "source" => record.source = scalar_string(&value).parse().map_err(malformed)?,
            _ => match value {
                toml::Value::Table(table) => {
                    let section = Section::from_fields(&key, table_to_fields(&table));
                    if !section.is_empty() {
                        record.sections.insert(key, section);
                    }
                }
                other => {
                    record.extras.insert(key, other);
                }
            },
        }
    }

    // Older records carry a source section but never stated the source.
    if !record.source.is_known() {
        if let Some(source) = [Source::Fooocus, Source::Midjourney]
            .into_iter()
            .find(|s| record.sections.contains_key(s.as_str()))
        {
            tracing::info!("Detected source '{}' from sections in {:?}", source, path);
            record.source = source;
        }
    }

    Ok(record)
}

/// Render a record in canonical layout: top-level fields first, then
/// review, biz and interview, then every other section by name.
pub fn render(record: &ImagesetRecord) -> Result<String> {
    let mut doc = toml::Table::new();
    doc.insert(
        "imageset".to_string(),
        toml::Value::String(record.imageset.clone()),
    );
    if let Some(status) = record.status {
        doc.insert(
            "status".to_string(),
            toml::Value::String(status.as_str().to_string()),
        );
    }
    doc.insert("edits".to_string(), toml::Value::String(record.edits.clone()));
    doc.insert("needs".to_string(), toml::Value::String(record.needs.clone()));
    doc.insert(
        "source".to_string(),
        toml::Value::String(record.source.as_str().to_string()),
    );
    for (key, value) in &record.extras {
        if !doc.contains_key(key) && !record.sections.contains_key(key) {
            doc.insert(key.clone(), value.clone());
        }
    }

    let known = [REVIEW, BIZ, INTERVIEW];
    let ordered = known
        .iter()
        .filter_map(|name| record.sections.get_key_value(*name))
        .chain(
            record
                .sections
                .iter()
                .filter(|(name, _)| !known.contains(&name.as_str())),
        );
    for (name, section) in ordered {
        doc.insert(
            name.clone(),
            toml::Value::Table(fields_to_table(&section.fields())),
        );
    }

    toml::to_string_pretty(&doc).map_err(|e| CatalogError::MalformedRecord {
        imageset: record.imageset.clone(),
        path: PathBuf::from(format!("{}.toml", record.imageset)),
        reason: e.to_string(),
    })
}

fn scalar_string(value: &toml::Value) -> String {
    super::coerce_to_string(&toml_to_json(value))
}

pub fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => super::datetime_value(&dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(table_to_fields(table).into_iter().collect()),
    }
}

/// TOML has no null, so nulls are dropped wherever they appear.
pub fn json_to_toml(value: &Value) -> Option<toml::Value> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(toml::Value::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(toml::Value::Integer(i)),
            None => n.as_f64().map(toml::Value::Float),
        },
        Value::String(s) => Some(toml::Value::String(s.clone())),
        Value::Array(items) => Some(toml::Value::Array(
            items.iter().filter_map(json_to_toml).collect(),
        )),
        Value::Object(map) => match super::datetime_text(value) {
            Some(text) => Some(
                text.parse::<toml::value::Datetime>()
                    .map(toml::Value::Datetime)
                    .unwrap_or_else(|_| toml::Value::String(text.to_string())),
            ),
            None => Some(toml::Value::Table(
                map.iter()
                    .filter_map(|(k, v)| json_to_toml(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        },
    }
}

fn table_to_fields(table: &toml::Table) -> Fields {
    table
        .iter()
        .map(|(k, v)| (k.clone(), toml_to_json(v)))
        .collect()
}

fn fields_to_table(fields: &Fields) -> toml::Table {
    fields
        .iter()
        .filter_map(|(k, v)| json_to_toml(v).map(|v| (k.clone(), v)))
        .collect()
}

/// Windows-1252 characters for bytes 0x80..=0x9F. Curly quotes and dashes
/// are folded to ASCII; the five unassigned bytes become U+FFFD.
const CP1252_HIGH: [char; 32] = [
    '€', '\u{FFFD}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{FFFD}', 'Ž',
    '\u{FFFD}', '\u{FFFD}', '\'', '\'', '"', '"', '•', '-', '-', '˜', '™', 'š', '›', 'œ',
    '\u{FFFD}', 'ž', 'Ÿ',
];

/// Decode bytes that are not UTF-8 as Windows-1252, the usual culprit for
/// records pasted from other tools.
fn decode_lossy(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[usize::from(b - 0x80)],
            _ => char::from(b),
        })
        .collect()
}

/// Reads and writes `<dir>/<dir name>.<ext>` records.
#[derive(Debug, Clone)]
pub struct TextRecordStore {
    extension: String,
}

impl TextRecordStore {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            extension: config.record_extension.clone(),
        }
    }

    pub fn path_for(&self, imageset_dir: &Path) -> PathBuf {
        imageset_dir.join(format!("{}.{}", imageset_name(imageset_dir), self.extension))
    }

    /// `Ok(None)` when the folder has no record yet.
    pub fn load(&self, imageset_dir: &Path) -> Result<Option<ImagesetRecord>> {
        let path = self.path_for(imageset_dir);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CatalogError::io(&path, e)),
        };

        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Record {:?} is not UTF-8, decoding as Windows-1252", path);
                decode_lossy(e.as_bytes())
            }
        };

        parse_at(&imageset_name(imageset_dir), &content, &path).map(Some)
    }

    pub fn load_or_empty(&self, imageset_dir: &Path) -> Result<ImagesetRecord> {
        Ok(self
            .load(imageset_dir)?
            .unwrap_or_else(|| ImagesetRecord::empty(&imageset_name(imageset_dir))))
    }

    /// Write the record, replacing any existing file.
    pub fn save(&self, imageset_dir: &Path, record: &ImagesetRecord) -> Result<PathBuf> {
        let path = self.path_for(imageset_dir);
        let content = render(record)?;

        let tmp = path.with_extension(format!("{}.tmp", self.extension));
        fs::write(&tmp, content).map_err(|e| CatalogError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| CatalogError::io(&path, e))?;

        tracing::debug!("Saved record {:?}", path);
        Ok(path)
    }
}

pub fn imageset_name(imageset_dir: &Path) -> String {
    imageset_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
