//! Setting one field to the same value across many imagesets.

use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::{Fields, ImagesetRecord, Section, Status, TextRecordStore, BIZ};
use crate::config::{CatalogConfig, VocabularyConfig};
use crate::error::{BatchSummary, CatalogError, Result};
use crate::scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateField {
    Status,
    Edits,
    Needs,
    GoodFor,
    PostedTo,
}

impl UpdateField {
    pub const ALL: [UpdateField; 5] = [
        UpdateField::Status,
        UpdateField::Edits,
        UpdateField::Needs,
        UpdateField::GoodFor,
        UpdateField::PostedTo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateField::Status => "status",
            UpdateField::Edits => "edits",
            UpdateField::Needs => "needs",
            UpdateField::GoodFor => "good_for",
            UpdateField::PostedTo => "posted_to",
        }
    }
}

impl FromStr for UpdateField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        UpdateField::ALL
            .into_iter()
            .find(|field| field.as_str() == s.trim())
            .ok_or_else(|| format!("unknown field '{}'", s))
    }
}

impl fmt::Display for UpdateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated field assignment, ready to run over a list of imagesets.
#[derive(Debug, Clone)]
pub struct BatchUpdate {
    field: UpdateField,
    value: String,
    store: TextRecordStore,
}

impl BatchUpdate {
    /// Fails with `InvalidValue` unless `value` is in the field's vocabulary.
    pub fn new(
        catalog: &CatalogConfig,
        vocabulary: &VocabularyConfig,
        field: UpdateField,
        value: &str,
    ) -> Result<Self> {
        let allowed: Vec<String> = match field {
            UpdateField::Status => Status::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            UpdateField::Edits => vocabulary.edits.clone(),
            UpdateField::Needs => vocabulary.needs.clone(),
            UpdateField::GoodFor => vocabulary.good_for.clone(),
            UpdateField::PostedTo => vocabulary.posted_to.clone(),
        };
        if !allowed.iter().any(|a| a == value) {
            return Err(CatalogError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                allowed,
            });
        }

        Ok(Self {
            field,
            value: value.to_string(),
            store: TextRecordStore::new(catalog),
        })
    }

    /// Update every named imageset under `parent`, saving each record as it goes.
    pub fn apply(&self, parent: &Path, imagesets: &[String]) -> Result<BatchSummary> {
        scanner::ensure_dir(parent)?;
        tracing::info!(
            "Setting {} = {} on {} imagesets in {:?}",
            self.field,
            self.value,
            imagesets.len(),
            parent
        );

        let mut summary = BatchSummary::default();
        for name in imagesets {
            match self.apply_one(&parent.join(name)) {
                Ok(()) => summary.record_processed(name),
                Err(err @ CatalogError::MalformedRecord { .. }) => {
                    tracing::warn!("Skipping imageset {}: {}", name, err);
                    summary.record_skipped(name, err.to_string());
                }
                Err(err) => {
                    tracing::error!("Failed to update imageset {}: {}", name, err);
                    summary.record_failed(name, err.to_string());
                }
            }
        }

        tracing::info!("Batch update complete: {}", summary);
        Ok(summary)
    }

    fn apply_one(&self, imageset_dir: &Path) -> Result<()> {
        scanner::ensure_dir(imageset_dir)?;
        let mut record = self.store.load_or_empty(imageset_dir)?;
        self.set(&mut record);
        self.store.save(imageset_dir, &record)?;
        Ok(())
    }

    /// Write the value into one record.
    pub fn set(&self, record: &mut ImagesetRecord) {
        match self.field {
            UpdateField::Status => {
                if let Ok(status) = self.value.parse::<Status>() {
                    record.status = Some(status);
                }
            }
            UpdateField::Edits => record.edits = self.value.clone(),
            UpdateField::Needs => record.needs = self.value.clone(),
            UpdateField::GoodFor | UpdateField::PostedTo => record
                .sections
                .entry(BIZ.to_string())
                .or_insert_with(|| Section::from_fields(BIZ, Fields::new()))
                .set(self.field.as_str(), Value::String(self.value.clone())),
        }
    }
}
