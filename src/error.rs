//! Error types for catalog operations.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// A text record that cannot be parsed. The imageset is skipped.
    #[error("Malformed record for imageset '{imageset}' at {}: {reason}", path.display())]
    MalformedRecord {
        imageset: String,
        path: PathBuf,
        reason: String,
    },

    /// No single image qualifies as the original. The imageset is flagged.
    #[error("No original image for imageset '{imageset}': {reason}")]
    MissingOriginal { imageset: String, reason: String },

    /// A recognized source whose payload could not be decoded.
    #[error("Malformed {source_name} payload for imageset '{imageset}': {reason}")]
    MalformedPayload {
        imageset: String,
        source_name: String,
        reason: String,
    },

    /// The relational store could not be opened. Fatal for the batch.
    #[error("Cannot open catalog store at {} during {operation}: {source}", target.display())]
    StoreConnection {
        operation: String,
        target: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A read or write against the relational store failed. Fatal for the batch.
    #[error("Catalog store error during {operation}: {source}")]
    Store {
        operation: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Filesystem error at {}: {source}", path.display())]
    FilesystemIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An image that could not be decoded or encoded.
    #[error("Image error at {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A batch update value outside the configured vocabulary.
    #[error("'{value}' is not an allowed {field} value (allowed: {})", allowed.join(", "))]
    InvalidValue {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl CatalogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::FilesystemIo {
            path: path.into(),
            source,
        }
    }

    /// Whether the error should abort the whole batch rather than one imageset.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CatalogError::StoreConnection { .. } | CatalogError::Store { .. }
        )
    }
}

/// Attach the operation name to a store error.
pub(crate) trait StoreContext<T> {
    fn during(self, operation: &str) -> Result<T>;
}

impl<T> StoreContext<T> for std::result::Result<T, rusqlite::Error> {
    fn during(self, operation: &str) -> Result<T> {
        self.map_err(|source| CatalogError::Store {
            operation: operation.to_string(),
            source,
        })
    }
}

/// Outcome of a batch pass: which imagesets went through, which were
/// skipped on purpose, and which failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: Vec<String>,
    pub skipped: Vec<(String, String)>,
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn record_processed(&mut self, imageset: impl Into<String>) {
        self.processed.push(imageset.into());
    }

    pub fn record_skipped(&mut self, imageset: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push((imageset.into(), reason.into()));
    }

    pub fn record_failed(&mut self, imageset: impl Into<String>, reason: impl Into<String>) {
        self.failed.push((imageset.into(), reason.into()));
    }

    pub fn absorb(&mut self, other: BatchSummary) {
        self.processed.extend(other.processed);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} failed",
            self.processed.len(),
            self.skipped.len(),
            self.failed.len()
        )?;
        for (name, reason) in &self.skipped {
            write!(f, "\n  skipped {}: {}", name, reason)?;
        }
        for (name, reason) in &self.failed {
            write!(f, "\n  failed {}: {}", name, reason)?;
        }
        Ok(())
    }
}
