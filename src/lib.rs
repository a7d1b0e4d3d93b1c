//! Catalog of generated imagesets.
//!
//! A batch pass runs scanner, extractor and sync engine in that order:
//! [`scanner::Scanner`] repairs folder structure, [`metadata::MetadataExtractor`]
//! fills source sections from the original image, and [`sync::SyncEngine`]
//! moves records between `<imageset>.toml` files and the SQLite catalog.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod record;
pub mod scanner;
pub mod sync;

pub use config::Config;
pub use error::{BatchSummary, CatalogError, Result};
