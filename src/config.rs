use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Registered parent folders, keyed by their stable name.
    #[serde(default)]
    pub folders: BTreeMap<String, PathBuf>,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Filename suffix tags, tried in this order.
    #[serde(default = "default_file_tags")]
    pub file_tags: Vec<String>,

    #[serde(default = "default_orig_tag")]
    pub orig_tag: String,

    #[serde(default = "default_thumb_tag")]
    pub thumb_tag: String,

    /// Longest edge, in pixels, of generated thumbnails.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,

    /// Entries starting with this prefix belong to generated output and are never touched.
    #[serde(default = "default_reserved_prefix")]
    pub reserved_prefix: String,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    #[serde(default = "default_record_extension")]
    pub record_extension: String,
}

fn default_file_tags() -> Vec<String> {
    [
        "orig", "thumb", "v2", "v3", "v4", "v5", "up2", "up3", "up4", "up6", "interview", "raw",
        "watermark",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

fn default_orig_tag() -> String {
    "orig".to_string()
}

fn default_thumb_tag() -> String {
    "thumb".to_string()
}

fn default_thumbnail_size() -> u32 {
    500
}

fn default_reserved_prefix() -> String {
    "_".to_string()
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "jpg".to_string(),
        "jpeg".to_string(),
        "png".to_string(),
        "gif".to_string(),
        "bmp".to_string(),
        "webp".to_string(),
    ]
}

fn default_record_extension() -> String {
    "toml".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            file_tags: default_file_tags(),
            orig_tag: default_orig_tag(),
            thumb_tag: default_thumb_tag(),
            thumbnail_size: default_thumbnail_size(),
            reserved_prefix: default_reserved_prefix(),
            image_extensions: default_image_extensions(),
            record_extension: default_record_extension(),
        }
    }
}

impl CatalogConfig {
    pub fn is_image_extension(&self, extension: &str) -> bool {
        let ext_lower = extension.to_lowercase();
        self.image_extensions
            .iter()
            .any(|e| e.to_lowercase() == ext_lower)
    }

    pub fn is_image_path(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| self.is_image_extension(&ext.to_string_lossy()))
            .unwrap_or(false)
    }
}

/// Values a batch update may write. Status is fixed and not listed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default = "default_edits")]
    pub edits: Vec<String>,

    #[serde(default = "default_needs")]
    pub needs: Vec<String>,

    #[serde(default = "default_good_for")]
    pub good_for: Vec<String>,

    #[serde(default = "default_posted_to")]
    pub posted_to: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn default_edits() -> Vec<String> {
    strings(&["creative", "photoshop", "rmbg"])
}

fn default_needs() -> Vec<String> {
    strings(&["upscale", "vector", "orig", "thumbnail", "interview"])
}

fn default_good_for() -> Vec<String> {
    strings(&["stock", "rb", "poster"])
}

fn default_posted_to() -> Vec<String> {
    strings(&["stock", "rb", "tp", "faa", "etsy"])
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            edits: default_edits(),
            needs: default_needs(),
            good_for: default_good_for(),
            posted_to: default_posted_to(),
        }
    }
}

/// Sentinel fields identifying each generator family.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub fooocus: FooocusSource,

    #[serde(default)]
    pub midjourney: MidjourneySource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FooocusSource {
    #[serde(default = "default_fooocus_scheme_field")]
    pub scheme_field: String,

    #[serde(default = "default_fooocus_scheme_value")]
    pub scheme_value: String,

    /// Holds a JSON document.
    #[serde(default = "default_fooocus_payload_field")]
    pub payload_field: String,
}

fn default_fooocus_scheme_field() -> String {
    "PNG:fooocus_scheme".to_string()
}

fn default_fooocus_scheme_value() -> String {
    "fooocus".to_string()
}

fn default_fooocus_payload_field() -> String {
    "PNG:parameters".to_string()
}

impl Default for FooocusSource {
    fn default() -> Self {
        Self {
            scheme_field: default_fooocus_scheme_field(),
            scheme_value: default_fooocus_scheme_value(),
            payload_field: default_fooocus_payload_field(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidjourneySource {
    #[serde(default = "default_midjourney_author_field")]
    pub author_field: String,

    #[serde(default = "default_midjourney_author")]
    pub author: String,

    /// Holds the free-text description.
    #[serde(default = "default_midjourney_payload_field")]
    pub payload_field: String,

    #[serde(default = "default_midjourney_job_marker")]
    pub job_marker: String,
}

fn default_midjourney_author_field() -> String {
    "PNG:Author".to_string()
}

fn default_midjourney_author() -> String {
    "aardvark_fike".to_string()
}

fn default_midjourney_payload_field() -> String {
    "PNG:Description".to_string()
}

fn default_midjourney_job_marker() -> String {
    "Job ID:".to_string()
}

impl Default for MidjourneySource {
    fn default() -> Self {
        Self {
            author_field: default_midjourney_author_field(),
            author: default_midjourney_author(),
            payload_field: default_midjourney_payload_field(),
            job_marker: default_midjourney_job_marker(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("imgcat")
        .join("catalog.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            folders: BTreeMap::new(),
            catalog: CatalogConfig::default(),
            sources: SourcesConfig::default(),
            vocabulary: VocabularyConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("IMGCAT_CONFIG") {
            return Self::load_from(Path::new(&path));
        }

        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("imgcat")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Registered folder paths, in name order.
    pub fn folder_paths(&self) -> Vec<PathBuf> {
        self.folders.values().cloned().collect()
    }

    /// Stable catalog name of a parent folder.
    ///
    /// A folder registered under `[folders]` is known by its key there, so two
    /// registered folders sharing a basename stay apart. Anything else falls
    /// back to its basename.
    pub fn folder_name(&self, folder: &Path) -> String {
        let wanted = canonical(folder);
        self.folders
            .iter()
            .find(|(_, path)| canonical(path) == wanted)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| {
                folder
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| folder.to_string_lossy().to_string())
            })
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
