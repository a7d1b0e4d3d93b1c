use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};

use super::listing::{self, Listing};
use super::{extract_tags, Scanner};
use crate::error::{BatchSummary, CatalogError, Result};

/// What happened to one imageset's thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    Created(PathBuf),
    /// A thumb-tagged image was already there.
    Existing(PathBuf),
    NoOriginal,
}

impl Scanner {
    /// Give every imageset under `parent` a `<base>_thumb.<ext>` scaled from its original.
    pub fn create_thumbnails(&self, parent: &Path) -> Result<BatchSummary> {
        super::ensure_dir(parent)?;
        let mut summary = BatchSummary::default();

        for entry in Listing::new(parent, self.config.reserved_prefix.clone()).dirs() {
            let name = listing::entry_name(&entry);
            match self.create_thumbnail(entry.path()) {
                Ok(Thumbnail::Created(path)) => {
                    tracing::info!("Created thumbnail: {:?}", path);
                    summary.record_processed(name);
                }
                Ok(Thumbnail::Existing(_)) => summary.record_skipped(name, "thumbnail exists"),
                Ok(Thumbnail::NoOriginal) => summary.record_skipped(name, "no original image"),
                Err(err) => {
                    tracing::error!("Failed to create thumbnail for {}: {}", name, err);
                    summary.record_failed(name, err.to_string());
                }
            }
        }

        Ok(summary)
    }

    /// Scale the imageset's original so its longest edge fits the configured size.
    ///
    /// The thumbnail shares the original's base identifier and extension, so
    /// cover selection picks it up on the next import.
    pub fn create_thumbnail(&self, imageset_dir: &Path) -> Result<Thumbnail> {
        let thumb_tag = &self.config.thumb_tag;
        if let Some(existing) = self
            .image_files(imageset_dir)
            .into_iter()
            .find(|f| f.tags.has(thumb_tag))
        {
            return Ok(Thumbnail::Existing(existing.path));
        }

        let Some(original) = self.find_original(imageset_dir) else {
            return Ok(Thumbnail::NoOriginal);
        };
        let filename = file_name(&original);
        let tags = extract_tags(&filename, &self.config.file_tags);
        let target = imageset_dir.join(format!("{}_{}.{}", tags.base, thumb_tag, tags.extension));

        let img = image::open(&original).map_err(|source| CatalogError::Image {
            path: original.clone(),
            source,
        })?;
        let size = self.config.thumbnail_size;
        let thumbnail = img.thumbnail(size, size);

        // JPEG has no alpha channel.
        let thumbnail = match ImageFormat::from_path(&target) {
            Ok(ImageFormat::Jpeg) => DynamicImage::ImageRgb8(thumbnail.to_rgb8()),
            _ => thumbnail,
        };
        thumbnail.save(&target).map_err(|source| CatalogError::Image {
            path: target.clone(),
            source,
        })?;

        Ok(Thumbnail::Created(target))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use std::fs;
    use tempfile::tempdir;

    fn scanner() -> Scanner {
        let mut config = CatalogConfig::default();
        config.thumbnail_size = 10;
        Scanner::new(config)
    }

    fn write_image(path: &Path, width: u32, height: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::new(width, height).save(path).unwrap();
    }

    #[test]
    fn test_thumbnail_is_scaled_from_original() {
        let dir = tempdir().unwrap();
        write_image(&dir.path().join("shot/shot_orig.png"), 40, 20);
        write_image(&dir.path().join("tall/tall_orig.jpg"), 20, 40);

        let summary = scanner().create_thumbnails(dir.path()).unwrap();
        assert_eq!(summary.processed, vec!["shot", "tall"]);

        let thumb = dir.path().join("shot/shot_thumb.png");
        assert_eq!(image::image_dimensions(&thumb).unwrap(), (10, 5));
        let thumb = dir.path().join("tall/tall_thumb.jpg");
        assert_eq!(image::image_dimensions(&thumb).unwrap(), (5, 10));
    }

    #[test]
    fn test_existing_thumbnail_and_missing_original_are_skipped() {
        let dir = tempdir().unwrap();
        write_image(&dir.path().join("done/done_orig.png"), 40, 20);
        write_image(&dir.path().join("done/done_thumb.png"), 4, 2);
        write_image(&dir.path().join("loose/a.png"), 40, 20);
        write_image(&dir.path().join("loose/b.png"), 40, 20);

        assert_eq!(
            scanner().create_thumbnail(&dir.path().join("done")).unwrap(),
            Thumbnail::Existing(dir.path().join("done/done_thumb.png"))
        );

        let summary = scanner().create_thumbnails(dir.path()).unwrap();
        assert!(summary.processed.is_empty());
        assert_eq!(summary.skipped.len(), 2);
        assert_eq!(image::image_dimensions(dir.path().join("done/done_thumb.png")).unwrap(), (4, 2));
        assert!(!dir.path().join("loose/a_thumb.png").exists());
    }

    #[test]
    fn test_undecodable_original_fails_that_imageset() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("bad")).unwrap();
        fs::write(dir.path().join("bad/bad_orig.png"), b"not a png").unwrap();

        let summary = scanner().create_thumbnails(dir.path()).unwrap();
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed[0].1.contains("bad_orig.png"));
    }
}
