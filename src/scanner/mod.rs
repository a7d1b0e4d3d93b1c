pub mod listing;
pub mod tags;
pub mod thumbnails;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};

pub use listing::Listing;
pub use tags::{extract_tags, FileTags};
pub use thumbnails::Thumbnail;

/// What a scan did to a parent folder.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Imageset folders present after the scan.
    pub imagesets: BTreeSet<String>,
    pub files_moved: usize,
    /// Abandoned folders that were removed.
    pub deleted: Vec<String>,
    /// Imagesets whose original was tagged during this scan.
    pub originals_tagged: Vec<String>,
    /// Imagesets left without a usable original, for an operator to resolve.
    pub flagged: Vec<CatalogError>,
}

/// An image file inside an imageset folder.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub path: PathBuf,
    pub filename: String,
    pub tags: FileTags,
}

pub struct Scanner {
    config: CatalogConfig,
}

impl Scanner {
    pub fn new(config: CatalogConfig) -> Self {
        Self { config }
    }

    /// Group loose files, drop abandoned folders and tag originals, in that order.
    pub fn scan(&self, parent: &Path) -> Result<ScanReport> {
        ensure_dir(parent)?;
        tracing::info!("Scanning folder: {:?}", parent);

        let listing = Listing::new(parent, self.config.reserved_prefix.clone());
        let mut report = ScanReport::default();

        report.files_moved = self.group_loose_files(&listing);
        report.deleted = self.delete_abandoned(&listing);

        for entry in listing.dirs() {
            report.imagesets.insert(listing::entry_name(&entry));
        }

        for name in &report.imagesets {
            match self.tag_original(&parent.join(name), name) {
                Ok(true) => report.originals_tagged.push(name.clone()),
                Ok(false) => {}
                Err(err @ CatalogError::MissingOriginal { .. }) => {
                    tracing::warn!("{}", err);
                    report.flagged.push(err);
                }
                Err(err) => {
                    tracing::error!("Failed to tag original for {}: {}", name, err);
                    report.flagged.push(err);
                }
            }
        }

        tracing::info!(
            "Scan of {:?} complete: {} imagesets, {} files moved, {} folders deleted, {} originals tagged, {} flagged",
            parent,
            report.imagesets.len(),
            report.files_moved,
            report.deleted.len(),
            report.originals_tagged.len(),
            report.flagged.len()
        );

        Ok(report)
    }

    /// Move loose files into a subfolder named after their base identifier.
    ///
    /// Only bases backed by at least one loose image get a folder; a stray
    /// text file with no image would otherwise produce a folder that cleanup
    /// deletes straight away.
    fn group_loose_files(&self, listing: &Listing) -> usize {
        let mut by_base: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        let mut image_bases: BTreeSet<String> = BTreeSet::new();

        for entry in listing.files() {
            let filename = listing::entry_name(&entry);
            let tags = extract_tags(&filename, &self.config.file_tags);
            if tags.base.is_empty() {
                continue;
            }
            if self.config.is_image_extension(&tags.extension) {
                image_bases.insert(tags.base.clone());
            }
            by_base
                .entry(tags.base)
                .or_default()
                .push(entry.into_path());
        }

        let mut moved = 0;
        for base in image_bases {
            let target = listing.root().join(&base);
            if !target.is_dir() {
                if let Err(err) = fs::create_dir_all(&target) {
                    tracing::error!("Failed to create imageset folder {:?}: {}", target, err);
                    continue;
                }
                tracing::info!("Created imageset folder: {}", base);
            }

            for source in by_base.remove(&base).unwrap_or_default() {
                let Some(filename) = source.file_name() else {
                    continue;
                };
                let destination = target.join(filename);
                if destination.exists() {
                    tracing::warn!(
                        "Not moving {:?}: {:?} already exists",
                        source,
                        destination
                    );
                    continue;
                }
                match fs::rename(&source, &destination) {
                    Ok(()) => {
                        tracing::debug!("Moved {:?} -> {:?}", source, destination);
                        moved += 1;
                    }
                    Err(err) => tracing::error!("Failed to move {:?}: {}", source, err),
                }
            }
        }

        moved
    }

    /// Remove imageset folders that no longer hold a single image.
    fn delete_abandoned(&self, listing: &Listing) -> Vec<String> {
        let abandoned: Vec<(String, PathBuf)> = listing
            .dirs()
            .filter(|entry| !self.has_image(entry.path()))
            .map(|entry| (listing::entry_name(&entry), entry.into_path()))
            .collect();

        let mut deleted = Vec::new();
        for (name, path) in abandoned {
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    tracing::warn!("Deleted abandoned imageset folder: {} ({:?})", name, path);
                    deleted.push(name);
                }
                Err(err) => tracing::error!("Failed to delete abandoned folder {:?}: {}", path, err),
            }
        }
        deleted
    }

    fn has_image(&self, folder: &Path) -> bool {
        Listing::new(folder, String::new())
            .files()
            .any(|entry| self.config.is_image_path(entry.path()))
    }

    /// Image files directly inside an imageset folder, sorted by name.
    pub fn image_files(&self, imageset_dir: &Path) -> Vec<ImageFile> {
        Listing::new(imageset_dir, String::new())
            .files()
            .filter(|entry| self.config.is_image_path(entry.path()))
            .map(|entry| {
                let filename = listing::entry_name(&entry);
                let tags = extract_tags(&filename, &self.config.file_tags);
                ImageFile {
                    path: entry.into_path(),
                    filename,
                    tags,
                }
            })
            .collect()
    }

    /// The orig-tagged image of an imageset, if exactly one exists.
    pub fn find_original(&self, imageset_dir: &Path) -> Option<PathBuf> {
        let mut originals: Vec<ImageFile> = self
            .image_files(imageset_dir)
            .into_iter()
            .filter(|f| f.tags.has(&self.config.orig_tag))
            .collect();
        if originals.len() == 1 {
            originals.pop().map(|f| f.path)
        } else {
            None
        }
    }

    /// Tag the original image of one imageset. Returns whether a file was renamed.
    ///
    /// Ambiguous folders are reported, never guessed at.
    fn tag_original(&self, imageset_dir: &Path, name: &str) -> Result<bool> {
        let images = self.image_files(imageset_dir);
        let orig_tag = &self.config.orig_tag;

        let originals = images.iter().filter(|f| f.tags.has(orig_tag)).count();
        match originals {
            1 => return Ok(false),
            0 => {}
            n => {
                return Err(CatalogError::MissingOriginal {
                    imageset: name.to_string(),
                    reason: format!("{} files are tagged {}", n, orig_tag),
                })
            }
        }

        let candidate = if images.len() == 1 {
            &images[0]
        } else {
            let untagged: Vec<&ImageFile> =
                images.iter().filter(|f| f.tags.is_untagged()).collect();
            match untagged.as_slice() {
                [only] => *only,
                [] => {
                    return Err(CatalogError::MissingOriginal {
                        imageset: name.to_string(),
                        reason: format!("none of {} images is untagged", images.len()),
                    })
                }
                many => {
                    return Err(CatalogError::MissingOriginal {
                        imageset: name.to_string(),
                        reason: format!("{} untagged images", many.len()),
                    })
                }
            }
        };

        let renamed = imageset_dir.join(tags::with_tag(&candidate.filename, orig_tag));
        if renamed.exists() {
            return Err(CatalogError::MissingOriginal {
                imageset: name.to_string(),
                reason: format!("{:?} already exists", renamed),
            });
        }
        fs::rename(&candidate.path, &renamed).map_err(|e| CatalogError::io(&candidate.path, e))?;
        tracing::info!("Tagged original for {}: {:?}", name, renamed);
        Ok(true)
    }
}

/// The parent folder itself must be readable; anything below it is best effort.
pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| CatalogError::io(path, e))?;
    if !metadata.is_dir() {
        return Err(CatalogError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }
    fs::read_dir(path).map_err(|e| CatalogError::io(path, e))?;
    Ok(())
}
