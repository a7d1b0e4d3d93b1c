use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Immediate children of a directory, minus reserved names.
///
/// Each call to [`Listing::entries`] starts a fresh walk, so grouping and
/// cleanup can re-read the same folder after moving things around in it.
#[derive(Debug, Clone)]
pub struct Listing {
    root: PathBuf,
    reserved_prefix: String,
}

impl Listing {
    pub fn new(root: impl Into<PathBuf>, reserved_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            reserved_prefix: reserved_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily walk the children, sorted by name.
    pub fn entries(&self) -> impl Iterator<Item = DirEntry> + '_ {
        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !self.is_reserved(entry))
            .filter_map(move |e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!("Skipping unreadable entry under {:?}: {}", self.root, err);
                    None
                }
            })
    }

    pub fn files(&self) -> impl Iterator<Item = DirEntry> + '_ {
        self.entries().filter(|e| e.file_type().is_file())
    }

    pub fn dirs(&self) -> impl Iterator<Item = DirEntry> + '_ {
        self.entries().filter(|e| e.file_type().is_dir())
    }

    fn is_reserved(&self, entry: &DirEntry) -> bool {
        !self.reserved_prefix.is_empty()
            && entry
                .file_name()
                .to_string_lossy()
                .starts_with(&self.reserved_prefix)
    }
}

pub fn entry_name(entry: &DirEntry) -> String {
    entry.file_name().to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_listing_skips_reserved_and_does_not_recurse() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("b.png")).unwrap();
        File::create(dir.path().join("a.png")).unwrap();
        File::create(dir.path().join("_index.html")).unwrap();
        fs::create_dir(dir.path().join("_index")).unwrap();
        fs::create_dir(dir.path().join("set")).unwrap();
        File::create(dir.path().join("set/inner.png")).unwrap();

        let listing = Listing::new(dir.path(), "_");
        let files: Vec<String> = listing.files().map(|e| entry_name(&e)).collect();
        let dirs: Vec<String> = listing.dirs().map(|e| entry_name(&e)).collect();

        assert_eq!(files, vec!["a.png", "b.png"]);
        assert_eq!(dirs, vec!["set"]);
    }

    #[test]
    fn test_listing_is_restartable() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.png")).unwrap();

        let listing = Listing::new(dir.path(), "_");
        assert_eq!(listing.files().count(), 1);

        File::create(dir.path().join("c.png")).unwrap();
        assert_eq!(listing.files().count(), 2);
    }
}
