//! Filename tag inference.
//!
//! A file belongs to an imageset through its base identifier, and its role
//! inside the set is carried by `_tag` suffix segments:
//! `shot_thumb.png` is the thumbnail of imageset `shot`.

/// What a filename says about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTags {
    pub base: String,
    /// Without the leading dot; empty when the file has none.
    pub extension: String,
    /// In vocabulary order, no duplicates.
    pub tags: Vec<String>,
}

impl FileTags {
    pub fn has(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Split `filename` into base identifier, extension and recognized tags.
///
/// Only whole `_`-delimited trailing segments of the stem are tags, so `v2`
/// never matches inside `shot_v2x`. The first segment always stays in the
/// base, which keeps `orig.png` an imageset named `orig`.
pub fn extract_tags<S: AsRef<str>>(filename: &str, vocabulary: &[S]) -> FileTags {
    let (stem, extension) = split_extension(filename);

    let mut segments: Vec<&str> = stem.split('_').collect();
    let mut found: Vec<&str> = Vec::new();

    while segments.len() > 1 {
        let last = segments[segments.len() - 1];
        if vocabulary.iter().any(|tag| tag.as_ref() == last) {
            found.push(last);
            segments.pop();
        } else {
            break;
        }
    }

    let tags = vocabulary
        .iter()
        .map(|tag| tag.as_ref())
        .filter(|tag| found.contains(tag))
        .fold(Vec::<String>::new(), |mut acc, tag| {
            if !acc.iter().any(|t| t == tag) {
                acc.push(tag.to_string());
            }
            acc
        });

    FileTags {
        base: segments.join("_"),
        extension: extension.to_string(),
        tags,
    }
}

/// `name.ext` -> (`name`, `ext`). Dotfiles such as `.hidden` have no extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(0) | None => (filename, ""),
        Some(idx) => (&filename[..idx], &filename[idx + 1..]),
    }
}

/// Filename with `tag` appended to the stem: `shot.png` -> `shot_orig.png`.
pub fn with_tag(filename: &str, tag: &str) -> String {
    let (stem, extension) = split_extension(filename);
    if extension.is_empty() {
        format!("{}_{}", stem, tag)
    } else {
        format!("{}_{}.{}", stem, tag, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> Vec<String> {
        crate::config::CatalogConfig::default().file_tags
    }

    #[test]
    fn test_untagged_file() {
        let tags = extract_tags("shot.png", &vocabulary());
        assert_eq!(tags.base, "shot");
        assert_eq!(tags.extension, "png");
        assert!(tags.is_untagged());
    }

    #[test]
    fn test_every_vocabulary_tag_round_trips() {
        let vocab = vocabulary();
        for tag in &vocab {
            let filename = format!("2025-08-03_00-00-23_7134_{}.png", tag);
            let tags = extract_tags(&filename, &vocab);
            assert_eq!(tags.base, "2025-08-03_00-00-23_7134", "tag {}", tag);
            assert_eq!(tags.tags, vec![tag.clone()]);
        }
    }

    #[test]
    fn test_substring_does_not_match() {
        let tags = extract_tags("shot_v2x.png", &vocabulary());
        assert_eq!(tags.base, "shot_v2x");
        assert!(tags.is_untagged());

        let tags = extract_tags("thumbnail_study.png", &vocabulary());
        assert_eq!(tags.base, "thumbnail_study");
        assert!(tags.is_untagged());
    }

    #[test]
    fn test_stacked_tags_are_reported_in_vocabulary_order() {
        let tags = extract_tags("shot_orig_interview_raw.txt", &vocabulary());
        assert_eq!(tags.base, "shot");
        assert_eq!(tags.extension, "txt");
        assert_eq!(tags.tags, vec!["orig", "interview", "raw"]);

        // Reversed on disk, same answer.
        let tags = extract_tags("shot_raw_interview_orig.txt", &vocabulary());
        assert_eq!(tags.tags, vec!["orig", "interview", "raw"]);
    }

    #[test]
    fn test_tag_only_stem_keeps_its_name() {
        let tags = extract_tags("thumb.png", &vocabulary());
        assert_eq!(tags.base, "thumb");
        assert!(tags.is_untagged());
    }

    #[test]
    fn test_mid_stem_tag_is_part_of_base() {
        let tags = extract_tags("photo_raw_session_thumb.jpg", &vocabulary());
        assert_eq!(tags.base, "photo_raw_session");
        assert_eq!(tags.tags, vec!["thumb"]);
    }

    #[test]
    fn test_duplicate_tag_reported_once() {
        let tags = extract_tags("shot_v2_v2.png", &vocabulary());
        assert_eq!(tags.base, "shot");
        assert_eq!(tags.tags, vec!["v2"]);
    }

    #[test]
    fn test_empty_and_dotfile_names() {
        let tags = extract_tags("", &vocabulary());
        assert_eq!(tags.base, "");
        assert!(tags.is_untagged());

        let tags = extract_tags(".hidden", &vocabulary());
        assert_eq!(tags.base, ".hidden");
        assert_eq!(tags.extension, "");
    }

    #[test]
    fn test_custom_vocabulary() {
        let tags = extract_tags("shot_final.png", &["final"]);
        assert_eq!(tags.base, "shot");
        assert_eq!(tags.tags, vec!["final"]);

        let tags = extract_tags("shot_thumb.png", &["final"]);
        assert_eq!(tags.base, "shot_thumb");
    }

    #[test]
    fn test_deterministic_across_calls() {
        let vocab = vocabulary();
        let first = extract_tags("a_b_up4_thumb.webp", &vocab);
        let _ = extract_tags("other_v3.png", &vocab);
        let second = extract_tags("a_b_up4_thumb.webp", &vocab);
        assert_eq!(first, second);
    }

    #[test]
    fn test_with_tag() {
        assert_eq!(with_tag("shot.png", "orig"), "shot_orig.png");
        assert_eq!(with_tag("shot_thumb.png", "orig"), "shot_thumb_orig.png");
        assert_eq!(with_tag("noext", "orig"), "noext_orig");
    }
}
