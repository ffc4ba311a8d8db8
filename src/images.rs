//! The Image Index: a lookup from normalized image names to on-disk files.
//!
//! Built once per run from a single flat directory. Each image registers two
//! keys, its lowercased stem and its lowercased full file name, both mapping
//! to the file name exactly as it appears on disk:
//!
//! ```text
//! imgs/Partner-Logo-A.PNG   →  "partner-logo-a"      → "Partner-Logo-A.PNG"
//!                              "partner-logo-a.png"  → "Partner-Logo-A.PNG"
//! ```
//!
//! ## Collisions
//!
//! `hero.jpg` and `hero.png` both claim the stem key `hero`. The file seen
//! later in directory iteration order wins. That order comes from the
//! filesystem and is not stable across platforms.

use crate::naming::normalized_stem;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions (lowercase, no dot) that count as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "avif"];

/// One image file found during the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageEntry {
    /// Lowercased file name without extension.
    pub stem: String,
    /// File name as on disk.
    pub filename: String,
}

#[derive(Debug, Default)]
pub struct ImageIndex {
    /// Every registered image in scan order.
    entries: Vec<ImageEntry>,
    lookup: HashMap<String, String>,
}

impl ImageIndex {
    /// Scan `dir` (non-recursively) and index every image in it. Symlinks
    /// are followed and indexed under the link's own name.
    ///
    /// A missing directory yields an empty index and a warning; the build
    /// carries on with nothing to resolve against.
    pub fn build(dir: &Path) -> Self {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "images directory not found");
            return Self::default();
        }

        let mut index = Self::default();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let filename = entry.file_name().to_string_lossy().to_string();
            if is_image(&filename) {
                index.insert(&filename);
            }
        }
        debug!(count = index.len(), dir = %dir.display(), "indexed images");
        index
    }

    /// Build an index from file names, in the given order.
    pub fn from_filenames<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::default();
        for name in names {
            let name = name.as_ref();
            if is_image(name) {
                index.insert(name);
            }
        }
        index
    }

    fn insert(&mut self, filename: &str) {
        let stem = normalized_stem(filename);
        self.lookup.insert(stem.clone(), filename.to_string());
        self.lookup
            .insert(filename.to_lowercase(), filename.to_string());
        self.entries.push(ImageEntry {
            stem,
            filename: filename.to_string(),
        });
    }

    /// Resolve placeholder text to an on-disk file name.
    ///
    /// Tries the extension-stripped stem first, then the full text, both
    /// lowercased. `"Hero.PNG"` therefore finds `hero.jpg` when no
    /// `hero.png` exists.
    pub fn resolve(&self, text: &str) -> Option<&str> {
        self.lookup
            .get(&normalized_stem(text))
            .or_else(|| self.lookup.get(&text.to_lowercase()))
            .map(String::as_str)
    }

    /// Look up a single normalized key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lookup.get(key).map(String::as_str)
    }

    /// Distinct images whose stem contains `keyword`, sorted by stem then
    /// file name.
    pub fn matching_stem(&self, keyword: &str) -> Vec<&ImageEntry> {
        let keyword = keyword.to_lowercase();
        let mut found: Vec<&ImageEntry> = self
            .entries
            .iter()
            .filter(|e| e.stem.contains(&keyword))
            .collect();
        found.sort_by(|a, b| (&a.stem, &a.filename).cmp(&(&b.stem, &b.filename)));
        found.dedup_by(|a, b| a.filename == b.filename);
        found
    }

    /// Number of image files scanned.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_image(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
