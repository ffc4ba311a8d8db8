//! Centralized name handling for images, placeholders, and posts.
//!
//! Every lookup in the build normalizes names the same way: lowercase, with
//! the extension stripped. Labels shown to readers go the other direction,
//! turning a file name back into words.
//!
//! ## Labels
//!
//! Underscores and dashes in a file stem become spaces and each word is
//! title-cased:
//! - `imgs/laser_tracker-setup.jpg` → "Laser Tracker Setup"
//! - `3d-scan.png` → "3D Scan"
//! - `FRINGE.svg` → "Fringe"

use std::path::Path;

/// Lowercased file stem of a name or path.
///
/// - `"Partner-Logo-A.PNG"` → `"partner-logo-a"`
/// - `"imgs/hero.jpg"` → `"hero"`
/// - `"no-extension"` → `"no-extension"`
/// - `"archive.tar.gz"` → `"archive.tar"`
pub fn normalized_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Human-readable label derived from the file name of `path`.
///
/// Case is taken from the stem as written, then re-cased word by word.
pub fn display_label(path: &str) -> String {
    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    title_case(&stem.replace(['_', '-'], " "))
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
///
/// Any non-alphabetic character starts a new word, so digits and
/// apostrophes act as boundaries.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Slug for a post type, used as the card's `data-type` attribute.
///
/// `"Case Study"` → `"case-study"`
pub fn type_slug(post_type: &str) -> String {
    post_type.replace(' ', "-").to_lowercase()
}

/// Drop a single leading `../` from a path written relative to the posts area.
pub fn strip_parent_segment(path: &str) -> &str {
    path.strip_prefix("../").unwrap_or(path)
}
