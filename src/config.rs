//! Site configuration module.
//!
//! Handles loading, validating, and merging `pagewright.toml`. Stock defaults
//! describe the standard site layout; a `pagewright.toml` in the site root
//! overrides any subset of them.
//!
//! ## Site Layout
//!
//! ```text
//! site/
//! ├── pagewright.toml          # Optional overrides
//! ├── index.html               # Home page (header-home, partners track)
//! ├── about.html               # Root pages (header-root, footer-root)
//! ├── blog.html                # Blog index with BLOG_POSTS markers
//! ├── blog/
//! │   ├── template.html        # Post template (treated as a root page)
//! │   ├── archive.html         # Nested pages (header-blog, footer-blog)
//! │   └── posts/
//! │       └── first-post.md    # Markdown sources → site/first-post.html
//! ├── fragments/               # Canonical header/footer blocks
//! │   ├── header-root.html
//! │   ├── header-home.html
//! │   ├── header-blog.html
//! │   ├── footer-root.html
//! │   └── footer-blog.html
//! └── imgs/                    # Image Index source (flat)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [partners]
//! min_per_track = 60
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the site configuration, looked up in the site root.
pub const CONFIG_FILE: &str = "pagewright.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `pagewright.toml`.
///
/// All fields have defaults matching the standard layout. Unknown keys are
/// rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Input and output locations, relative to the site root.
    pub paths: PathsConfig,
    /// File names that give a page its role.
    pub pages: PagesConfig,
    /// How images are referenced from generated markup.
    pub images: ImagesConfig,
    /// Post rendering defaults and policies.
    pub posts: PostsConfig,
    /// Literal marker comments delimiting generated regions.
    pub markers: MarkersConfig,
    /// Partners logo track settings.
    pub partners: PartnersConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partners.min_per_track == 0 {
            return Err(ConfigError::Validation(
                "partners.min_per_track must be at least 1".into(),
            ));
        }
        if self.partners.logo_keyword.is_empty() {
            return Err(ConfigError::Validation(
                "partners.logo_keyword must not be empty".into(),
            ));
        }
        let pairs = [
            ("blog_posts", &self.markers.blog_posts_start, &self.markers.blog_posts_end),
            ("partners", &self.markers.partners_start, &self.markers.partners_end),
        ];
        for (name, start, end) in pairs {
            if start.is_empty() || end.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "markers.{name}_start and markers.{name}_end must not be empty"
                )));
            }
            if start == end {
                return Err(ConfigError::Validation(format!(
                    "markers.{name}_start and markers.{name}_end must differ"
                )));
            }
        }
        Ok(())
    }
}

/// Locations of every input the build consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory of Markdown post sources.
    pub posts: PathBuf,
    /// Template every post is rendered into.
    pub post_template: PathBuf,
    /// Page carrying the blog card listing.
    pub blog_index: PathBuf,
    /// Flat directory scanned for the Image Index.
    pub images: PathBuf,
    /// The one nested page area.
    pub blog_dir: PathBuf,
    /// Directory holding the canonical header/footer blocks.
    pub fragments: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            posts: PathBuf::from("blog/posts"),
            post_template: PathBuf::from("blog/template.html"),
            blog_index: PathBuf::from("blog.html"),
            images: PathBuf::from("imgs"),
            blog_dir: PathBuf::from("blog"),
            fragments: PathBuf::from("fragments"),
        }
    }
}

/// File names that select a page's role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PagesConfig {
    /// Home page in the site root.
    pub home: String,
    /// Post template inside the blog directory.
    pub blog_template: String,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            home: "index.html".to_string(),
            blog_template: "template.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Site-relative URL of the images directory, with trailing slash.
    pub url_prefix: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            url_prefix: "imgs/".to_string(),
        }
    }
}

/// What to do with a `date` that is present but not `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateFallback {
    /// Substitute the build date.
    #[default]
    BuildDate,
    /// Report the post as an error and skip it.
    Error,
}

/// Post rendering defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostsConfig {
    /// Title used when front-matter has none.
    pub default_title: String,
    /// Card type label used when front-matter has none.
    pub default_type: String,
    /// Card image used when front-matter has none.
    pub default_card_image: String,
    /// Policy for unparseable dates.
    pub date_fallback: DateFallback,
    /// Link targets whose `../` prefix is dropped from rendered post bodies.
    pub root_relative_links: Vec<String>,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            default_title: "Untitled".to_string(),
            default_type: "Case Study".to_string(),
            default_card_image: "imgs/card3.jpg".to_string(),
            date_fallback: DateFallback::BuildDate,
            root_relative_links: ["imgs/", "index.html", "blog.html", "contact.html", "about.html"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Marker comments. Content strictly between a start/end pair is generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkersConfig {
    pub blog_posts_start: String,
    pub blog_posts_end: String,
    pub partners_start: String,
    pub partners_end: String,
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            blog_posts_start: "<!-- BLOG_POSTS_START -->".to_string(),
            blog_posts_end: "<!-- BLOG_POSTS_END -->".to_string(),
            partners_start: "<!-- PARTNERS_START -->".to_string(),
            partners_end: "<!-- PARTNERS_END -->".to_string(),
        }
    }
}

/// Partners logo track settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartnersConfig {
    /// Images whose lowercased stem contains this are logos.
    pub logo_keyword: String,
    /// Each track repeats the logo set until it holds at least this many images.
    pub min_per_track: usize,
    /// Class of the wrapper holding both tracks.
    pub container_class: String,
    /// Class of each scrolling track.
    pub track_class: String,
    /// Class of each logo image.
    pub logo_class: String,
    /// Alt text of each logo image.
    pub logo_alt: String,
}

impl Default for PartnersConfig {
    fn default() -> Self {
        Self {
            logo_keyword: "logo".to_string(),
            min_per_track: 40,
            container_class: "partners-track".to_string(),
            track_class: "slide-track".to_string(),
            logo_class: "partner-logo".to_string(),
            logo_alt: "Partner Logo".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `pagewright.toml` from the site root as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the site config for `root`: stock defaults plus `pagewright.toml`.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `pagewright.toml`.
///
/// Used by the `--print-config` CLI flag.
pub fn stock_config_toml() -> &'static str {
    r##"# Pagewright Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Locations, relative to the site root
# ---------------------------------------------------------------------------
[paths]
posts = "blog/posts"                 # Markdown sources
post_template = "blog/template.html" # Template with {{ title }}, {{ content }}, ...
blog_index = "blog.html"             # Page holding the BLOG_POSTS markers
images = "imgs"                      # Flat image directory
blog_dir = "blog"                    # Nested page area (links need ../)
fragments = "fragments"              # Canonical header-*/footer-* blocks

[pages]
home = "index.html"                  # Root page with header-home and partners
blog_template = "template.html"      # Lives in blog_dir, treated as a root page

[images]
url_prefix = "imgs/"

# ---------------------------------------------------------------------------
# Posts
# ---------------------------------------------------------------------------
[posts]
default_title = "Untitled"
default_type = "Case Study"
default_card_image = "imgs/card3.jpg"

# "build-date": an unparseable date becomes the build date.
# "error":      an unparseable date skips the post and is reported.
date_fallback = "build-date"

# Links in post bodies written as ../<target> are rewritten to <target>.
root_relative_links = ["imgs/", "index.html", "blog.html", "contact.html", "about.html"]

# ---------------------------------------------------------------------------
# Generated regions
# ---------------------------------------------------------------------------
[markers]
blog_posts_start = "<!-- BLOG_POSTS_START -->"
blog_posts_end = "<!-- BLOG_POSTS_END -->"
partners_start = "<!-- PARTNERS_START -->"
partners_end = "<!-- PARTNERS_END -->"

[partners]
logo_keyword = "logo"
min_per_track = 40
container_class = "partners-track"  # Wrapper around both tracks
track_class = "slide-track"          # Each of the two scrolling tracks
logo_class = "partner-logo"
logo_alt = "Partner Logo"
"##
}
