//! Post Renderer: Markdown sources with front-matter → full HTML pages.
//!
//! A post source looks like:
//!
//! ```text
//! ---
//! title: "Alpha"
//! date: 2025-03-01
//! image: ../imgs/alpha-hero.jpg
//! description: Short teaser for the index card
//! type: Case Study
//! hidden: false
//! ---
//! Body in **Markdown**, linking to [the blog](../blog.html).
//! ```
//!
//! Sources conceptually live one directory down (`blog/posts/`), while the
//! rendered page is written to the site root, so `../` link prefixes for a
//! configured set of targets are dropped from the rendered body.
//!
//! ## Template Tokens
//!
//! The template is filled by literal substring replacement. Tokens the
//! template does not contain are simply not used; unknown `{{ ... }}` text
//! in the template is left as is.
//!
//! | Token | Value |
//! |-------|-------|
//! | `{{ title }}` | front-matter title, or the configured default |
//! | `{{ content }}` | rendered Markdown body |
//! | `{{ hero_class }}` | `has-image` when an image is set, else empty |
//! | `{{ hero_style }}` | `background-image: url('...');` when an image is set |
//! | `{{ date }}` | display date, e.g. `March 01, 2025` |
//!
//! ## Defaults
//!
//! - No front-matter block (or no closing fence): empty metadata, whole file is body.
//! - No `date`: the build date.
//! - Unparseable `date`: see [`DateFallback`].

use crate::config::{DateFallback, PostsConfig};
use crate::naming::strip_parent_segment;
use chrono::NaiveDate;
use pulldown_cmark::{Parser, html as md_html};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FENCE: &str = "---";
const DATE_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_DATE_FORMAT: &str = "%B %d, %Y";

pub const TITLE_TOKEN: &str = "{{ title }}";
pub const CONTENT_TOKEN: &str = "{{ content }}";
pub const HERO_CLASS_TOKEN: &str = "{{ hero_class }}";
pub const HERO_STYLE_TOKEN: &str = "{{ hero_style }}";
pub const DATE_TOKEN: &str = "{{ date }}";

#[derive(Error, Debug)]
pub enum PostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid front-matter in {file}: {source}")]
    Yaml {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid date {date:?} in {file} (expected YYYY-MM-DD)")]
    InvalidDate { file: String, date: String },
}

/// Metadata block at the top of a post. Every field is optional; unknown
/// keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub date: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    #[serde(deserialize_with = "true_only")]
    pub hidden: bool,
}

/// YAML 1.1 spellings of true. serde_yaml parses YAML 1.2, where these are
/// plain strings.
const YAML11_TRUE: [&str; 9] = ["true", "True", "TRUE", "yes", "Yes", "YES", "on", "On", "ON"];

/// A YAML true (1.2 `true`, or a 1.1 word such as `yes` or `on`) hides a
/// post; anything else leaves it listed. Quoted strings cannot be told apart
/// from plain ones here, so `"yes"` hides too.
fn true_only<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Bool(b) => b,
        serde_yaml::Value::String(s) => YAML11_TRUE.contains(&s.as_str()),
        _ => false,
    })
}

/// One parsed post source.
#[derive(Debug, Clone)]
pub struct Post {
    /// Source file name, e.g. `first-post.md`.
    pub filename: String,
    pub title: Option<String>,
    pub image: Option<String>,
    /// Raw date text as written in front-matter.
    pub date: Option<String>,
    pub description: Option<String>,
    pub post_type: Option<String>,
    pub hidden: bool,
    pub body_markdown: String,
}

impl Post {
    /// Parse a post from its file name and full source text.
    pub fn parse(filename: &str, content: &str) -> Result<Self, PostError> {
        let (meta, body) = match split_frontmatter(content) {
            Some((yaml, body)) if yaml.trim().is_empty() => (Frontmatter::default(), body),
            Some((yaml, body)) => {
                let meta = serde_yaml::from_str(yaml).map_err(|source| PostError::Yaml {
                    file: filename.to_string(),
                    source,
                })?;
                (meta, body)
            }
            None => (Frontmatter::default(), content),
        };

        Ok(Self {
            filename: filename.to_string(),
            title: meta.title,
            image: meta.image,
            date: meta.date,
            description: meta.description,
            post_type: meta.post_type,
            hidden: meta.hidden,
            body_markdown: body.to_string(),
        })
    }

    /// Read and parse a post source file.
    pub fn load(path: &Path) -> Result<Self, PostError> {
        let content = fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::parse(&filename, &content)
    }

    /// Name of the rendered page: the source name with `.html` for its extension.
    pub fn output_name(&self) -> String {
        Path::new(&self.filename)
            .with_extension("html")
            .to_string_lossy()
            .to_string()
    }

    /// Title, falling back to `default` when absent.
    pub fn title_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.title.as_deref().unwrap_or(default)
    }

    /// The calendar date this post is filed under.
    ///
    /// A missing date is the build date. An unparseable one follows
    /// `policy`.
    pub fn resolve_date(
        &self,
        build_date: NaiveDate,
        policy: DateFallback,
    ) -> Result<NaiveDate, PostError> {
        let Some(raw) = self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) else {
            return Ok(build_date);
        };
        match (parse_date(raw), policy) {
            (Some(date), _) => Ok(date),
            (None, DateFallback::BuildDate) => Ok(build_date),
            (None, DateFallback::Error) => Err(PostError::InvalidDate {
                file: self.filename.clone(),
                date: raw.to_string(),
            }),
        }
    }
}

/// Split a source into (front-matter YAML, body).
///
/// The first line must be exactly `---` (trailing whitespace allowed); the
/// block ends at the next such line. Returns `None` when either fence is
/// missing.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let (first, rest) = content.split_once('\n')?;
    if first.trim_end() != FENCE {
        return None;
    }
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// `2025-03-01` → `March 01, 2025`
pub fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

// ============================================================================
// Rendering
// ============================================================================

/// Convert a Markdown body to HTML with a standard CommonMark parser.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut html = String::new();
    md_html::push_html(&mut html, parser);
    html
}

/// Rewrite `../<target>` to `<target>` for every configured target.
pub fn rewrite_root_relative(html: &str, targets: &[String]) -> String {
    targets
        .iter()
        .fold(html.to_string(), |acc, target| {
            acc.replace(&format!("../{target}"), target)
        })
}

/// Hero class and style for an optional front-matter image.
pub fn hero_fields(image: Option<&str>) -> (&'static str, String) {
    match image.filter(|i| !i.is_empty()) {
        Some(image) => (
            "has-image",
            format!("background-image: url('{}');", strip_parent_segment(image)),
        ),
        None => ("", String::new()),
    }
}

/// Render `post` into `template`.
pub fn render(post: &Post, date: NaiveDate, template: &str, config: &PostsConfig) -> String {
    let content = rewrite_root_relative(
        &markdown_to_html(&post.body_markdown),
        &config.root_relative_links,
    );
    let (hero_class, hero_style) = hero_fields(post.image.as_deref());

    template
        .replace(TITLE_TOKEN, post.title_or(&config.default_title))
        .replace(CONTENT_TOKEN, &content)
        .replace(HERO_CLASS_TOKEN, hero_class)
        .replace(HERO_STYLE_TOKEN, &hero_style)
        .replace(DATE_TOKEN, &display_date(date))
}

/// Markdown sources directly inside `dir`, sorted by path.
pub fn discover_posts(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut md_files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e.eq_ignore_ascii_case("md"))
                    .unwrap_or(false)
        })
        .collect();
    md_files.sort();
    Ok(md_files)
}
