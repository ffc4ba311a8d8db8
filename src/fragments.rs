//! Fragment Normalizer: pins shared page blocks to their canonical form.
//!
//! Every page carries a header, a footer, and (on the home page) a partners
//! logo track. Editing pages by hand makes those drift apart. Each run
//! replaces them wholesale with one of a small fixed set of canonical blocks,
//! so drift never accumulates.
//!
//! ## Canonical Blocks
//!
//! The blocks are data, loaded from the fragments directory:
//!
//! | File | Used by |
//! |------|---------|
//! | `header-home.html` | the root home page |
//! | `header-root.html` | other root pages and the post template |
//! | `header-blog.html` | pages inside the blog directory |
//! | `footer-root.html` | every page outside the blog directory |
//! | `footer-blog.html` | pages inside the blog directory |
//!
//! ## Matching
//!
//! A block runs from its opening tag (plus any indentation before it) to the
//! first matching close tag, non-greedy. Nested same-named tags are not
//! supported. Only the first block in a document is replaced. Every
//! canonical block must itself be exactly one such span, which is checked at
//! load time; that is what makes normalizing twice equal to normalizing once.
//!
//! ## Partners Track
//!
//! Content strictly between the partners marker comments is rebuilt as one
//! container holding two identical tracks of logo images, each long enough
//! to fill a wide screen while it scrolls.

use crate::config::{MarkersConfig, PartnersConfig};
use crate::images::{ImageEntry, ImageIndex};
use crate::types::PageKind;
use maud::{Markup, html};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

pub const HEADER_ROOT: &str = "header-root.html";
pub const HEADER_HOME: &str = "header-home.html";
pub const HEADER_BLOG: &str = "header-blog.html";
pub const FOOTER_ROOT: &str = "footer-root.html";
pub const FOOTER_BLOG: &str = "footer-blog.html";

static HEADER_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t]*<header(?:\s[^>]*)?>[\s\S]*?</header>").expect("valid header regex")
});

static FOOTER_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t]*<footer(?:\s[^>]*)?>[\s\S]*?</footer>").expect("valid footer regex")
});

#[derive(Error, Debug)]
pub enum FragmentError {
    #[error("Cannot read fragment {path}: {source}")]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Fragment {name} must be exactly one <{tag}> block")]
    Malformed { name: String, tag: &'static str },
}

/// The five canonical blocks.
#[derive(Debug, Clone)]
pub struct Fragments {
    header_root: String,
    header_home: String,
    header_blog: String,
    footer_root: String,
    footer_blog: String,
}

impl Fragments {
    /// Load and validate all canonical blocks from `dir`.
    pub fn load(dir: &Path) -> Result<Self, FragmentError> {
        let read = |name: &str| -> Result<String, FragmentError> {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|source| FragmentError::Missing { path, source })
        };
        Self::new(
            &read(HEADER_ROOT)?,
            &read(HEADER_HOME)?,
            &read(HEADER_BLOG)?,
            &read(FOOTER_ROOT)?,
            &read(FOOTER_BLOG)?,
        )
    }

    /// Build from block text. Leading and trailing line breaks are dropped;
    /// indentation is kept.
    pub fn new(
        header_root: &str,
        header_home: &str,
        header_blog: &str,
        footer_root: &str,
        footer_blog: &str,
    ) -> Result<Self, FragmentError> {
        Ok(Self {
            header_root: canonical_block(HEADER_ROOT, header_root, &HEADER_BLOCK, "header")?,
            header_home: canonical_block(HEADER_HOME, header_home, &HEADER_BLOCK, "header")?,
            header_blog: canonical_block(HEADER_BLOG, header_blog, &HEADER_BLOCK, "header")?,
            footer_root: canonical_block(FOOTER_ROOT, footer_root, &FOOTER_BLOCK, "footer")?,
            footer_blog: canonical_block(FOOTER_BLOG, footer_blog, &FOOTER_BLOCK, "footer")?,
        })
    }

    /// Header variant keyed by (nested under blog, home page).
    pub fn header_for(&self, kind: PageKind) -> &str {
        match (kind.is_nested(), kind.is_home()) {
            (true, _) => &self.header_blog,
            (false, true) => &self.header_home,
            (false, false) => &self.header_root,
        }
    }

    pub fn footer_for(&self, kind: PageKind) -> &str {
        if kind.is_nested() {
            &self.footer_blog
        } else {
            &self.footer_root
        }
    }
}

fn canonical_block(
    name: &str,
    raw: &str,
    pattern: &Regex,
    tag: &'static str,
) -> Result<String, FragmentError> {
    let block = raw.trim_matches(|c| c == '\n' || c == '\r');
    match pattern.find(block) {
        Some(m) if m.start() == 0 && m.end() == block.len() => Ok(block.to_string()),
        _ => Err(FragmentError::Malformed {
            name: name.to_string(),
            tag,
        }),
    }
}

// ============================================================================
// Header / footer replacement
// ============================================================================

/// Replace the first footer block with the canonical footer for `kind`.
///
/// Returns the new text and whether it differs from the input. A document
/// without a footer comes back unchanged.
pub fn replace_footer(doc: &str, fragments: &Fragments, kind: PageKind) -> (String, bool) {
    replace_block(&FOOTER_BLOCK, doc, fragments.footer_for(kind))
}

/// Replace the first header block with the canonical header for `kind`.
pub fn replace_header(doc: &str, fragments: &Fragments, kind: PageKind) -> (String, bool) {
    replace_block(&HEADER_BLOCK, doc, fragments.header_for(kind))
}

fn replace_block(pattern: &Regex, doc: &str, canonical: &str) -> (String, bool) {
    let Some(m) = pattern.find(doc) else {
        return (doc.to_string(), false);
    };
    if m.as_str() == canonical {
        return (doc.to_string(), false);
    }
    let mut out = String::with_capacity(doc.len() + canonical.len());
    out.push_str(&doc[..m.start()]);
    out.push_str(canonical);
    out.push_str(&doc[m.end()..]);
    (out, true)
}

// ============================================================================
// Partners track
// ============================================================================

/// What happened to the partners region of the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartnersOutcome {
    Updated,
    /// The rebuilt tracks matched what was already there.
    Unchanged,
    /// No image stem contains the logo keyword; the document is untouched.
    NoLogos,
    /// One or both marker comments are absent; the document is untouched.
    MissingMarkers,
}

/// Rebuild the content between the partners markers.
pub fn replace_partners(
    doc: &str,
    index: &ImageIndex,
    partners: &PartnersConfig,
    markers: &MarkersConfig,
    url_prefix: &str,
) -> (String, PartnersOutcome) {
    let logos = index.matching_stem(&partners.logo_keyword);
    if logos.is_empty() {
        return (doc.to_string(), PartnersOutcome::NoLogos);
    }

    let Some(start) = doc.find(&markers.partners_start) else {
        return (doc.to_string(), PartnersOutcome::MissingMarkers);
    };
    let inner_start = start + markers.partners_start.len();
    let Some(end) = doc[inner_start..]
        .find(&markers.partners_end)
        .map(|offset| inner_start + offset)
    else {
        return (doc.to_string(), PartnersOutcome::MissingMarkers);
    };

    let inner = format!("\n{}\n", partners_block(&logos, partners, url_prefix).into_string());
    if doc[inner_start..end] == inner {
        return (doc.to_string(), PartnersOutcome::Unchanged);
    }

    let mut out = String::with_capacity(doc.len() + inner.len());
    out.push_str(&doc[..inner_start]);
    out.push_str(&inner);
    out.push_str(&doc[end..]);
    (out, PartnersOutcome::Updated)
}

/// A container holding two identical scrolling tracks. Each track is the
/// whole logo set, repeated until it holds at least `min_per_track` images.
fn partners_block(logos: &[&ImageEntry], partners: &PartnersConfig, url_prefix: &str) -> Markup {
    let repeats = partners.min_per_track.div_ceil(logos.len()).max(1);
    html! {
        div class=(partners.container_class) {
            @for _ in 0..2 {
                div class=(partners.track_class) {
                    @for _ in 0..repeats {
                        @for logo in logos {
                            img src=(format!("{url_prefix}{}", logo.filename))
                                alt=(partners.logo_alt)
                                class=(partners.logo_class);
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Whole-page pass
// ============================================================================

/// Result of normalizing one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentPass {
    pub text: String,
    pub footer: bool,
    pub header: bool,
    /// Only set for the home page.
    pub partners: Option<PartnersOutcome>,
}

/// Footer, then header, then (home page only) the partners track.
pub fn normalize(
    doc: &str,
    kind: PageKind,
    fragments: &Fragments,
    index: &ImageIndex,
    partners: &PartnersConfig,
    markers: &MarkersConfig,
    url_prefix: &str,
) -> FragmentPass {
    let (text, footer) = replace_footer(doc, fragments, kind);
    let (text, header) = replace_header(&text, fragments, kind);
    let (text, partners) = if kind.is_home() {
        let (text, outcome) = replace_partners(&text, index, partners, markers, url_prefix);
        (text, Some(outcome))
    } else {
        (text, None)
    };
    FragmentPass {
        text,
        footer,
        header,
        partners,
    }
}
