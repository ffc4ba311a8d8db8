//! Placeholder Resolver: turns image placeholder markers into real images.
//!
//! Authors drop `<div class="image-placeholder">hero.jpg</div>` into a page
//! before the image exists. Two passes run over the full document text, in
//! this order:
//!
//! 1. **Style conversion** rewrites the older inline-style form
//!    `<div class="image-placeholder" style="background-image: url('P')"></div>`
//!    into a container wrapping `<img src="P">`. Purely syntactic.
//! 2. **Name resolution** looks the text of every bare marker up in the
//!    [`ImageIndex`] and, on a hit, wraps an `<img>` pointing at the real file.
//!    Misses are left byte-for-byte as they were.
//!
//! Resolved markers contain an element, so they no longer match the bare
//! pattern: running the resolver again is a no-op.

use crate::images::ImageIndex;
use crate::naming::display_label;
use crate::types::PageKind;
use maud::{Markup, PreEscaped, html};
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

static STYLE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<div class="image-placeholder" style="background-image: url\(['"]([^'"]+)['"]\)">\s*</div>"#,
    )
    .expect("valid style marker regex")
});

static BARE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div class="image-placeholder">([^<]+)</div>"#).expect("valid bare marker regex")
});

/// A placeholder that was matched to an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Marker text as written, trimmed.
    pub placeholder: String,
    /// On-disk file name it resolved to.
    pub image: String,
}

/// Result of both passes over one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderPass {
    pub text: String,
    /// Style markers rewritten by the first pass.
    pub conversions: usize,
    /// Bare markers resolved by the second pass, in document order.
    pub resolved: Vec<Resolution>,
}

/// Run style conversion, then name resolution.
pub fn apply(doc: &str, index: &ImageIndex, url_prefix: &str, kind: PageKind) -> PlaceholderPass {
    let (converted, conversions) = convert_background_styles(doc);
    let (text, resolved) = resolve_placeholders(&converted, index, url_prefix, kind);
    PlaceholderPass {
        text,
        conversions,
        resolved,
    }
}

/// Rewrite inline background-image markers into `<img>` markers.
///
/// Returns the new text and the number of markers rewritten. The path is
/// kept exactly as written; the alt text is derived from its file name.
pub fn convert_background_styles(doc: &str) -> (String, usize) {
    let mut count = 0;
    let out = STYLE_MARKER.replace_all(doc, |caps: &Captures| {
        count += 1;
        let path = &caps[1];
        placeholder_markup(path, &display_label(path)).into_string()
    });
    (out.into_owned(), count)
}

/// Resolve bare filename markers against the index.
///
/// Nested pages get a `../` in front of `url_prefix`.
pub fn resolve_placeholders(
    doc: &str,
    index: &ImageIndex,
    url_prefix: &str,
    kind: PageKind,
) -> (String, Vec<Resolution>) {
    let mut out = String::with_capacity(doc.len());
    let mut resolved = Vec::new();
    let mut last = 0;

    for caps in BARE_MARKER.captures_iter(doc) {
        let Some(whole) = caps.get(0) else { continue };
        let text = caps[1].trim();
        if text.is_empty() {
            continue;
        }
        let Some(image) = index.resolve(text) else {
            continue;
        };

        let src = format!("{}{}{}", kind.root_prefix(), url_prefix, image);
        out.push_str(&doc[last..whole.start()]);
        out.push_str(&placeholder_markup(&src, text).into_string());
        last = whole.end();

        resolved.push(Resolution {
            placeholder: text.to_string(),
            image: image.to_string(),
        });
    }

    if resolved.is_empty() {
        return (doc.to_string(), resolved);
    }
    out.push_str(&doc[last..]);
    (out, resolved)
}

/// Both inputs come from the document itself and are already HTML text.
fn placeholder_markup(src: &str, alt: &str) -> Markup {
    html! {
        div class="image-placeholder" {
            img src=(PreEscaped(src)) alt=(PreEscaped(alt));
        }
    }
}
