//! # Pagewright
//!
//! A build tool for a small hand-edited marketing site. It renders Markdown
//! blog posts into HTML pages, regenerates the blog index listing, and keeps
//! shared page blocks (headers, footers, the partners logo strip, image
//! placeholders) consistent across every page.
//!
//! # Architecture: One Linear Pass
//!
//! Each invocation runs the whole build once, sequentially:
//!
//! ```text
//! 1. Posts      blog/posts/*.md  →  <root>/*.html       (template fill)
//! 2. Index      posts            →  blog.html           (cards between markers)
//! 3. Images     imgs/            →  ImageIndex          (name lookup)
//! 4. Pages      *.html, blog/*.html:
//!                 placeholders → footer → header → partners → write if changed
//! ```
//!
//! Every step is a text transformation over whole files. Re-running the build
//! on its own output changes nothing: resolved placeholders no longer match,
//! and canonical blocks already in place are left alone.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | The driver: runs every step, tracks pending writes, builds the [`pipeline::Report`] |
//! | [`posts`] | Front-matter parsing, date policy, Markdown → template rendering |
//! | [`blog_index`] | Card listing between the blog-post markers |
//! | [`images`] | The Image Index: normalized name → on-disk file |
//! | [`placeholders`] | Placeholder marker conversion and resolution |
//! | [`fragments`] | Canonical header/footer blocks and the partners track |
//! | [`config`] | `pagewright.toml` loading, merging, and validation |
//! | [`types`] | Page roles shared by the resolver and the normalizer |
//! | [`naming`] | Stem normalization and label helpers |
//! | [`output`] | CLI output formatting of a run report |
//!
//! # Design Decisions
//!
//! ## Canonical Blocks Are Data
//!
//! Header and footer variants live as files in `fragments/`, not as string
//! constants. There is exactly one copy of each variant, so pages cannot be
//! normalized to two slightly different navigation bars.
//!
//! ## Text Matching, Not DOM Rewriting
//!
//! Blocks are found with non-greedy open-tag-to-close-tag patterns and
//! replaced wholesale. The site is hand-authored and the blocks are not
//! nested, so a full HTML parse would only add the risk of reformatting
//! parts of the page nobody asked to touch.
//!
//! ## Explicit Fallback Policies
//!
//! A post without front-matter has empty metadata; a post without a date is
//! filed under the build date; an unparseable date follows
//! [`config::DateFallback`]. The build date is an input to the pipeline, so
//! all of these are deterministic under test.

pub mod blog_index;
pub mod config;
pub mod fragments;
pub mod images;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod placeholders;
pub mod posts;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
