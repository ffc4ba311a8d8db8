//! Index Updater: regenerates the card listing on the blog index page.
//!
//! Only the text strictly between the two blog-post marker comments is
//! generated; everything else in the page belongs to its author. If either
//! marker is missing the page is left alone and the update fails.

use crate::config::{MarkersConfig, PostsConfig};
use crate::naming::{strip_parent_segment, type_slug};
use crate::posts::{Post, display_date};
use chrono::NaiveDate;
use maud::{Markup, PreEscaped, html};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Marker {marker} not found in {file}")]
    MissingMarker { file: String, marker: String },
}

/// A post paired with the date it is filed under.
#[derive(Debug, Clone)]
pub struct DatedPost {
    pub post: Post,
    pub date: NaiveDate,
}

/// Visible posts, newest first. Posts sharing a date are ordered by file name.
pub fn listing(posts: &[DatedPost]) -> Vec<&DatedPost> {
    let mut visible: Vec<&DatedPost> = posts.iter().filter(|p| !p.post.hidden).collect();
    visible.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.post.filename.cmp(&b.post.filename))
    });
    visible
}

/// One card per visible post, newline separated.
pub fn render_cards(posts: &[DatedPost], config: &PostsConfig) -> String {
    listing(posts)
        .into_iter()
        .map(|entry| card(entry, config).into_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Front-matter text is author HTML and goes in unescaped.
fn card(entry: &DatedPost, config: &PostsConfig) -> Markup {
    let post = &entry.post;
    let post_type = post.post_type.as_deref().unwrap_or(&config.default_type);
    let image = strip_parent_segment(
        post.image
            .as_deref()
            .filter(|i| !i.is_empty())
            .unwrap_or(&config.default_card_image),
    );

    html! {
        article class="blog-card" data-type=(type_slug(post_type)) {
            div class="blog-card-image" style=(PreEscaped(format!("background-image: url('{image}')"))) {}
            div class="blog-card-content" {
                span class="blog-type" { (PreEscaped(post_type)) }
                span class="blog-date" { (display_date(entry.date)) }
                h3 { (PreEscaped(post.title_or(&config.default_title))) }
                p { (PreEscaped(post.description.as_deref().unwrap_or(""))) }
                a href=(post.output_name()) class="read-more" {
                    "Read More "
                    (arrow_icon())
                }
            }
        }
    }
}

fn arrow_icon() -> Markup {
    html! {
        svg class="arrow-right" width="12" height="12" viewBox="0 0 24 24" fill="none"
            stroke="currentColor" stroke-width="3" stroke-linecap="round" stroke-linejoin="round" {
            line x1="7" y1="17" x2="17" y2="7" {}
            polyline points="7 7 17 7 17 17" {}
        }
    }
}

/// Replace the text between `start` and `end` with `\n{block}\n`.
pub fn splice(doc: &str, file: &str, start: &str, end: &str, block: &str) -> Result<String, IndexError> {
    let missing = |marker: &str| IndexError::MissingMarker {
        file: file.to_string(),
        marker: marker.to_string(),
    };
    let start_at = doc.find(start).ok_or_else(|| missing(start))?;
    let inner_start = start_at + start.len();
    let inner_end = doc[inner_start..]
        .find(end)
        .map(|offset| inner_start + offset)
        .ok_or_else(|| missing(end))?;

    Ok(format!("{}\n{block}\n{}", &doc[..inner_start], &doc[inner_end..]))
}

/// Regenerate the card listing of the index page `doc`.
pub fn update(
    doc: &str,
    file: &str,
    posts: &[DatedPost],
    config: &PostsConfig,
    markers: &MarkersConfig,
) -> Result<String, IndexError> {
    splice(
        doc,
        file,
        &markers.blog_posts_start,
        &markers.blog_posts_end,
        &render_cards(posts, config),
    )
}
