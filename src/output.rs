//! CLI output formatting for a build run.
//!
//! # Output Format
//!
//! ```text
//! Posts
//!     blog/posts/laser-alignment.md → laser-alignment.html (2025-03-01)
//!     blog/posts/draft.md → draft.html (2026-10-18, hidden)
//!
//! Blog index
//!     blog.html: 2 cards
//!
//! Pages (6 images indexed)
//!     index.html [home]
//!         Header updated
//!         Partners track rebuilt
//!     about.html
//!         Converted 1 background image
//!         team-photo → team-photo.jpg
//!     blog/archive.html [blog] (unchanged)
//!
//! Updated 5 files
//! ```
//!
//! Under `--dry-run` the summary becomes
//! `Dry run: 5 changes that would be made, nothing written`.
//!
//! # Architecture
//!
//! [`format_report`] returns `Vec<String>` for testability and
//! [`print_report`] writes it to stdout. Formatting is pure: no I/O, no side
//! effects.

use crate::fragments::PartnersOutcome;
use crate::pipeline::{PageReport, Report};
use crate::types::PageKind;
use std::collections::BTreeSet;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn kind_tag(kind: PageKind) -> Option<&'static str> {
    match kind {
        PageKind::Root => None,
        PageKind::RootIndex => Some("home"),
        PageKind::Blog => Some("blog"),
        PageKind::BlogTemplate => Some("template"),
    }
}

fn partners_line(outcome: PartnersOutcome) -> &'static str {
    match outcome {
        PartnersOutcome::Updated => "Partners track rebuilt",
        PartnersOutcome::Unchanged => "Partners track already current",
        PartnersOutcome::NoLogos => "Partners: no logo images found, left as is",
        PartnersOutcome::MissingMarkers => "Partners: markers not found, left as is",
    }
}

/// Header line plus detail lines for one page.
fn page_lines(page: &PageReport) -> Vec<String> {
    let mut header = page.path.clone();
    if let Some(tag) = kind_tag(page.kind) {
        header.push_str(&format!(" [{tag}]"));
    }
    if !page.changed {
        header.push_str(" (unchanged)");
    }

    let mut lines = vec![format!("{}{}", indent(1), header)];
    if page.conversions > 0 {
        lines.push(format!(
            "{}Converted {}",
            indent(2),
            plural(page.conversions, "background image", "background images")
        ));
    }
    for r in &page.resolved {
        lines.push(format!("{}{} → {}", indent(2), r.placeholder, r.image));
    }
    if page.header {
        lines.push(format!("{}Header updated", indent(2)));
    }
    if page.footer {
        lines.push(format!("{}Footer updated", indent(2)));
    }
    if let Some(outcome) = page.partners {
        lines.push(format!("{}{}", indent(2), partners_line(outcome)));
    }
    lines
}

/// Distinct files written (or that would be written) by the run.
pub fn changed_files(report: &Report) -> BTreeSet<&str> {
    let mut files: BTreeSet<&str> = BTreeSet::new();
    files.extend(
        report
            .posts
            .iter()
            .filter(|p| p.changed)
            .map(|p| p.output.as_str()),
    );
    if let Some(index) = report.index.as_ref().filter(|i| i.changed) {
        files.insert(&index.file);
    }
    files.extend(report.changed_pages().map(|p| p.path.as_str()));
    files
}

/// Format the full run report.
pub fn format_report(report: &Report) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.posts.is_empty() {
        lines.push("Posts".to_string());
        for post in &report.posts {
            let hidden = if post.hidden { ", hidden" } else { "" };
            lines.push(format!(
                "{}{} → {} ({}{})",
                indent(1),
                post.source,
                post.output,
                post.date,
                hidden
            ));
        }
        lines.push(String::new());
    }

    if let Some(index) = &report.index {
        lines.push("Blog index".to_string());
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            index.file,
            plural(index.cards, "card", "cards")
        ));
        lines.push(String::new());
    }

    lines.push(format!(
        "Pages ({} indexed)",
        plural(report.images_found, "image", "images")
    ));
    for page in &report.pages {
        lines.extend(page_lines(page));
    }

    for (title, entries) in [("Warnings", &report.warnings), ("Errors", &report.errors)] {
        if !entries.is_empty() {
            lines.push(String::new());
            lines.push(title.to_string());
            lines.extend(entries.iter().map(|e| format!("{}{}", indent(1), e)));
        }
    }

    lines.push(String::new());
    let count = changed_files(report).len();
    if report.dry_run {
        lines.push(format!(
            "Dry run: {} that would be made, nothing written",
            plural(count, "change", "changes")
        ));
    } else if count == 0 {
        lines.push("Everything up to date".to_string());
    } else {
        lines.push(format!("Updated {}", plural(count, "file", "files")));
    }
    lines
}

pub fn print_report(report: &Report) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{IndexReport, PostReport};
    use crate::placeholders::Resolution;

    fn page(path: &str, kind: PageKind, changed: bool) -> PageReport {
        PageReport {
            path: path.to_string(),
            kind,
            conversions: 0,
            resolved: Vec::new(),
            header: false,
            footer: false,
            partners: None,
            changed,
        }
    }

    fn sample_report() -> Report {
        let mut home = page("index.html", PageKind::RootIndex, true);
        home.header = true;
        home.partners = Some(PartnersOutcome::Updated);

        let mut about = page("about.html", PageKind::Root, true);
        about.conversions = 1;
        about.resolved.push(Resolution {
            placeholder: "team-photo".to_string(),
            image: "team-photo.jpg".to_string(),
        });

        Report {
            dry_run: false,
            posts: vec![PostReport {
                source: "blog/posts/alpha.md".to_string(),
                output: "alpha.html".to_string(),
                title: "Alpha".to_string(),
                date: "2025-03-01".to_string(),
                hidden: false,
                changed: true,
            }],
            index: Some(IndexReport {
                file: "blog.html".to_string(),
                cards: 1,
                changed: true,
            }),
            images_found: 6,
            pages: vec![
                home,
                about,
                page("alpha.html", PageKind::Root, true),
                page("blog/archive.html", PageKind::Blog, false),
            ],
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "card", "cards"), "1 card");
        assert_eq!(plural(0, "card", "cards"), "0 cards");
        assert_eq!(plural(3, "card", "cards"), "3 cards");
    }

    #[test]
    fn changed_files_deduplicates_posts_and_pages() {
        let report = sample_report();
        let files: Vec<&str> = changed_files(&report).into_iter().collect();
        assert_eq!(files, vec!["about.html", "alpha.html", "blog.html", "index.html"]);
    }

    // =========================================================================
    // Report
    // =========================================================================

    #[test]
    fn format_full_report() {
        let lines = format_report(&sample_report());
        assert_eq!(
            lines,
            vec![
                "Posts",
                "    blog/posts/alpha.md → alpha.html (2025-03-01)",
                "",
                "Blog index",
                "    blog.html: 1 card",
                "",
                "Pages (6 images indexed)",
                "    index.html [home]",
                "        Header updated",
                "        Partners track rebuilt",
                "    about.html",
                "        Converted 1 background image",
                "        team-photo → team-photo.jpg",
                "    alpha.html",
                "    blog/archive.html [blog] (unchanged)",
                "",
                "Updated 4 files",
            ]
        );
    }

    #[test]
    fn dry_run_wording() {
        let mut report = sample_report();
        report.dry_run = true;
        let lines = format_report(&report);
        assert_eq!(
            lines.last().unwrap(),
            "Dry run: 4 changes that would be made, nothing written"
        );
    }

    #[test]
    fn nothing_changed() {
        let report = Report {
            pages: vec![page("about.html", PageKind::Root, false)],
            ..Report::default()
        };
        let lines = format_report(&report);
        assert_eq!(lines.last().unwrap(), "Everything up to date");
        assert!(!lines.contains(&"Posts".to_string()));
        assert!(!lines.contains(&"Blog index".to_string()));
    }

    #[test]
    fn warnings_and_errors_listed() {
        let report = Report {
            warnings: vec!["images directory not found: imgs".to_string()],
            errors: vec!["Marker <!-- BLOG_POSTS_END --> not found in blog.html".to_string()],
            ..Report::default()
        };
        let lines = format_report(&report);
        let warn_at = lines.iter().position(|l| l == "Warnings").unwrap();
        assert_eq!(lines[warn_at + 1], "    images directory not found: imgs");
        let err_at = lines.iter().position(|l| l == "Errors").unwrap();
        assert!(lines[err_at + 1].contains("BLOG_POSTS_END"));
        assert!(warn_at < err_at);
    }

    #[test]
    fn partners_outcomes_described() {
        let mut home = page("index.html", PageKind::RootIndex, false);
        home.partners = Some(PartnersOutcome::NoLogos);
        let lines = page_lines(&home);
        assert_eq!(
            lines,
            vec![
                "    index.html [home] (unchanged)",
                "        Partners: no logo images found, left as is",
            ]
        );
    }

    #[test]
    fn hidden_post_marked() {
        let mut report = sample_report();
        report.posts[0].hidden = true;
        let lines = format_report(&report);
        assert_eq!(lines[1], "    blog/posts/alpha.md → alpha.html (2025-03-01, hidden)");
    }
}
