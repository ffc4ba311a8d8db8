//! The build driver: one linear pass over the site per invocation.
//!
//! ```text
//! posts/*.md ──render──▶ <root>/*.html ─┐
//!            └─cards──▶ blog.html ──────┤
//!                                       ▼
//! root/*.html + blog/*.html ──▶ placeholders ──▶ header/footer/partners ──▶ write if changed
//! ```
//!
//! Files produced earlier in the run are read back by later steps through a
//! pending-write overlay, so a dry run reports exactly what a real run would
//! do while leaving the disk untouched.
//!
//! Failures that only affect one unit of work (a missing template, a post
//! with broken front-matter, a page that is not valid UTF-8, an index page
//! without its markers) are recorded in the [`Report`] and the run carries
//! on. Only a failed write aborts the run.

use crate::blog_index::{self, DatedPost, IndexError};
use crate::config::SiteConfig;
use crate::fragments::{self, Fragments, PartnersOutcome};
use crate::images::ImageIndex;
use crate::placeholders::{self, Resolution};
use crate::posts::{self, Post, PostError};
use crate::types::PageKind;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PipelineError + '_ {
    move |source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Per-invocation switches.
#[derive(Debug, Clone)]
pub struct Options {
    /// Site root every configured path is relative to.
    pub root: PathBuf,
    /// Compute and report everything, write nothing.
    pub dry_run: bool,
    /// Run the placeholder resolver only.
    pub skip_common: bool,
    /// Date used for posts without a usable date.
    pub build_date: NaiveDate,
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub dry_run: bool,
    pub posts: Vec<PostReport>,
    pub index: Option<IndexReport>,
    pub images_found: usize,
    pub pages: Vec<PageReport>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl Report {
    /// Pages whose text changed (or would change).
    pub fn changed_pages(&self) -> impl Iterator<Item = &PageReport> {
        self.pages.iter().filter(|p| p.changed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostReport {
    pub source: String,
    pub output: String,
    pub title: String,
    /// ISO date the post is filed under.
    pub date: String,
    pub hidden: bool,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub file: String,
    pub cards: usize,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub path: String,
    pub kind: PageKind,
    pub conversions: usize,
    pub resolved: Vec<Resolution>,
    pub header: bool,
    pub footer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partners: Option<PartnersOutcome>,
    pub changed: bool,
}

// ============================================================================
// Pending-write overlay
// ============================================================================

/// Reads see earlier writes from the same run; writes reach the disk only
/// outside dry-run mode.
struct SiteFiles {
    dry_run: bool,
    pending: BTreeMap<PathBuf, String>,
}

impl SiteFiles {
    fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            pending: BTreeMap::new(),
        }
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        match self.pending.get(path) {
            Some(text) => Ok(text.clone()),
            None => fs::read_to_string(path),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.pending.contains_key(path) || path.is_file()
    }

    fn write(&mut self, path: &Path, text: String) -> io::Result<()> {
        if !self.dry_run {
            fs::write(path, &text)?;
        }
        self.pending.insert(path.to_path_buf(), text);
        Ok(())
    }

    /// Pending files directly inside `dir`.
    fn pending_in<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = &'a PathBuf> + 'a {
        self.pending.keys().filter(move |p| p.parent() == Some(dir))
    }
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

// ============================================================================
// Driver
// ============================================================================

/// Run the whole build for one site.
pub fn run(config: &SiteConfig, options: &Options) -> Result<Report, PipelineError> {
    let mut files = SiteFiles::new(options.dry_run);
    let mut report = Report {
        dry_run: options.dry_run,
        ..Report::default()
    };

    info!(root = %options.root.display(), dry_run = options.dry_run, "building site");

    if let Some(posts) = render_posts(config, options, &mut files, &mut report)? {
        update_index(config, options, &posts, &mut files, &mut report)?;
    }

    let images_dir = options.root.join(&config.paths.images);
    if !images_dir.is_dir() {
        report.warnings.push(format!(
            "images directory not found: {}",
            relative(&options.root, &images_dir)
        ));
    }
    let index = ImageIndex::build(&images_dir);
    report.images_found = index.len();

    let fragments = if options.skip_common {
        None
    } else {
        let dir = options.root.join(&config.paths.fragments);
        match Fragments::load(&dir) {
            Ok(fragments) => Some(fragments),
            Err(e) => {
                warn!(error = %e, "fragments unavailable, skipping header/footer/partners");
                report.errors.push(e.to_string());
                None
            }
        }
    };

    for (path, kind) in discover_pages(config, &options.root, &files) {
        let original = match files.read(&path) {
            Ok(text) => text,
            Err(e) => {
                let name = relative(&options.root, &path);
                warn!(page = %name, error = %e, "skipping unreadable page");
                report.errors.push(format!("Cannot read page {name}: {e}"));
                continue;
            }
        };
        let page = process_page(
            &path,
            original,
            kind,
            config,
            options,
            &index,
            fragments.as_ref(),
            &mut files,
        )?;
        report.pages.push(page);
    }

    info!(
        pages = report.pages.len(),
        changed = report.changed_pages().count(),
        errors = report.errors.len(),
        "build finished"
    );
    Ok(report)
}

/// Parse and render every post. Returns `None` when the phase could not run.
fn render_posts(
    config: &SiteConfig,
    options: &Options,
    files: &mut SiteFiles,
    report: &mut Report,
) -> Result<Option<Vec<DatedPost>>, PipelineError> {
    let posts_dir = options.root.join(&config.paths.posts);
    let template_path = options.root.join(&config.paths.post_template);

    let template = match fs::read_to_string(&template_path) {
        Ok(text) => text,
        Err(e) => {
            report.errors.push(format!(
                "Cannot read post template {}: {e}; skipping posts and blog index",
                relative(&options.root, &template_path)
            ));
            return Ok(None);
        }
    };
    let sources = match posts::discover_posts(&posts_dir) {
        Ok(sources) => sources,
        Err(e) => {
            report.errors.push(format!(
                "Cannot read posts directory {}: {e}; skipping posts and blog index",
                relative(&options.root, &posts_dir)
            ));
            return Ok(None);
        }
    };

    let mut dated = Vec::with_capacity(sources.len());
    for source in sources {
        let parsed = Post::load(&source).and_then(|post| {
            let date = post.resolve_date(options.build_date, config.posts.date_fallback)?;
            Ok(DatedPost { post, date })
        });
        let entry = match parsed {
            Ok(entry) => entry,
            Err(e) => {
                warn!(post = %source.display(), error = %e, "skipping post");
                report.errors.push(match e {
                    PostError::Io(_) => format!("{}: {e}", relative(&options.root, &source)),
                    _ => e.to_string(),
                });
                continue;
            }
        };

        let output = options.root.join(entry.post.output_name());
        let html = posts::render(&entry.post, entry.date, &template, &config.posts);
        let changed = files.read(&output).map(|old| old != html).unwrap_or(true);
        if changed {
            files.write(&output, html).map_err(io_error(&output))?;
        }
        debug!(post = %entry.post.filename, changed, "rendered post");

        report.posts.push(PostReport {
            source: relative(&options.root, &source),
            output: relative(&options.root, &output),
            title: entry.post.title_or(&config.posts.default_title).to_string(),
            date: entry.date.to_string(),
            hidden: entry.post.hidden,
            changed,
        });
        dated.push(entry);
    }
    Ok(Some(dated))
}

fn update_index(
    config: &SiteConfig,
    options: &Options,
    posts: &[DatedPost],
    files: &mut SiteFiles,
    report: &mut Report,
) -> Result<(), PipelineError> {
    let path = options.root.join(&config.paths.blog_index);
    let name = relative(&options.root, &path);
    if !files.exists(&path) {
        report.errors.push(format!("Blog index not found: {name}"));
        return Ok(());
    }

    let doc = match files.read(&path) {
        Ok(text) => text,
        Err(e) => {
            report.errors.push(format!("Cannot read blog index {name}: {e}"));
            return Ok(());
        }
    };
    match blog_index::update(&doc, &name, posts, &config.posts, &config.markers) {
        Ok(text) => {
            let changed = text != doc;
            if changed {
                files.write(&path, text).map_err(io_error(&path))?;
            }
            report.index = Some(IndexReport {
                file: name,
                cards: blog_index::listing(posts).len(),
                changed,
            });
        }
        Err(e @ IndexError::MissingMarker { .. }) => report.errors.push(e.to_string()),
        Err(IndexError::Io(source)) => return Err(PipelineError::Io { path, source }),
    }
    Ok(())
}

/// Every page to normalize, with its role: root pages first, then the blog
/// directory, each sorted by path.
fn discover_pages(config: &SiteConfig, root: &Path, files: &SiteFiles) -> Vec<(PathBuf, PageKind)> {
    let blog_dir = root.join(&config.paths.blog_dir);
    let mut pages = Vec::new();

    for (dir, in_blog_dir) in [(root.to_path_buf(), false), (blog_dir, true)] {
        let mut found: BTreeSet<PathBuf> = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_html(p))
            .collect();
        found.extend(files.pending_in(&dir).filter(|p| is_html(p)).cloned());

        for path in found {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let kind = PageKind::classify(
                in_blog_dir,
                &file_name,
                &config.pages.home,
                &config.pages.blog_template,
            );
            pages.push((path, kind));
        }
    }
    pages
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("html"))
        .unwrap_or(false)
}

#[allow(clippy::too_many_arguments)]
fn process_page(
    path: &Path,
    original: String,
    kind: PageKind,
    config: &SiteConfig,
    options: &Options,
    index: &ImageIndex,
    fragments: Option<&Fragments>,
    files: &mut SiteFiles,
) -> Result<PageReport, PipelineError> {
    let url_prefix = &config.images.url_prefix;

    let pass = placeholders::apply(&original, index, url_prefix, kind);
    let mut page = PageReport {
        path: relative(&options.root, path),
        kind,
        conversions: pass.conversions,
        resolved: pass.resolved,
        header: false,
        footer: false,
        partners: None,
        changed: false,
    };
    let mut text = pass.text;

    if let Some(fragments) = fragments {
        let normalized = fragments::normalize(
            &text,
            kind,
            fragments,
            index,
            &config.partners,
            &config.markers,
            url_prefix,
        );
        text = normalized.text;
        page.header = normalized.header;
        page.footer = normalized.footer;
        page.partners = normalized.partners;
    }

    page.changed = text != original;
    if page.changed {
        files.write(path, text).map_err(io_error(path))?;
    }
    debug!(page = %page.path, ?kind, changed = page.changed, "processed page");
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn build_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn options(root: &Path) -> Options {
        Options {
            root: root.to_path_buf(),
            dry_run: false,
            skip_common: false,
            build_date: build_date(),
        }
    }

    fn build(root: &Path, tweak: impl FnOnce(&mut Options)) -> Report {
        let config = crate::config::load_config(root).unwrap();
        let mut opts = options(root);
        tweak(&mut opts);
        run(&config, &opts).unwrap()
    }

    // =========================================================================
    // Overlay
    // =========================================================================

    #[test]
    fn overlay_reads_pending_writes_in_dry_run() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("new.html");
        let mut files = SiteFiles::new(true);
        files.write(&path, "<p>hi</p>".to_string()).unwrap();
        assert!(!path.exists());
        assert!(files.exists(&path));
        assert_eq!(files.read(&path).unwrap(), "<p>hi</p>");
        assert_eq!(files.pending_in(tmp.path()).count(), 1);
    }

    // =========================================================================
    // Full build over the fixture site
    // =========================================================================

    #[test]
    fn renders_posts_to_site_root() {
        let tmp = setup_fixtures();
        let report = build(tmp.path(), |_| {});
        assert!(report.errors.is_empty(), "{:?}", report.errors);

        let html = fs::read_to_string(tmp.path().join("laser-alignment.html")).unwrap();
        assert!(html.contains("Aligning a Laser Tracker"));
        assert!(html.contains("March 01, 2025"));
        assert!(!html.contains("{{ "));

        let post = find_post(&report, "laser-alignment.html");
        assert_eq!(post.date, "2025-03-01");
        assert!(post.changed);
    }

    #[test]
    fn blog_index_lists_visible_posts_newest_first() {
        let tmp = setup_fixtures();
        let report = build(tmp.path(), |_| {});
        let index = report.index.as_ref().unwrap();
        assert_eq!(index.file, "blog.html");
        assert_eq!(index.cards, 2);

        let html = fs::read_to_string(tmp.path().join("blog.html")).unwrap();
        let march = html.find("Aligning a Laser Tracker").unwrap();
        let january = html.find("Interferometry Basics").unwrap();
        assert!(march < january);
        assert!(!html.contains("Unreleased Draft"));
    }

    #[test]
    fn pages_get_roles_and_canonical_blocks() {
        let tmp = setup_fixtures();
        let report = build(tmp.path(), |_| {});

        assert_eq!(find_page_report(&report, "index.html").kind, PageKind::RootIndex);
        assert_eq!(find_page_report(&report, "about.html").kind, PageKind::Root);
        assert_eq!(find_page_report(&report, "blog/archive.html").kind, PageKind::Blog);
        assert_eq!(
            find_page_report(&report, "blog/template.html").kind,
            PageKind::BlogTemplate
        );

        let about = fs::read_to_string(tmp.path().join("about.html")).unwrap();
        let footer_root = fs::read_to_string(tmp.path().join("fragments/footer-root.html")).unwrap();
        assert!(about.contains(footer_root.trim_matches('\n')));

        let archive = fs::read_to_string(tmp.path().join("blog/archive.html")).unwrap();
        assert!(archive.contains(r#"src="../imgs/team-photo.jpg""#));
        assert!(archive.contains(r#"href="../index.html""#));
    }

    #[test]
    fn rendered_posts_are_normalized_as_root_pages() {
        let tmp = setup_fixtures();
        let report = build(tmp.path(), |_| {});
        assert_eq!(find_page_report(&report, "laser-alignment.html").kind, PageKind::Root);
    }

    #[test]
    fn home_page_partners_rebuilt() {
        let tmp = setup_fixtures();
        let report = build(tmp.path(), |_| {});
        let home = find_page_report(&report, "index.html");
        assert_eq!(home.partners, Some(PartnersOutcome::Updated));

        let html = fs::read_to_string(tmp.path().join("index.html")).unwrap();
        assert_eq!(html.matches(r#"<div class="partners-track">"#).count(), 1);
        assert_eq!(html.matches(r#"<div class="slide-track">"#).count(), 2);
        assert!(html.matches("partner-logo-a.png").count() >= 40);
        assert!(html.matches("partner-logo-b.svg").count() >= 40);
    }

    #[test]
    fn placeholders_resolved_and_misses_kept() {
        let tmp = setup_fixtures();
        let report = build(tmp.path(), |_| {});
        let about = find_page_report(&report, "about.html");
        let images: Vec<&str> = about.resolved.iter().map(|r| r.image.as_str()).collect();
        assert_eq!(images, vec!["team-photo.jpg"]);
        assert_eq!(about.conversions, 1);

        let html = fs::read_to_string(tmp.path().join("about.html")).unwrap();
        assert!(html.contains(r#"<div class="image-placeholder">future-lab.png</div>"#));
    }

    #[test]
    fn second_run_changes_nothing() {
        let tmp = setup_fixtures();
        build(tmp.path(), |_| {});
        let before = snapshot_html(tmp.path());

        let report = build(tmp.path(), |_| {});
        assert_eq!(report.changed_pages().count(), 0);
        assert!(report.posts.iter().all(|p| !p.changed));
        assert!(!report.index.as_ref().unwrap().changed);
        assert_eq!(snapshot_html(tmp.path()), before);
    }

    #[test]
    fn dry_run_writes_nothing_but_reports_everything() {
        let tmp = setup_fixtures();
        let before = snapshot_html(tmp.path());

        let report = build(tmp.path(), |o| o.dry_run = true);
        assert!(report.dry_run);
        assert_eq!(snapshot_html(tmp.path()), before);
        assert!(!tmp.path().join("laser-alignment.html").exists());

        // Rendered posts are still discovered and processed through the overlay.
        find_page_report(&report, "laser-alignment.html");
        assert!(report.index.as_ref().unwrap().changed);

        let real = build(tmp.path(), |_| {});
        let dry_changed: Vec<&str> = report.changed_pages().map(|p| p.path.as_str()).collect();
        let real_changed: Vec<&str> = real.changed_pages().map(|p| p.path.as_str()).collect();
        assert_eq!(dry_changed, real_changed);
    }

    #[test]
    fn skip_common_only_resolves_placeholders() {
        let tmp = setup_fixtures();
        let report = build(tmp.path(), |o| o.skip_common = true);
        let home = find_page_report(&report, "index.html");
        assert_eq!(home.partners, None);
        assert!(report.pages.iter().all(|p| !p.header && !p.footer));

        let html = fs::read_to_string(tmp.path().join("index.html")).unwrap();
        assert!(html.contains("Old partner strip"));
    }

    // =========================================================================
    // Soft failures
    // =========================================================================

    #[test]
    fn missing_template_skips_posts_and_index() {
        let tmp = setup_fixtures();
        fs::remove_file(tmp.path().join("blog/template.html")).unwrap();
        let report = build(tmp.path(), |_| {});
        assert!(report.posts.is_empty());
        assert!(report.index.is_none());
        assert!(report.errors.iter().any(|e| e.contains("post template")));
        // Pages are still processed.
        find_page_report(&report, "about.html");
    }

    #[test]
    fn missing_index_markers_leave_index_untouched() {
        let tmp = setup_fixtures();
        let path = tmp.path().join("blog.html");
        let stripped = fs::read_to_string(&path)
            .unwrap()
            .replace("<!-- BLOG_POSTS_END -->", "");
        fs::write(&path, &stripped).unwrap();

        let report = build(tmp.path(), |o| o.skip_common = true);
        assert!(report.index.is_none());
        assert!(report.errors.iter().any(|e| e.contains("BLOG_POSTS_END")));
        assert_eq!(fs::read_to_string(&path).unwrap(), stripped);
    }

    #[test]
    fn broken_frontmatter_skips_only_that_post() {
        let tmp = setup_fixtures();
        fs::write(
            tmp.path().join("blog/posts/broken.md"),
            "---\ntitle: [oops\n---\nbody",
        )
        .unwrap();
        let report = build(tmp.path(), |_| {});
        assert_eq!(report.posts.len(), 3);
        assert!(report.errors.iter().any(|e| e.contains("broken.md")));
        assert!(!tmp.path().join("broken.html").exists());
    }

    #[test]
    fn strict_dates_reject_bad_post() {
        let tmp = setup_fixtures();
        fs::write(
            tmp.path().join("blog/posts/someday.md"),
            "---\ntitle: Someday\ndate: soon\n---\nbody",
        )
        .unwrap();
        fs::write(
            tmp.path().join(crate::config::CONFIG_FILE),
            "[posts]\ndate_fallback = \"error\"\n",
        )
        .unwrap();
        let report = build(tmp.path(), |_| {});
        assert!(report.errors.iter().any(|e| e.contains("someday.md")));
        assert!(report.posts.iter().all(|p| p.source != "blog/posts/someday.md"));
    }

    #[test]
    fn lenient_dates_use_build_date() {
        let tmp = setup_fixtures();
        fs::write(
            tmp.path().join("blog/posts/someday.md"),
            "---\ntitle: Someday\ndate: soon\n---\nbody",
        )
        .unwrap();
        let report = build(tmp.path(), |_| {});
        assert_eq!(find_post(&report, "someday.html").date, "2026-10-18");
    }

    #[test]
    fn missing_fragments_reported_placeholders_still_run() {
        let tmp = setup_fixtures();
        fs::remove_file(tmp.path().join("fragments/header-blog.html")).unwrap();
        let report = build(tmp.path(), |_| {});
        assert!(report.errors.iter().any(|e| e.contains("header-blog.html")));
        let about = find_page_report(&report, "about.html");
        assert!(!about.header && !about.footer);
        assert_eq!(about.resolved.len(), 1);
    }

    #[test]
    fn missing_images_dir_is_a_warning() {
        let tmp = setup_fixtures();
        fs::remove_dir_all(tmp.path().join("imgs")).unwrap();
        let report = build(tmp.path(), |_| {});
        assert_eq!(report.images_found, 0);
        assert!(report.warnings.iter().any(|w| w.contains("imgs")));
        let home = find_page_report(&report, "index.html");
        assert_eq!(home.partners, Some(PartnersOutcome::NoLogos));
    }

    #[test]
    fn unreadable_page_is_reported_and_skipped() {
        let tmp = setup_fixtures();
        fs::write(tmp.path().join("legacy.html"), b"<p>caf\xe9</p>").unwrap();
        let report = build(tmp.path(), |_| {});

        assert!(
            report
                .errors
                .iter()
                .any(|e| e.contains("Cannot read page legacy.html"))
        );
        assert!(report.pages.iter().all(|p| p.path != "legacy.html"));
        assert!(find_page_report(&report, "about.html").changed);
        find_page_report(&report, "blog/archive.html");
        assert_eq!(
            fs::read(tmp.path().join("legacy.html")).unwrap(),
            b"<p>caf\xe9</p>"
        );
    }

    #[test]
    fn unreadable_blog_index_is_reported() {
        let tmp = setup_fixtures();
        fs::write(tmp.path().join("blog.html"), b"<ul>\xff</ul>").unwrap();
        let report = build(tmp.path(), |_| {});

        assert!(report.index.is_none());
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.contains("Cannot read blog index blog.html"))
        );
        assert!(tmp.path().join("laser-alignment.html").exists());
    }
}
