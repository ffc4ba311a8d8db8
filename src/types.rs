//! Shared types used by the normalizer, the driver, and the report.

use serde::Serialize;

/// Where a page lives and what it is, derived from its path on every run.
///
/// The kind decides which canonical header and footer a page receives and
/// whether image paths need a `../` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageKind {
    /// A page in the site root.
    Root,
    /// The home page in the site root.
    RootIndex,
    /// A page one level down, inside the blog directory.
    Blog,
    /// The post template. It sits in the blog directory but is rendered
    /// into the site root, so it is treated like a root page.
    BlogTemplate,
}

impl PageKind {
    /// Classify a page from its directory and file name.
    pub fn classify(in_blog_dir: bool, file_name: &str, home: &str, blog_template: &str) -> Self {
        match (in_blog_dir, file_name) {
            (true, name) if name == blog_template => PageKind::BlogTemplate,
            (true, _) => PageKind::Blog,
            (false, name) if name == home => PageKind::RootIndex,
            (false, _) => PageKind::Root,
        }
    }

    /// Whether links on this page must climb one directory to reach the root.
    pub fn is_nested(self) -> bool {
        self == PageKind::Blog
    }

    /// Whether this is the home page, the only page carrying the partners track.
    pub fn is_home(self) -> bool {
        self == PageKind::RootIndex
    }

    /// Prefix for site-relative URLs written into this page.
    pub fn root_prefix(self) -> &'static str {
        if self.is_nested() { "../" } else { "" }
    }
}
