//! Shared test utilities for the pagewright test suite.
//!
//! Provides a disposable copy of the fixture site and lookup helpers over a
//! build [`Report`].
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let report = run(&load_config(tmp.path()).unwrap(), &options).unwrap();
//!
//! let about = find_page_report(&report, "about.html");
//! assert_eq!(about.kind, PageKind::Root);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::pipeline::{PageReport, PostReport, Report};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Every `.html` file under `root`, keyed by relative path.
pub fn snapshot_html(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, std::fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

// =========================================================================
// Report lookups (panic with a clear message on a miss)
// =========================================================================

/// Find a page report by site-relative path. Panics if not found.
pub fn find_page_report<'a>(report: &'a Report, path: &str) -> &'a PageReport {
    report
        .pages
        .iter()
        .find(|p| p.path == path)
        .unwrap_or_else(|| {
            let paths: Vec<&str> = report.pages.iter().map(|p| p.path.as_str()).collect();
            panic!("page '{path}' not found. Available: {paths:?}")
        })
}

/// Find a rendered post by output path. Panics if not found.
pub fn find_post<'a>(report: &'a Report, output: &str) -> &'a PostReport {
    report
        .posts
        .iter()
        .find(|p| p.output == output)
        .unwrap_or_else(|| {
            let outputs: Vec<&str> = report.posts.iter().map(|p| p.output.as_str()).collect();
            panic!("post '{output}' not found. Available: {outputs:?}")
        })
}
