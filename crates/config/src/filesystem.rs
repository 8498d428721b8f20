//! Filesystem ownership: page identities, routes, and ancestor matching
//!
//! Ownership and precedence are pure functions over posix path strings. A
//! bundle file governs its own directory and everything below it;
//! `renderer` grouping segments are transparent for that comparison.

use crate::index::BundleFile;
use pageconf_core::constants::{RENDERER_SEGMENT, ROUTE_IGNORED_SEGMENTS};
use pageconf_utils::paths;

/// Derive the page identity of a declaration file: the directory containing
/// it, as a root-anchored posix path.
#[must_use]
pub fn determine_page_id(file_path: &str) -> String {
    debug_assert!(file_path.starts_with('/'));
    paths::dirname(file_path)
}

/// Derive the filesystem route for a declaration file. Grouping segments
/// (`pages`, `index`, `src`, `renderer`) carry no routing meaning and are
/// dropped; an empty result is the root route `/`.
#[must_use]
pub fn determine_route_from_filesystem(file_path: &str) -> String {
    let dir = paths::dirname(file_path);
    let segments: Vec<&str> = dir
        .split('/')
        .filter(|s| !s.is_empty() && !ROUTE_IGNORED_SEGMENTS.contains(s))
        .collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Directory a bundle file governs, with `renderer` grouping segments
/// stripped before ownership comparisons.
#[must_use]
pub fn config_fs_root(bundle_file_path: &str) -> String {
    let dir = paths::dirname(bundle_file_path);
    let segments: Vec<&str> = dir
        .split('/')
        .filter(|s| !s.is_empty() && *s != RENDERER_SEGMENT)
        .collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Ancestor-prefix match on whole path segments: `/pages` governs
/// `/pages/about` but not `/pages-admin`.
#[must_use]
pub fn is_ancestor(fs_root: &str, page_id: &str) -> bool {
    if fs_root == "/" {
        return true;
    }
    page_id == fs_root || page_id.starts_with(&format!("{fs_root}/"))
}

/// The bundle files in scope for a page, sorted deepest-first so the first
/// hit during resolution is the nearest ancestor. Ties in depth are kept in
/// path order; the resolver reports same-depth duplicates as usage errors.
#[must_use]
pub fn relevant_bundle_files<'a>(page_id: &str, bundles: &'a [BundleFile]) -> Vec<&'a BundleFile> {
    let mut relevant: Vec<&BundleFile> = bundles
        .iter()
        .filter(|bundle| is_ancestor(&bundle.fs_root, page_id))
        .collect();
    relevant.sort_by(|a, b| {
        paths::path_depth(&b.fs_root)
            .cmp(&paths::path_depth(&a.fs_root))
            .then_with(|| a.path.cmp(&b.path))
    });
    relevant
}
