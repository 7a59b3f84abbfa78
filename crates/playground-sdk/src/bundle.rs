//! Application bundle discovery.
//!
//! Finds the `.app` directory xcodebuild produced under `TARGET_BUILD_DIR`.
//! The search is deterministic: entries are visited in file-name order, the
//! shallowest match wins, and the walk never descends into a bundle (so an
//! embedded watch or extension app is never picked over the host app).

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::types::PlaygroundError;

/// Directory-name suffix of an installable application bundle.
pub const APP_SUFFIX: &str = ".app";

fn is_app_bundle(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(APP_SUFFIX))
}

/// Returns the first `.app` directory below `build_dir`, or `None`.
///
/// Unreadable subdirectories are skipped.
pub fn find_app(build_dir: &Path) -> Option<PathBuf> {
    let mut best: Option<(usize, PathBuf)> = None;
    let mut walker = WalkDir::new(build_dir)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let Ok(entry) = entry else {
            continue;
        };
        if !is_app_bundle(&entry) {
            continue;
        }
        walker.skip_current_dir();
        let depth = entry.depth();
        if best.as_ref().is_none_or(|(best_depth, _)| depth < *best_depth) {
            best = Some((depth, entry.into_path()));
        }
    }

    best.map(|(_, path)| path)
}

/// Like [`find_app`], but a missing bundle is a `BundleNotFound` error.
pub fn require_app(build_dir: &Path) -> Result<PathBuf, PlaygroundError> {
    find_app(build_dir).ok_or_else(|| PlaygroundError::BundleNotFound(build_dir.to_path_buf()))
}
