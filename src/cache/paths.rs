// Cache path utilities.
// Resolves the per-user cache directory and per-fingerprint entry paths.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use super::fingerprint::RequestFingerprint;

/// Get the default response cache directory (~/.cache/phab-stats/conduit on Linux).
pub fn default_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "phab-stats").map(|dirs| dirs.cache_dir().join("conduit"))
}

/// Path of the file holding one cached response.
pub fn entry_path(root: &Path, fingerprint: &RequestFingerprint) -> PathBuf {
    root.join(format!("{}.json", fingerprint.as_str()))
}
