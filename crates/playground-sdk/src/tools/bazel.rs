//! Bazel executable discovery.
//!
//! The repository pins its Bazel version in `.bazelversion`; the matching
//! binary is kept at `build-input/bazel-<version>-darwin-<arch>`. When the pin
//! exists but the binary doesn't, it is downloaded (from the cache host when
//! one is given, otherwise from the Bazel GitHub releases). Without a pin the
//! locator falls back to `bazel` or `bazelisk` on `PATH`.

use std::env;
use std::path::{Path, PathBuf};

use crate::types::PlaygroundError;

/// File that pins the Bazel version at the repository root.
pub const VERSION_FILE: &str = ".bazelversion";
/// Directory holding downloaded build tools.
pub const BUILD_INPUT_DIR: &str = "build-input";

const RELEASES_URL: &str = "https://github.com/bazelbuild/bazel/releases/download";

/// Locates (and if needed fetches) the Bazel executable for a repository.
#[derive(Debug, Clone)]
pub struct BazelLocator {
    working_dir: PathBuf,
    cache_host: Option<String>,
    search_path: Option<std::ffi::OsString>,
}

impl BazelLocator {
    /// Creates a locator for the repository at `working_dir`.
    ///
    /// # Arguments
    ///
    /// * `working_dir` - Repository root containing `.bazelversion`
    /// * `cache_host` - Optional base URL serving `bazel-<version>-darwin-<arch>`
    pub fn new(working_dir: impl Into<PathBuf>, cache_host: Option<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            cache_host,
            search_path: None,
        }
    }

    /// Overrides the `PATH` value used for the fallback search.
    pub fn search_path(mut self, path: impl Into<std::ffi::OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Version pinned in `.bazelversion`, if any.
    pub fn pinned_version(&self) -> Result<Option<String>, PlaygroundError> {
        let path = self.working_dir.join(VERSION_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let version = std::fs::read_to_string(&path)?.trim().to_string();
        if version.is_empty() {
            return Ok(None);
        }
        Ok(Some(version))
    }

    /// Path of the managed binary for `version`.
    pub fn managed_binary(&self, version: &str) -> PathBuf {
        self.working_dir
            .join(BUILD_INPUT_DIR)
            .join(binary_name(version))
    }

    /// Returns an absolute path to a usable Bazel executable.
    pub fn locate(&self) -> Result<PathBuf, PlaygroundError> {
        if let Some(version) = self.pinned_version()? {
            let managed = self.managed_binary(&version);
            if managed.is_file() {
                tracing::debug!("Using managed bazel {}", managed.display());
                return Ok(absolute(&managed));
            }
            self.fetch(&version, &managed)?;
            return Ok(absolute(&managed));
        }

        let path_var = self
            .search_path
            .clone()
            .or_else(|| env::var_os("PATH"))
            .unwrap_or_default();
        for name in ["bazel", "bazelisk"] {
            if let Some(found) = find_on_path(name, &path_var) {
                tracing::debug!("Using {} from PATH", found.display());
                return Ok(absolute(&found));
            }
        }

        Err(PlaygroundError::ToolNotFound(format!(
            "no {} in {} and neither bazel nor bazelisk is on PATH.\n\n\
             Pin a version with `echo <version> > .bazelversion` or install bazelisk.",
            VERSION_FILE,
            self.working_dir.display()
        )))
    }

    fn download_url(&self, version: &str) -> String {
        match &self.cache_host {
            Some(host) => format!("{}/{}", host.trim_end_matches('/'), binary_name(version)),
            None => format!("{}/{}/{}", RELEASES_URL, version, binary_name(version)),
        }
    }

    #[cfg(feature = "download")]
    fn fetch(&self, version: &str, dest: &Path) -> Result<(), PlaygroundError> {
        let url = self.download_url(version);
        println!("Downloading bazel {} from {}...", version, url);

        let resp = reqwest::blocking::get(&url)
            .map_err(|e| PlaygroundError::ToolNotFound(format!("downloading {}: {}", url, e)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PlaygroundError::ToolNotFound(format!(
                "bazel download failed (status {}): {}",
                status, url
            )));
        }
        let bytes = resp
            .bytes()
            .map_err(|e| PlaygroundError::ToolNotFound(format!("reading {}: {}", url, e)))?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let partial = dest.with_file_name(format!("{}.partial", binary_name(version)));
        std::fs::write(&partial, &bytes)?;
        make_executable(&partial)?;
        std::fs::rename(&partial, dest)?;
        println!("✓ bazel {} saved to {}", version, dest.display());
        Ok(())
    }

    #[cfg(not(feature = "download"))]
    fn fetch(&self, version: &str, dest: &Path) -> Result<(), PlaygroundError> {
        Err(PlaygroundError::ToolNotFound(format!(
            "bazel {} is pinned but {} does not exist. Download it from {}",
            version,
            dest.display(),
            self.download_url(version)
        )))
    }
}

/// Convenience wrapper around [`BazelLocator::locate`].
pub fn locate_bazel(working_dir: &Path, cache_host: Option<&str>) -> Result<PathBuf, PlaygroundError> {
    BazelLocator::new(working_dir, cache_host.map(str::to_string)).locate()
}

fn host_arch() -> &'static str {
    match env::consts::ARCH {
        "aarch64" => "arm64",
        _ => "x86_64",
    }
}

fn binary_name(version: &str) -> String {
    format!("bazel-{}-darwin-{}", version, host_arch())
}

/// `path` made absolute against the current directory.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn find_on_path(name: &str, path_var: &std::ffi::OsStr) -> Option<PathBuf> {
    env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(unix, feature = "download"))]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(all(not(unix), feature = "download"))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_pinned_version_trims() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(VERSION_FILE), "7.3.1\n").unwrap();
        let locator = BazelLocator::new(temp.path(), None);
        assert_eq!(locator.pinned_version().unwrap(), Some("7.3.1".to_string()));
    }

    #[test]
    fn test_locate_managed_binary() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(VERSION_FILE), "7.3.1").unwrap();
        let locator = BazelLocator::new(temp.path(), None);
        let managed = locator.managed_binary("7.3.1");
        fs::create_dir_all(managed.parent().unwrap()).unwrap();
        fs::write(&managed, "#!/bin/sh\n").unwrap();

        let found = locator.locate().unwrap();
        assert!(found.is_absolute());
        assert!(found.ends_with(format!("build-input/bazel-7.3.1-darwin-{}", host_arch())));
    }

    #[test]
    fn test_download_url_prefers_cache_host() {
        let locator = BazelLocator::new("/repo", Some("https://cache.example/".into()));
        assert_eq!(
            locator.download_url("7.3.1"),
            format!("https://cache.example/bazel-7.3.1-darwin-{}", host_arch())
        );

        let locator = BazelLocator::new("/repo", None);
        assert!(
            locator
                .download_url("7.3.1")
                .starts_with("https://github.com/bazelbuild/bazel/releases/download/7.3.1/")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_falls_back_to_path() {
        use std::os::unix::fs::PermissionsExt;

        let repo = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let bazelisk = bin.path().join("bazelisk");
        fs::write(&bazelisk, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&bazelisk, fs::Permissions::from_mode(0o755)).unwrap();

        let found = BazelLocator::new(repo.path(), None)
            .search_path(bin.path().as_os_str())
            .locate()
            .unwrap();
        assert_eq!(found, bazelisk);
    }

    #[test]
    fn test_locate_nothing_found() {
        let repo = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        let err = BazelLocator::new(repo.path(), None)
            .search_path(empty.path().as_os_str())
            .locate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolNotFound);
        assert!(err.to_string().contains(".bazelversion"));
    }
}
