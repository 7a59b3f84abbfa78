//! Configuration file support for the playground tools.
//!
//! Both binaries read an optional `playground.toml` so repository-specific
//! settings don't have to be passed as flags on every run.
//!
//! ## Configuration File Location
//!
//! The configuration file is searched for in the following order:
//! 1. Current working directory (`./playground.toml`)
//! 2. Parent directories (up to the repository root or filesystem root)
//!
//! Relative paths inside the file are resolved against the directory that
//! contains it.
//!
//! ## Example Configuration
//!
//! ```toml
//! [project]
//! playground_dir = "Swiftgram/Playground"
//!
//! [generate]
//! cache_host = "https://cache.example.com/bazel"
//!
//! [simulator]
//! device = "iPhone 15 Pro"
//! os = "17.5"
//! boot_timeout_secs = 180
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "playground.toml";

/// Root configuration structure for `playground.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Repository layout.
    pub project: ProjectConfig,

    /// `generate-project` settings.
    pub generate: GenerateConfig,

    /// `launch-on-simulator` settings.
    pub simulator: SimulatorConfig,
}

/// Repository layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Repository root. Discovered from the current directory when unset.
    pub repo_root: Option<PathBuf>,

    /// Playground directory relative to the repository root.
    ///
    /// Defaults to `Swiftgram/Playground`.
    pub playground_dir: Option<PathBuf>,
}

/// Project regeneration settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Bazel executable to use instead of locating one.
    pub bazel_path: Option<PathBuf>,

    /// Base URL serving pinned Bazel binaries.
    pub cache_host: Option<String>,

    /// Bazel target that writes the Xcode project.
    pub target: Option<String>,
}

/// Simulator run settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Path to the `.xcodeproj`. Defaults to the generated project.
    pub project: Option<PathBuf>,
    pub scheme: Option<String>,
    /// Simulator device name, e.g. "iPhone 15".
    pub device: Option<String>,
    /// Destination OS version, e.g. "latest" or "17.5".
    pub os: Option<String>,
    pub sdk: Option<String>,
    /// Upper bound on waiting for the simulator to boot.
    pub boot_timeout_secs: Option<u64>,
    /// Delay between two boot status checks.
    pub poll_interval_ms: Option<u64>,
}

impl PlaygroundConfig {
    /// Loads configuration from the specified file path.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Ok(PlaygroundConfig)` - Successfully loaded configuration
    /// * `Err` - If the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: PlaygroundConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Attempts to find and load configuration starting from the specified directory.
    ///
    /// Walks up the directory tree until a config file is found, a `.git`
    /// directory marks the repository root, or the filesystem root is reached.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }
}

/// Merges config file values with CLI arguments.
///
/// CLI arguments always take precedence over config file values.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Loaded configuration, if any.
    pub config: Option<PlaygroundConfig>,

    /// Path to the loaded config file, if any.
    pub config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Discovers and loads configuration starting at `start_dir`.
    pub fn discover_from(start_dir: &Path) -> Result<Self> {
        let resolver = match PlaygroundConfig::discover_from(start_dir)? {
            Some((config, path)) => {
                tracing::debug!("Loaded configuration from {}", path.display());
                Self {
                    config: Some(config),
                    config_path: Some(path),
                }
            }
            None => Self::default(),
        };
        Ok(resolver)
    }

    /// Resolves a CLI value, using config as fallback.
    ///
    /// # Returns
    ///
    /// The resolved value, preferring CLI over config over default.
    pub fn resolve<T, F>(&self, cli_value: Option<T>, config_getter: F, default: T) -> T
    where
        F: FnOnce(&PlaygroundConfig) -> Option<T>,
    {
        cli_value
            .or_else(|| self.config.as_ref().and_then(config_getter))
            .unwrap_or(default)
    }

    /// Like [`ConfigResolver::resolve`] without a default.
    pub fn resolve_opt<T, F>(&self, cli_value: Option<T>, config_getter: F) -> Option<T>
    where
        F: FnOnce(&PlaygroundConfig) -> Option<T>,
    {
        cli_value.or_else(|| self.config.as_ref().and_then(config_getter))
    }

    /// Resolves a path from the config file against the file's directory.
    pub fn config_path_value<F>(&self, getter: F) -> Option<PathBuf>
    where
        F: FnOnce(&PlaygroundConfig) -> Option<&PathBuf>,
    {
        let value = self.config.as_ref().and_then(getter)?;
        if value.is_absolute() {
            return Some(value.clone());
        }
        let base = self
            .config_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("."));
        Some(base.join(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_empty() {
        let config = PlaygroundConfig::default();
        assert!(config.project.repo_root.is_none());
        assert!(config.generate.bazel_path.is_none());
        assert!(config.simulator.device.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);

        let toml_content = r#"
[project]
playground_dir = "Apps/Playground"

[generate]
bazel_path = "/opt/bazel/bin/bazel"
cache_host = "https://cache.example.com"
target = "//Apps/Playground:Playground_xcodeproj"

[simulator]
scheme = "PlaygroundDebug"
device = "iPhone 15 Pro"
os = "17.5"
boot_timeout_secs = 180
poll_interval_ms = 250
"#;
        std::fs::write(&config_path, toml_content).unwrap();

        let config = PlaygroundConfig::load_from_file(&config_path).unwrap();

        assert_eq!(
            config.project.playground_dir,
            Some(PathBuf::from("Apps/Playground"))
        );
        assert_eq!(
            config.generate.bazel_path,
            Some(PathBuf::from("/opt/bazel/bin/bazel"))
        );
        assert_eq!(
            config.generate.cache_host.as_deref(),
            Some("https://cache.example.com")
        );
        assert_eq!(
            config.generate.target.as_deref(),
            Some("//Apps/Playground:Playground_xcodeproj")
        );
        assert_eq!(config.simulator.scheme.as_deref(), Some("PlaygroundDebug"));
        assert_eq!(config.simulator.device.as_deref(), Some("iPhone 15 Pro"));
        assert_eq!(config.simulator.os.as_deref(), Some("17.5"));
        assert_eq!(config.simulator.sdk, None);
        assert_eq!(config.simulator.boot_timeout_secs, Some(180));
        assert_eq!(config.simulator.poll_interval_ms, Some(250));
    }

    #[test]
    fn test_load_rejects_bad_types() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[simulator]\nboot_timeout_secs = \"soon\"\n").unwrap();

        let err = PlaygroundConfig::load_from_file(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_discover_from_parent() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[simulator]\ndevice = \"iPad Air\"\n").unwrap();
        let nested = temp_dir.path().join("Swiftgram/Playground");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, path) = PlaygroundConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.simulator.device.as_deref(), Some("iPad Air"));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_stops_at_git_root() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "").unwrap();
        let repo = temp_dir.path().join("repo");
        std::fs::create_dir_all(repo.join(".git")).unwrap();

        let result = PlaygroundConfig::discover_from(&repo).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_config_resolver_precedence() {
        let mut config = PlaygroundConfig::default();
        config.simulator.device = Some("iPhone 14".to_string());
        let resolver = ConfigResolver {
            config: Some(config),
            config_path: None,
        };

        let device = resolver.resolve(
            Some("iPhone 15 Pro".to_string()),
            |c| c.simulator.device.clone(),
            "iPhone 15".to_string(),
        );
        assert_eq!(device, "iPhone 15 Pro");

        let device = resolver.resolve(None, |c| c.simulator.device.clone(), "iPhone 15".to_string());
        assert_eq!(device, "iPhone 14");

        let scheme = resolver.resolve(None, |c| c.simulator.scheme.clone(), "Playground".to_string());
        assert_eq!(scheme, "Playground");
    }

    #[test]
    fn test_config_paths_are_relative_to_file() {
        let mut config = PlaygroundConfig::default();
        config.simulator.project = Some(PathBuf::from("Apps/Playground.xcodeproj"));
        config.generate.bazel_path = Some(PathBuf::from("/usr/local/bin/bazel"));
        let resolver = ConfigResolver {
            config: Some(config),
            config_path: Some(PathBuf::from("/repo/playground.toml")),
        };

        assert_eq!(
            resolver.config_path_value(|c| c.simulator.project.as_ref()),
            Some(PathBuf::from("/repo/Apps/Playground.xcodeproj"))
        );
        assert_eq!(
            resolver.config_path_value(|c| c.generate.bazel_path.as_ref()),
            Some(PathBuf::from("/usr/local/bin/bazel"))
        );
        assert_eq!(resolver.config_path_value(|c| c.project.repo_root.as_ref()), None);
    }
}
