//! Core types for playground-sdk.
//!
//! This module defines the types shared by both tools:
//!
//! - [`PlaygroundError`] / [`ErrorKind`] - Stage failures and their stable kinds
//! - [`SimulatorRunConfig`] - What to build and which simulator to run it on
//! - [`RegenerateConfig`] - Where the Bazel-generated Xcode project lives
//! - [`BootWait`] - Polling bounds for a booting simulator

use std::path::PathBuf;
use std::time::Duration;

/// Error types for playground-sdk operations.
///
/// Every variant names the stage that failed. Use [`PlaygroundError::kind`]
/// to get a stable, machine-readable [`ErrorKind`].
///
/// # Example
///
/// ```ignore
/// use playground_sdk::{PlaygroundError, ErrorKind};
///
/// match launcher.run() {
///     Ok(report) => println!("Launched {}", report.bundle_id),
///     Err(PlaygroundError::SimulatorNotFound(name)) => {
///         eprintln!("Create a '{}' simulator in Xcode first", name);
///     }
///     Err(e) => eprintln!("error[{}]: {}", e.kind(), e),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum PlaygroundError {
    /// No usable Bazel executable could be located.
    #[error("build tool not found: {0}")]
    ToolNotFound(String),

    /// `bazel run` of the project generator target failed.
    #[error("project generation failed: {0}")]
    ProjectGenerationFailed(String),

    /// The regenerated project could not be opened.
    #[error("failed to open project: {0}")]
    OpenFailed(String),

    /// `xcodebuild build` exited with a non-zero status.
    #[error("build failed: {0}")]
    BuildFailed(String),

    /// The settings report could not be produced, or a required key was absent.
    #[error("failed to get build settings: {0}")]
    SettingsParseFailed(String),

    /// The build directory contains no `.app` bundle.
    #[error("could not find .app bundle in {}", .0.display())]
    BundleNotFound(PathBuf),

    /// No simulator with the requested name exists.
    #[error("simulator '{0}' not found. Available devices can be listed with `xcrun simctl list devices`")]
    SimulatorNotFound(String),

    /// `simctl boot` itself failed.
    #[error("failed to boot simulator: {0}")]
    SimulatorBootFailed(String),

    /// The simulator never reported `Booted` before the deadline.
    #[error("simulator '{name}' ({udid}) did not finish booting within {waited:?}")]
    SimulatorBootTimeout {
        /// Requested device name.
        name: String,
        /// Device identifier that was booted.
        udid: String,
        /// Total time spent polling.
        waited: Duration,
    },

    /// `simctl install` failed.
    #[error("failed to install app on simulator: {0}")]
    InstallFailed(String),

    /// Listing installed apps, or parsing that listing, failed.
    #[error("failed to list apps: {0}")]
    ListAppsFailed(String),

    /// `simctl launch` failed.
    #[error("failed to launch application in simulator: {0}")]
    LaunchFailed(String),

    /// An I/O error occurred.
    ///
    /// Common causes are permission problems writing `xcodeproj.bazelrc` or
    /// removing a stale `.xcodeproj` directory.
    #[error("I/O error: {0}. Check file paths and permissions")]
    Io(#[from] std::io::Error),

    /// JSON from `simctl` could not be parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}. Check playground.toml or CLI flags")]
    Config(String),
}

/// Stable identifier for each failure category.
///
/// Printed as `error[<kind>]` and mapped to a distinct process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ToolNotFound,
    ProjectGenerationFailed,
    OpenFailed,
    BuildFailed,
    SettingsParseFailed,
    BundleNotFound,
    SimulatorNotFound,
    SimulatorBootFailed,
    SimulatorBootTimeout,
    InstallFailed,
    ListAppsFailed,
    LaunchFailed,
    Io,
    Serialization,
    Config,
}

impl ErrorKind {
    /// Returns the kebab-case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ToolNotFound => "tool-not-found",
            ErrorKind::ProjectGenerationFailed => "project-generation-failed",
            ErrorKind::OpenFailed => "open-failed",
            ErrorKind::BuildFailed => "build-failed",
            ErrorKind::SettingsParseFailed => "settings-parse-failed",
            ErrorKind::BundleNotFound => "bundle-not-found",
            ErrorKind::SimulatorNotFound => "simulator-not-found",
            ErrorKind::SimulatorBootFailed => "simulator-boot-failed",
            ErrorKind::SimulatorBootTimeout => "simulator-boot-timeout",
            ErrorKind::InstallFailed => "install-failed",
            ErrorKind::ListAppsFailed => "list-apps-failed",
            ErrorKind::LaunchFailed => "launch-failed",
            ErrorKind::Io => "io",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Config => "config",
        }
    }

    /// Process exit code for this kind. Never 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorKind::ToolNotFound => 10,
            ErrorKind::ProjectGenerationFailed => 11,
            ErrorKind::OpenFailed => 12,
            ErrorKind::BuildFailed => 20,
            ErrorKind::SettingsParseFailed => 21,
            ErrorKind::BundleNotFound => 22,
            ErrorKind::SimulatorNotFound => 30,
            ErrorKind::SimulatorBootFailed => 31,
            ErrorKind::SimulatorBootTimeout => 32,
            ErrorKind::InstallFailed => 40,
            ErrorKind::ListAppsFailed => 41,
            ErrorKind::LaunchFailed => 42,
            ErrorKind::Io => 74,
            ErrorKind::Serialization => 65,
            ErrorKind::Config => 78,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PlaygroundError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaygroundError::ToolNotFound(_) => ErrorKind::ToolNotFound,
            PlaygroundError::ProjectGenerationFailed(_) => ErrorKind::ProjectGenerationFailed,
            PlaygroundError::OpenFailed(_) => ErrorKind::OpenFailed,
            PlaygroundError::BuildFailed(_) => ErrorKind::BuildFailed,
            PlaygroundError::SettingsParseFailed(_) => ErrorKind::SettingsParseFailed,
            PlaygroundError::BundleNotFound(_) => ErrorKind::BundleNotFound,
            PlaygroundError::SimulatorNotFound(_) => ErrorKind::SimulatorNotFound,
            PlaygroundError::SimulatorBootFailed(_) => ErrorKind::SimulatorBootFailed,
            PlaygroundError::SimulatorBootTimeout { .. } => ErrorKind::SimulatorBootTimeout,
            PlaygroundError::InstallFailed(_) => ErrorKind::InstallFailed,
            PlaygroundError::ListAppsFailed(_) => ErrorKind::ListAppsFailed,
            PlaygroundError::LaunchFailed(_) => ErrorKind::LaunchFailed,
            PlaygroundError::Io(_) => ErrorKind::Io,
            PlaygroundError::Serialization(_) => ErrorKind::Serialization,
            PlaygroundError::Config(_) => ErrorKind::Config,
        }
    }
}

/// Default Xcode scheme.
pub const DEFAULT_SCHEME: &str = "Playground";
/// Default simulator device name.
pub const DEFAULT_DEVICE: &str = "iPhone 15";
/// Default simulator OS version in the destination specifier.
pub const DEFAULT_OS: &str = "latest";
/// SDK used for every simulator build.
pub const DEFAULT_SDK: &str = "iphonesimulator";
/// Playground directory relative to the repository root.
pub const DEFAULT_PLAYGROUND_DIR: &str = "Swiftgram/Playground";
/// Bazel target that writes the Xcode project.
pub const DEFAULT_GENERATOR_TARGET: &str = "//Swiftgram/Playground:Playground_xcodeproj";
/// Name of the generated Xcode project directory.
pub const PROJECT_DIR_NAME: &str = "Playground.xcodeproj";

/// Polling bounds used while a simulator boots.
///
/// # Example
///
/// ```
/// use playground_sdk::BootWait;
/// use std::time::Duration;
///
/// let wait = BootWait::default();
/// assert_eq!(wait.poll_interval, Duration::from_millis(500));
/// assert_eq!(wait.max_polls(), 240);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootWait {
    /// Delay between two status checks.
    pub poll_interval: Duration,
    /// Upper bound on the total time spent polling.
    pub timeout: Duration,
}

impl Default for BootWait {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(120),
        }
    }
}

impl BootWait {
    /// Shortest delay allowed between two status checks.
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

    /// Delay actually used between checks; a zero interval is raised to
    /// [`BootWait::MIN_POLL_INTERVAL`].
    pub fn interval(&self) -> Duration {
        self.poll_interval.max(Self::MIN_POLL_INTERVAL)
    }

    /// Number of status checks that fit in the timeout, at least one.
    pub fn max_polls(&self) -> u32 {
        let polls = self.timeout.as_millis() / self.interval().as_millis().max(1);
        u32::try_from(polls).unwrap_or(u32::MAX).max(1)
    }
}

/// Configuration for building and running the app on a simulator.
///
/// # Example
///
/// ```
/// use playground_sdk::SimulatorRunConfig;
///
/// let config = SimulatorRunConfig::new("/repo/Swiftgram/Playground/Playground.xcodeproj");
/// assert_eq!(config.scheme, "Playground");
/// assert_eq!(
///     config.destination(),
///     "platform=iOS Simulator,name=iPhone 15,OS=latest"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SimulatorRunConfig {
    /// Path to the `.xcodeproj` directory.
    pub project_path: PathBuf,
    /// Xcode scheme to build.
    pub scheme: String,
    /// Simulator device name, e.g. "iPhone 15".
    pub device_name: String,
    /// Simulator OS version for the destination, e.g. "latest" or "17.5".
    pub os_version: String,
    /// SDK passed to `xcodebuild -sdk`.
    pub sdk: String,
    /// Boot polling bounds.
    pub boot_wait: BootWait,
}

impl SimulatorRunConfig {
    /// Creates a configuration with the default scheme, device and SDK.
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            scheme: DEFAULT_SCHEME.to_string(),
            device_name: DEFAULT_DEVICE.to_string(),
            os_version: DEFAULT_OS.to_string(),
            sdk: DEFAULT_SDK.to_string(),
            boot_wait: BootWait::default(),
        }
    }

    /// The `xcodebuild -destination` specifier.
    pub fn destination(&self) -> String {
        format!(
            "platform=iOS Simulator,name={},OS={}",
            self.device_name, self.os_version
        )
    }
}

/// Configuration for regenerating the Bazel-generated Xcode project.
#[derive(Debug, Clone)]
pub struct RegenerateConfig {
    /// Repository root; Bazel runs here and `xcodeproj.bazelrc` is written here.
    pub repo_root: PathBuf,
    /// Playground directory relative to the repository root.
    pub playground_dir: PathBuf,
    /// Bazel target whose `run` writes the Xcode project.
    pub generator_target: String,
}

impl RegenerateConfig {
    /// Creates a configuration with the default playground layout.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            playground_dir: PathBuf::from(DEFAULT_PLAYGROUND_DIR),
            generator_target: DEFAULT_GENERATOR_TARGET.to_string(),
        }
    }

    /// Absolute playground directory.
    pub fn playground_path(&self) -> PathBuf {
        self.repo_root.join(&self.playground_dir)
    }

    /// Path of the generated `.xcodeproj` directory.
    pub fn project_path(&self) -> PathBuf {
        self.playground_path().join(PROJECT_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        let err = PlaygroundError::SimulatorNotFound("iPhone 15".into());
        assert_eq!(err.kind(), ErrorKind::SimulatorNotFound);
        assert_eq!(err.kind().as_str(), "simulator-not-found");

        let err = PlaygroundError::BundleNotFound(PathBuf::from("/tmp/build"));
        assert_eq!(err.kind(), ErrorKind::BundleNotFound);
        assert!(err.to_string().contains("/tmp/build"));
    }

    #[test]
    fn test_exit_codes_are_distinct_and_nonzero() {
        let kinds = [
            ErrorKind::ToolNotFound,
            ErrorKind::ProjectGenerationFailed,
            ErrorKind::OpenFailed,
            ErrorKind::BuildFailed,
            ErrorKind::SettingsParseFailed,
            ErrorKind::BundleNotFound,
            ErrorKind::SimulatorNotFound,
            ErrorKind::SimulatorBootFailed,
            ErrorKind::SimulatorBootTimeout,
            ErrorKind::InstallFailed,
            ErrorKind::ListAppsFailed,
            ErrorKind::LaunchFailed,
            ErrorKind::Io,
            ErrorKind::Serialization,
            ErrorKind::Config,
        ];
        let codes: std::collections::HashSet<u8> = kinds.iter().map(|k| k.exit_code()).collect();
        assert_eq!(codes.len(), kinds.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_boot_wait_max_polls() {
        let wait = BootWait {
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(2),
        };
        assert_eq!(wait.max_polls(), 4);

        let wait = BootWait {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(wait.max_polls(), 1);

    }

    #[test]
    fn test_boot_wait_zero_interval_is_clamped() {
        let wait = BootWait {
            poll_interval: Duration::ZERO,
            timeout: Duration::from_millis(20),
        };
        assert_eq!(wait.interval(), BootWait::MIN_POLL_INTERVAL);
        assert_eq!(wait.max_polls(), 20);
    }

    #[test]
    fn test_destination_uses_device_and_os() {
        let mut config = SimulatorRunConfig::new("/tmp/P.xcodeproj");
        config.device_name = "iPhone 15 Pro".into();
        config.os_version = "17.5".into();
        assert_eq!(
            config.destination(),
            "platform=iOS Simulator,name=iPhone 15 Pro,OS=17.5"
        );
    }

    #[test]
    fn test_regenerate_paths() {
        let config = RegenerateConfig::new("/repo");
        assert_eq!(
            config.project_path(),
            PathBuf::from("/repo/Swiftgram/Playground/Playground.xcodeproj")
        );
        assert_eq!(config.generator_target, DEFAULT_GENERATOR_TARGET);
    }
}
