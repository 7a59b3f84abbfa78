//! `xcodebuild` wrappers: simulator builds and the build-settings report.

use std::path::{Path, PathBuf};

use super::common::{ToolCommand, ToolRunner, run_command};
use crate::types::{PlaygroundError, SimulatorRunConfig};

/// Settings key holding the app's bundle identifier.
pub const BUNDLE_ID_KEY: &str = "PRODUCT_BUNDLE_IDENTIFIER";
/// Settings key holding the directory the built products land in.
pub const BUILD_DIR_KEY: &str = "TARGET_BUILD_DIR";

/// The two values consumed from `xcodebuild -showBuildSettings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub bundle_id: String,
    pub target_build_dir: PathBuf,
}

impl BuildSettings {
    /// Parses a `KEY = VALUE` settings report.
    ///
    /// For each key the first line containing it is used, and the value is
    /// the trimmed text after that line's first `=`.
    ///
    /// # Example
    ///
    /// ```
    /// use playground_sdk::tools::xcodebuild::BuildSettings;
    ///
    /// let report = "    TARGET_BUILD_DIR = /tmp/build\n    PRODUCT_BUNDLE_IDENTIFIER = com.example.app\n";
    /// let settings = BuildSettings::parse(report).unwrap();
    /// assert_eq!(settings.bundle_id, "com.example.app");
    /// ```
    pub fn parse(report: &str) -> Result<Self, PlaygroundError> {
        let bundle_id = find_setting(report, BUNDLE_ID_KEY)?;
        let target_build_dir = find_setting(report, BUILD_DIR_KEY)?;
        Ok(Self {
            bundle_id,
            target_build_dir: PathBuf::from(target_build_dir),
        })
    }
}

/// Returns the value of the first line mentioning `key`.
pub fn find_setting(report: &str, key: &str) -> Result<String, PlaygroundError> {
    report
        .lines()
        .find(|line| line.contains(key))
        .and_then(|line| line.split_once('='))
        .map(|(_, value)| value.trim().to_string())
        .ok_or_else(|| {
            PlaygroundError::SettingsParseFailed(format!(
                "{} not found in build settings report",
                key
            ))
        })
}

fn project_dir(config: &SimulatorRunConfig) -> &Path {
    config
        .project_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// The `xcodebuild ... build` command for a simulator destination.
pub fn build_command(config: &SimulatorRunConfig) -> ToolCommand {
    ToolCommand::new("xcodebuild")
        .arg("-project")
        .arg(&config.project_path)
        .args(["-scheme", config.scheme.as_str()])
        .args(["-destination", config.destination().as_str()])
        .args(["-sdk", config.sdk.as_str()])
        .arg("build")
        .current_dir(project_dir(config))
        .inherit_output()
}

/// The `xcodebuild ... -showBuildSettings` command.
pub fn settings_command(config: &SimulatorRunConfig) -> ToolCommand {
    ToolCommand::new("xcodebuild")
        .arg("-project")
        .arg(&config.project_path)
        .args(["-scheme", config.scheme.as_str()])
        .args(["-sdk", config.sdk.as_str()])
        .arg("-showBuildSettings")
        .current_dir(project_dir(config))
}

/// Builds the project for the simulator, streaming xcodebuild's output.
pub fn build(runner: &dyn ToolRunner, config: &SimulatorRunConfig) -> Result<(), PlaygroundError> {
    if !config.project_path.exists() {
        return Err(PlaygroundError::BuildFailed(format!(
            "Xcode project not found at {}. Run generate-project first.",
            config.project_path.display()
        )));
    }
    run_command(runner, &build_command(config), "xcodebuild build")
        .map_err(PlaygroundError::BuildFailed)?;
    Ok(())
}

/// Runs the settings report and extracts [`BuildSettings`] from it.
pub fn show_build_settings(
    runner: &dyn ToolRunner,
    config: &SimulatorRunConfig,
) -> Result<BuildSettings, PlaygroundError> {
    let output = run_command(runner, &settings_command(config), "xcodebuild -showBuildSettings")
        .map_err(PlaygroundError::SettingsParseFailed)?;
    BuildSettings::parse(&output.stdout)
}
