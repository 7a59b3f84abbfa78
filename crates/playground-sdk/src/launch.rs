//! Build, install and launch the app on a simulator.
//!
//! Stages run in order and each returns a `Result`:
//!
//! | Stage | On failure |
//! |-------|------------|
//! | Build (`xcodebuild build`) | abort |
//! | Settings (`-showBuildSettings`) | abort |
//! | Bundle discovery | abort |
//! | Simulator readiness | abort |
//! | Install | recorded, launch skipped |
//! | Verify installed apps | recorded, continue |
//! | Focus Simulator.app | warning |
//! | Launch | recorded |
//!
//! Aborting stages surface as `Err` from [`SimulatorLauncher::run`]; the rest
//! are collected in [`LaunchReport::failures`] so the caller can pick the exit
//! status once the run is over.

use std::path::PathBuf;

use crate::bundle;
use crate::tools::common::ToolRunner;
use crate::tools::simctl::{self, Device};
use crate::tools::xcodebuild;
use crate::types::{ErrorKind, PlaygroundError, SimulatorRunConfig};

/// Outcome of a run that got as far as a booted simulator.
#[derive(Debug)]
pub struct LaunchReport {
    pub bundle_id: String,
    pub app_path: PathBuf,
    pub device: Device,
    pub installed: bool,
    /// `Some(true)` when the bundle id showed up in the installed-apps listing,
    /// `None` when the listing itself failed or install was skipped.
    pub verified: Option<bool>,
    /// simctl's `<bundle id>: <pid>` line, when launch succeeded.
    pub launched: Option<String>,
    pub failures: Vec<PlaygroundError>,
}

impl LaunchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Kind of the first recorded failure.
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        self.failures.first().map(PlaygroundError::kind)
    }
}

/// Drives the whole build-and-run pipeline for one configuration.
pub struct SimulatorLauncher {
    config: SimulatorRunConfig,
}

impl SimulatorLauncher {
    pub fn new(config: SimulatorRunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorRunConfig {
        &self.config
    }

    /// Runs every stage.
    ///
    /// # Returns
    ///
    /// * `Ok(LaunchReport)` once a simulator is booted, even if install or
    ///   launch then failed; check [`LaunchReport::is_success`]
    /// * `Err(PlaygroundError)` if a stage before that failed
    pub fn run(&self, runner: &dyn ToolRunner) -> Result<LaunchReport, PlaygroundError> {
        let config = &self.config;

        println!("Building {} for {}...", config.scheme, config.destination());
        xcodebuild::build(runner, config)?;
        println!("Build successful!");

        let settings = xcodebuild::show_build_settings(runner, config)?;
        let app_path = bundle::require_app(&settings.target_build_dir)?;
        println!("Found app at: {}", app_path.display());
        println!("Bundle identifier: {}", settings.bundle_id);

        let device = simctl::ensure_booted(runner, &config.device_name, &config.boot_wait)?;

        let mut report = LaunchReport {
            bundle_id: settings.bundle_id,
            app_path,
            device,
            installed: false,
            verified: None,
            launched: None,
            failures: Vec::new(),
        };

        match simctl::install(runner, &report.device.udid, &report.app_path) {
            Ok(()) => {
                println!("App installed on simulator successfully!");
                report.installed = true;
            }
            Err(e) => {
                report.failures.push(e);
                return Ok(report);
            }
        }

        match simctl::installed_apps(runner, &report.device.udid) {
            Ok(apps) if apps.contains(&report.bundle_id) => {
                println!("App {} is installed on the simulator", report.bundle_id);
                report.verified = Some(true);
            }
            Ok(apps) => {
                println!("App {} is not installed on the simulator", report.bundle_id);
                println!(
                    "Installed apps: {}",
                    apps.iter().cloned().collect::<Vec<_>>().join(", ")
                );
                report.verified = Some(false);
            }
            Err(e) => {
                println!("Warning: {}", e);
                report.failures.push(e);
            }
        }

        if let Err(e) = simctl::focus_simulator(runner) {
            println!("Warning: could not bring Simulator to the foreground");
            tracing::debug!("{}", e);
        }

        match simctl::launch(runner, &report.device.udid, &report.bundle_id) {
            Ok(line) => {
                println!("Application launched in simulator!");
                report.launched = Some(line);
            }
            Err(e) => report.failures.push(e),
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::common::ToolOutput;
    use crate::tools::common::fake::ScriptedRunner;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        config: SimulatorRunConfig,
        build_dir: PathBuf,
    }

    fn fixture(with_app: bool) -> Fixture {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("Playground/Playground.xcodeproj");
        fs::create_dir_all(&project).unwrap();
        let build_dir = temp.path().join("Build/Products/Debug-iphonesimulator");
        fs::create_dir_all(&build_dir).unwrap();
        if with_app {
            fs::create_dir_all(build_dir.join("Playground.app")).unwrap();
        }
        let mut config = SimulatorRunConfig::new(project);
        config.boot_wait.poll_interval = Duration::from_millis(1);
        config.boot_wait.timeout = Duration::from_millis(5);
        Fixture {
            _temp: temp,
            config,
            build_dir,
        }
    }

    fn settings_report(build_dir: &std::path::Path) -> String {
        format!(
            "    PRODUCT_BUNDLE_IDENTIFIER = com.example.app\n    TARGET_BUILD_DIR = {}\n",
            build_dir.display()
        )
    }

    fn happy_runner(fixture: &Fixture) -> ScriptedRunner {
        ScriptedRunner::new()
            .respond("xcodebuild", ToolOutput::ok(""))
            .respond("xcodebuild", ToolOutput::ok(settings_report(&fixture.build_dir)))
            .respond(
                "xcrun simctl list devices --json",
                ToolOutput::ok(
                    r#"{"devices": {"iOS17": [{"name":"iPhone 15","udid":"ABC","state":"Booted"}]}}"#,
                ),
            )
            .respond("plutil", ToolOutput::ok(r#"{"com.example.app": {}}"#))
            .respond("xcrun simctl launch", ToolOutput::ok("com.example.app: 4242\n"))
    }

    #[test]
    fn test_run_happy_path() {
        let fixture = fixture(true);
        let runner = happy_runner(&fixture);
        let report = SimulatorLauncher::new(fixture.config.clone()).run(&runner).unwrap();

        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.bundle_id, "com.example.app");
        assert!(report.app_path.ends_with("Playground.app"));
        assert_eq!(report.device.udid, "ABC");
        assert!(report.installed);
        assert_eq!(report.verified, Some(true));
        assert_eq!(report.launched.as_deref(), Some("com.example.app: 4242"));

        let lines = runner.command_lines();
        assert!(lines.iter().any(|l| l.starts_with("xcrun simctl install ABC ")));
        assert!(lines.contains(&"xcrun simctl launch ABC com.example.app".to_string()));
        assert!(!lines.iter().any(|l| l.contains("booted")));
    }

    #[test]
    fn test_build_failure_stops_everything() {
        let fixture = fixture(true);
        let runner = ScriptedRunner::new().respond("xcodebuild", ToolOutput::failed(65, ""));
        let err = SimulatorLauncher::new(fixture.config.clone()).run(&runner).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BuildFailed);
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[test]
    fn test_missing_bundle_stops_before_simulator() {
        let fixture = fixture(false);
        let runner = ScriptedRunner::new()
            .respond("xcodebuild", ToolOutput::ok(""))
            .respond("xcodebuild", ToolOutput::ok(settings_report(&fixture.build_dir)));
        let err = SimulatorLauncher::new(fixture.config.clone()).run(&runner).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BundleNotFound);
        assert_eq!(runner.count_prefix("xcrun"), 0);
    }

    #[test]
    fn test_install_failure_skips_launch() {
        let fixture = fixture(true);
        let runner = happy_runner(&fixture)
            .replace("xcrun simctl install", ToolOutput::failed(1, "invalid bundle"));
        let report = SimulatorLauncher::new(fixture.config.clone()).run(&runner).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failure_kind(), Some(ErrorKind::InstallFailed));
        assert!(!report.installed);
        assert_eq!(runner.count_prefix("xcrun simctl launch"), 0);
    }

    #[test]
    fn test_list_apps_failure_does_not_gate_launch() {
        let fixture = fixture(true);
        let runner = happy_runner(&fixture).replace("plutil", ToolOutput::ok("not json"));
        let report = SimulatorLauncher::new(fixture.config.clone()).run(&runner).unwrap();

        assert_eq!(report.failure_kind(), Some(ErrorKind::ListAppsFailed));
        assert_eq!(report.verified, None);
        assert!(report.launched.is_some());
    }

    #[test]
    fn test_unverified_app_still_launches() {
        let fixture = fixture(true);
        let runner = happy_runner(&fixture)
            .replace("plutil", ToolOutput::ok(r#"{"com.apple.mobilesafari": {}}"#));
        let report = SimulatorLauncher::new(fixture.config.clone()).run(&runner).unwrap();

        assert!(report.is_success());
        assert_eq!(report.verified, Some(false));
        assert!(report.launched.is_some());
    }

    #[test]
    fn test_launch_failure_is_recorded() {
        let fixture = fixture(true);
        let runner = happy_runner(&fixture)
            .replace("xcrun simctl launch", ToolOutput::failed(4, "app crashed"));
        let report = SimulatorLauncher::new(fixture.config.clone()).run(&runner).unwrap();

        assert_eq!(report.failure_kind(), Some(ErrorKind::LaunchFailed));
        assert!(report.launched.is_none());
    }

    #[test]
    fn test_focus_failure_is_only_a_warning() {
        let fixture = fixture(true);
        let runner = happy_runner(&fixture).replace("open -a Simulator", ToolOutput::failed(1, ""));
        let report = SimulatorLauncher::new(fixture.config.clone()).run(&runner).unwrap();

        assert!(report.is_success());
    }
}
