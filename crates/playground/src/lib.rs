//! Command-line front ends for the Playground app tooling.
//!
//! Two binaries share this library:
//!
//! - `generate-project` regenerates the Bazel-generated Xcode project and opens it
//! - `launch-on-simulator` builds the app, installs it on a simulator and launches it
//!
//! Settings come from CLI flags, then `playground.toml`, then built-in defaults.
//! Failures are printed as `error[<kind>]: <message>` and the process exits with
//! the kind's exit code.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use playground_sdk::{
    BootWait, DEFAULT_DEVICE, DEFAULT_GENERATOR_TARGET, DEFAULT_OS, DEFAULT_PLAYGROUND_DIR,
    DEFAULT_SCHEME, DEFAULT_SDK, ErrorKind, LaunchReport, PlaygroundError, ProjectRegenerator,
    RegenerateConfig, SimulatorLauncher, SimulatorRunConfig, SystemRunner,
};

pub mod config;
mod logging;

use config::ConfigResolver;

/// Regenerate the Playground Xcode project with Bazel and open it.
#[derive(Parser, Debug)]
#[command(name = "generate-project", author, version, long_about = None)]
pub struct GenerateProjectCli {
    /// Repository root (default: nearest ancestor containing the playground directory)
    #[arg(long)]
    pub repo_root: Option<PathBuf>,

    /// Bazel executable to use instead of locating one
    #[arg(long, env = "PLAYGROUND_BAZEL")]
    pub bazel: Option<PathBuf>,

    /// Base URL serving pinned Bazel binaries
    #[arg(long, env = "PLAYGROUND_CACHE_HOST")]
    pub cache_host: Option<String>,

    /// Don't open the project once it is generated
    #[arg(long)]
    pub no_open: bool,

    /// Print verbose output including all commands
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// Build the Playground app and run it on an iOS simulator.
#[derive(Parser, Debug)]
#[command(name = "launch-on-simulator", author, version, long_about = None)]
pub struct LaunchOnSimulatorCli {
    /// Repository root, used to find the default project
    #[arg(long)]
    pub repo_root: Option<PathBuf>,

    /// Path to the .xcodeproj (default: the generated Playground project)
    #[arg(long)]
    pub project: Option<PathBuf>,

    #[arg(long, help = "Xcode scheme to build (default: Playground)")]
    pub scheme: Option<String>,

    #[arg(long, help = "Simulator device name (default: iPhone 15)")]
    pub device: Option<String>,

    #[arg(long, help = "Simulator OS version (default: latest)")]
    pub os: Option<String>,

    #[arg(long, help = "SDK passed to xcodebuild (default: iphonesimulator)")]
    pub sdk: Option<String>,

    #[arg(long, help = "Seconds to wait for the simulator to boot (default: 120)")]
    pub boot_timeout_secs: Option<u64>,

    #[arg(long, help = "Milliseconds between boot status checks (default: 500)")]
    pub poll_interval_ms: Option<u64>,

    /// Print verbose output including all commands
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// Settings for one `generate-project` run.
#[derive(Debug, Clone)]
pub struct GenerateSettings {
    pub config: RegenerateConfig,
    pub bazel_path: Option<PathBuf>,
    pub cache_host: Option<String>,
    pub open_project: bool,
}

/// Entry point of the `generate-project` binary.
pub fn run_generate_project() -> ExitCode {
    load_dotenv();
    let cli = GenerateProjectCli::parse();
    logging::init(cli.verbose);

    match generate_project(&cli) {
        Ok(project) => {
            println!("\n✓ Project ready: {}", project.display());
            ExitCode::SUCCESS
        }
        Err(err) => report_error(&err),
    }
}

/// Entry point of the `launch-on-simulator` binary.
pub fn run_launch_on_simulator() -> ExitCode {
    load_dotenv();
    let cli = LaunchOnSimulatorCli::parse();
    logging::init(cli.verbose);

    match launch_on_simulator(&cli) {
        Ok(report) => finish_launch(&report),
        Err(err) => report_error(&err),
    }
}

fn generate_project(cli: &GenerateProjectCli) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("resolving current directory")?;
    let resolver = ConfigResolver::discover_from(&cwd)?;
    let settings = resolve_generate_settings(cli, &resolver, &cwd);
    tracing::debug!("Resolved settings: {:?}", settings);

    let regenerator = ProjectRegenerator::new(settings.config)
        .bazel_path(settings.bazel_path)
        .cache_host(settings.cache_host)
        .open_project(settings.open_project);
    Ok(regenerator.run(&SystemRunner)?)
}

fn launch_on_simulator(cli: &LaunchOnSimulatorCli) -> Result<LaunchReport> {
    let cwd = std::env::current_dir().context("resolving current directory")?;
    let resolver = ConfigResolver::discover_from(&cwd)?;
    let config = resolve_simulator_config(cli, &resolver, &cwd)?;
    tracing::debug!("Resolved settings: {:?}", config);

    Ok(SimulatorLauncher::new(config).run(&SystemRunner)?)
}

/// Merges `generate-project` flags with the config file and defaults.
pub fn resolve_generate_settings(
    cli: &GenerateProjectCli,
    resolver: &ConfigResolver,
    cwd: &Path,
) -> GenerateSettings {
    let (repo_root, playground_dir) = resolve_layout(cli.repo_root.clone(), resolver, cwd);
    let generator_target = resolver.resolve(
        None,
        |c| c.generate.target.clone(),
        DEFAULT_GENERATOR_TARGET.to_string(),
    );

    GenerateSettings {
        config: RegenerateConfig {
            repo_root,
            playground_dir,
            generator_target,
        },
        bazel_path: cli
            .bazel
            .as_ref()
            .map(|path| cwd.join(path))
            .or_else(|| resolver.config_path_value(|c| c.generate.bazel_path.as_ref())),
        cache_host: resolver.resolve_opt(cli.cache_host.clone(), |c| c.generate.cache_host.clone()),
        open_project: !cli.no_open,
    }
}

/// Merges `launch-on-simulator` flags with the config file and defaults.
pub fn resolve_simulator_config(
    cli: &LaunchOnSimulatorCli,
    resolver: &ConfigResolver,
    cwd: &Path,
) -> Result<SimulatorRunConfig> {
    let project_path = match cli
        .project
        .clone()
        .or_else(|| resolver.config_path_value(|c| c.simulator.project.as_ref()))
    {
        Some(path) => path,
        None => {
            let (repo_root, playground_dir) = resolve_layout(cli.repo_root.clone(), resolver, cwd);
            RegenerateConfig {
                playground_dir,
                ..RegenerateConfig::new(repo_root)
            }
            .project_path()
        }
    };

    let defaults = BootWait::default();
    let poll_interval_ms = resolver.resolve(
        cli.poll_interval_ms,
        |c| c.simulator.poll_interval_ms,
        defaults.poll_interval.as_millis() as u64,
    );
    if poll_interval_ms == 0 {
        return Err(PlaygroundError::Config("poll interval must be at least 1ms".into()).into());
    }
    let boot_timeout_secs = resolver.resolve(
        cli.boot_timeout_secs,
        |c| c.simulator.boot_timeout_secs,
        defaults.timeout.as_secs(),
    );

    Ok(SimulatorRunConfig {
        project_path,
        scheme: resolver.resolve(cli.scheme.clone(), |c| c.simulator.scheme.clone(), DEFAULT_SCHEME.to_string()),
        device_name: resolver.resolve(cli.device.clone(), |c| c.simulator.device.clone(), DEFAULT_DEVICE.to_string()),
        os_version: resolver.resolve(cli.os.clone(), |c| c.simulator.os.clone(), DEFAULT_OS.to_string()),
        sdk: resolver.resolve(cli.sdk.clone(), |c| c.simulator.sdk.clone(), DEFAULT_SDK.to_string()),
        boot_wait: BootWait {
            poll_interval: Duration::from_millis(poll_interval_ms),
            timeout: Duration::from_secs(boot_timeout_secs),
        },
    })
}

/// Repository root and playground directory, CLI over config over discovery.
fn resolve_layout(cli_root: Option<PathBuf>, resolver: &ConfigResolver, cwd: &Path) -> (PathBuf, PathBuf) {
    let playground_dir = resolver.resolve(
        None,
        |c| c.project.playground_dir.clone(),
        PathBuf::from(DEFAULT_PLAYGROUND_DIR),
    );
    let repo_root = cli_root
        .or_else(|| resolver.config_path_value(|c| c.project.repo_root.as_ref()))
        .or_else(|| find_repo_root(cwd, &playground_dir))
        .unwrap_or_else(|| cwd.to_path_buf());
    (repo_root, playground_dir)
}

/// Nearest ancestor of `start` (inclusive) that contains `playground_dir`.
pub fn find_repo_root(start: &Path, playground_dir: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| candidate.join(playground_dir).is_dir())
        .map(Path::to_path_buf)
}

fn load_dotenv() {
    let Ok(cwd) = std::env::current_dir() else {
        return;
    };
    let root = find_repo_root(&cwd, Path::new(DEFAULT_PLAYGROUND_DIR)).unwrap_or(cwd);
    let _ = dotenvy::from_path(root.join(".env.local"));
}

/// Kind of a top-level error; errors raised outside the SDK count as configuration errors.
pub fn error_kind(err: &anyhow::Error) -> ErrorKind {
    err.downcast_ref::<PlaygroundError>()
        .map(PlaygroundError::kind)
        .unwrap_or(ErrorKind::Config)
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    let kind = error_kind(err);
    eprintln!("error[{}]: {:#}", kind, err);
    ExitCode::from(kind.exit_code())
}

fn finish_launch(report: &LaunchReport) -> ExitCode {
    println!("\nSummary:");
    println!("  Device:    {} ({})", report.device.name, report.device.udid);
    println!("  App:       {}", report.app_path.display());
    println!("  Bundle id: {}", report.bundle_id);
    println!("  Installed: {}", if report.installed { "yes" } else { "no" });
    match report.verified {
        Some(true) => println!("  Verified:  yes"),
        Some(false) => println!("  Verified:  not listed"),
        None => println!("  Verified:  unknown"),
    }
    match &report.launched {
        Some(line) => println!("  Launched:  {}", line),
        None => println!("  Launched:  no"),
    }

    for failure in &report.failures {
        eprintln!("error[{}]: {}", failure.kind(), failure);
    }
    match report.failure_kind() {
        Some(kind) => ExitCode::from(kind.exit_code()),
        None => ExitCode::SUCCESS,
    }
}
