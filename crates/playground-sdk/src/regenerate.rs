//! Xcode project regeneration through Bazel.
//!
//! [`ProjectRegenerator::run`] performs, in order:
//!
//! 1. Resolve the Bazel executable (explicit path or [`BazelLocator`](crate::tools::BazelLocator))
//! 2. Quit running Xcode instances (best effort)
//! 3. Overwrite `xcodeproj.bazelrc` at the repository root
//! 4. Delete the previously generated `.xcodeproj`
//! 5. Write `custom_bazel_path.bzl` with the resolved Bazel path
//! 6. `bazel run` the project generator target
//! 7. Open the new project

use std::fs;
use std::path::{Path, PathBuf};

use crate::tools::bazel::{absolute, locate_bazel};
use crate::tools::common::{ToolCommand, ToolRunner, run_command};
use crate::types::{PlaygroundError, RegenerateConfig};

/// Name of the bazelrc read by the project generator.
pub const BAZELRC_NAME: &str = "xcodeproj.bazelrc";
/// Name of the Starlark file exposing the Bazel path to the build.
pub const BAZEL_PATH_FILE: &str = "custom_bazel_path.bzl";

/// Fixed content of `xcodeproj.bazelrc`.
pub const BAZELRC_CONTENT: &str = "
build --announce_rc
build --features=swift.use_global_module_cache
build --verbose_failures
build --features=swift.enable_batch_mode
build --features=-swift.debug_prefix_map
# build --disk_cache=

build --swiftcopt=-no-warnings-as-errors
build --copt=-Wno-error
";

/// Regenerates and opens the Bazel-generated Xcode project.
pub struct ProjectRegenerator {
    config: RegenerateConfig,
    bazel_path: Option<PathBuf>,
    cache_host: Option<String>,
    open_project: bool,
}

impl ProjectRegenerator {
    /// Creates a regenerator that locates Bazel itself.
    pub fn new(config: RegenerateConfig) -> Self {
        Self {
            config,
            bazel_path: None,
            cache_host: None,
            open_project: true,
        }
    }

    /// Uses `path` instead of running the locator.
    pub fn bazel_path(mut self, path: Option<PathBuf>) -> Self {
        self.bazel_path = path;
        self
    }

    /// Cache host handed to the locator.
    pub fn cache_host(mut self, host: Option<String>) -> Self {
        self.cache_host = host;
        self
    }

    /// Whether to open the project once generated.
    pub fn open_project(mut self, open: bool) -> Self {
        self.open_project = open;
        self
    }

    /// Resolves the Bazel executable to an absolute path.
    ///
    /// A relative explicit path is taken relative to the current directory,
    /// not the repository root Bazel later runs in.
    pub fn resolve_bazel(&self) -> Result<PathBuf, PlaygroundError> {
        let Some(path) = &self.bazel_path else {
            return locate_bazel(&self.config.repo_root, self.cache_host.as_deref());
        };
        let path = absolute(path);
        if !path.is_file() {
            return Err(PlaygroundError::ToolNotFound(format!(
                "configured bazel path {} does not exist",
                path.display()
            )));
        }
        Ok(path)
    }

    /// Runs every step and returns the path of the regenerated project.
    pub fn run(&self, runner: &dyn ToolRunner) -> Result<PathBuf, PlaygroundError> {
        let bazel = self.resolve_bazel()?;
        println!("Using bazel at {}", bazel.display());

        quit_xcode(runner);

        write_bazelrc(&self.config.repo_root)?;

        let project_path = self.config.project_path();
        remove_stale_project(&project_path)?;

        write_bazel_path_file(&self.config.playground_path(), &bazel)?;

        println!("Generating Xcode project ({})...", self.config.generator_target);
        let generate = ToolCommand::new(&bazel)
            .args(["run", self.config.generator_target.as_str()])
            .current_dir(&self.config.repo_root)
            .inherit_output();
        run_command(runner, &generate, "bazel run")
            .map_err(PlaygroundError::ProjectGenerationFailed)?;
        println!("✓ Generated {}", project_path.display());

        if self.open_project {
            open_path(runner, &project_path)?;
        }

        Ok(project_path)
    }
}

/// Asks running Xcode instances to quit. Failures are ignored.
pub fn quit_xcode(runner: &dyn ToolRunner) {
    let cmd = ToolCommand::new("killall").arg("Xcode");
    match runner.run(&cmd) {
        Ok(output) if output.success => tracing::debug!("Stopped running Xcode"),
        Ok(_) => tracing::debug!("No running Xcode to stop"),
        Err(e) => tracing::debug!("killall unavailable: {}", e),
    }
}

/// Overwrites `<repo_root>/xcodeproj.bazelrc` with [`BAZELRC_CONTENT`].
pub fn write_bazelrc(repo_root: &Path) -> Result<PathBuf, PlaygroundError> {
    let path = repo_root.join(BAZELRC_NAME);
    if path.exists() {
        fs::remove_file(&path)?;
    }
    fs::write(&path, BAZELRC_CONTENT)?;
    tracing::debug!("Wrote {}", path.display());
    Ok(path)
}

/// Deletes a previously generated project directory, if present.
pub fn remove_stale_project(project_path: &Path) -> Result<bool, PlaygroundError> {
    if !project_path.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(project_path)?;
    tracing::debug!("Removed {}", project_path.display());
    Ok(true)
}

/// Starlark source exposing `bazel` to the build.
pub fn bazel_path_source(bazel: &Path) -> String {
    format!(
        "def custom_bazel_path():\n    return \"{}\"\n",
        bazel.display()
    )
}

/// Writes [`BAZEL_PATH_FILE`] into the playground directory.
pub fn write_bazel_path_file(playground_dir: &Path, bazel: &Path) -> Result<PathBuf, PlaygroundError> {
    let path = playground_dir.join(BAZEL_PATH_FILE);
    fs::write(&path, bazel_path_source(bazel))?;
    tracing::debug!("Wrote {}", path.display());
    Ok(path)
}

/// Opens `path` with the platform's default handler.
pub fn open_path(runner: &dyn ToolRunner, path: &Path) -> Result<(), PlaygroundError> {
    let opener = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
    let cmd = ToolCommand::new(opener).arg(path);
    run_command(runner, &cmd, opener).map_err(PlaygroundError::OpenFailed)?;
    Ok(())
}
