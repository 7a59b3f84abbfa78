//! Playground developer tooling
//!
//! `playground-sdk` drives the local development loop of the Playground app:
//! regenerating its Bazel-generated Xcode project, and building, installing
//! and launching it on an iOS simulator.
//!
//! # Architecture
//!
//! - **Regenerate**: Locates Bazel, rewrites the generator inputs and runs the
//!   project generator target
//! - **Launch**: Builds with xcodebuild, finds the `.app`, boots a simulator and
//!   launches the bundle on it
//! - **Tools**: Thin wrappers around `bazel`, `xcodebuild` and `xcrun simctl`,
//!   all going through the [`ToolRunner`] trait
//! - **Bundle**: Deterministic `.app` discovery in a build directory
//!
//! # Example
//!
//! ```ignore
//! use playground_sdk::{SimulatorLauncher, SimulatorRunConfig, SystemRunner};
//!
//! fn main() -> Result<(), playground_sdk::PlaygroundError> {
//!     let config = SimulatorRunConfig::new("Swiftgram/Playground/Playground.xcodeproj");
//!     let report = SimulatorLauncher::new(config).run(&SystemRunner)?;
//!
//!     if let Some(line) = &report.launched {
//!         println!("Running: {}", line);
//!     }
//!     Ok(())
//! }
//! ```

pub mod bundle;
pub mod launch;
pub mod regenerate;
pub mod tools;
pub mod types;

pub use bundle::{find_app, require_app};
pub use launch::{LaunchReport, SimulatorLauncher};
pub use regenerate::ProjectRegenerator;
pub use tools::{BazelLocator, SystemRunner, ToolCommand, ToolOutput, ToolRunner, locate_bazel};
pub use types::{
    BootWait, DEFAULT_DEVICE, DEFAULT_GENERATOR_TARGET, DEFAULT_OS, DEFAULT_PLAYGROUND_DIR,
    DEFAULT_SCHEME, DEFAULT_SDK, ErrorKind, PROJECT_DIR_NAME, PlaygroundError, RegenerateConfig,
    SimulatorRunConfig,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
