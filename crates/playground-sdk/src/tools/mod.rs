//! Wrappers around the external tools both utilities drive.
//!
//! ## Tools
//!
//! | Module | Tool | Used for |
//! |--------|------|----------|
//! | [`bazel`] | `bazel` | Locating the pinned executable |
//! | [`xcodebuild`] | `xcodebuild` | Simulator builds and the settings report |
//! | [`simctl`] | `xcrun simctl`, `plutil` | Device listing, boot, install, launch |
//!
//! ## Common Utilities
//!
//! The [`common`] module provides the [`ToolRunner`] seam every wrapper goes
//! through, plus [`run_command`], which turns a failed invocation into a
//! message naming the command, its exit status and its output.

pub mod bazel;
pub mod common;
pub mod simctl;
pub mod xcodebuild;

pub use bazel::{BazelLocator, locate_bazel};
pub use common::{SystemRunner, ToolCommand, ToolOutput, ToolRunner, run_command};
pub use simctl::{Device, DeviceList, DeviceState};
pub use xcodebuild::BuildSettings;
