//! `xcrun simctl` wrappers and the simulator readiness state machine.
//!
//! Readiness moves through these states:
//!
//! ```text
//! UNKNOWN --list--> FOUND --state == Booted--> BOOTED
//!                     |
//!                     +--otherwise--> NOT_BOOTED --boot--> BOOTING --poll--> BOOTED
//! ```
//!
//! A missing device fails with `SimulatorNotFound` before any boot command is
//! issued; a device that never reports `Booted` fails with
//! `SimulatorBootTimeout` once [`BootWait::max_polls`] checks have run.

use std::collections::BTreeSet;
use std::path::Path;
use std::thread;
use std::time::Instant;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::common::{ToolCommand, ToolRunner, run_command};
use crate::types::{BootWait, PlaygroundError};

/// A simulator device as reported by `simctl list devices --json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Device {
    pub name: String,
    pub udid: String,
    pub state: DeviceState,
    #[serde(rename = "isAvailable", default)]
    pub is_available: Option<bool>,
}

/// Boot state of a simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    Booted,
    Shutdown,
    Other(String),
}

impl<'de> Deserialize<'de> for DeviceState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(DeviceState::from(raw.as_str()))
    }
}

impl From<&str> for DeviceState {
    fn from(raw: &str) -> Self {
        match raw {
            "Booted" => DeviceState::Booted,
            "Shutdown" => DeviceState::Shutdown,
            other => DeviceState::Other(other.to_string()),
        }
    }
}

/// Devices grouped by runtime identifier, in the order simctl printed them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceList {
    pub devices: Map<String, Value>,
}

impl DeviceList {
    /// Parses the JSON printed by `simctl list devices --json`.
    pub fn parse(json: &str) -> Result<Self, PlaygroundError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Every device, runtime by runtime. Entries that don't look like devices
    /// are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Device)> + '_ {
        self.devices.iter().flat_map(|(runtime, devices)| {
            devices
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|device| Device::deserialize(device).ok())
                .map(move |device| (runtime.as_str(), device))
        })
    }

    /// The first device named `name`.
    pub fn find(&self, name: &str) -> Option<Device> {
        self.iter()
            .map(|(_, device)| device)
            .find(|device| device.name == name)
    }
}

/// Whether the text form of `simctl list devices` shows the device as booted.
pub fn reports_booted(listing: &str, name: &str, udid: &str) -> bool {
    listing.contains(&format!("{} ({}) (Booted)", name, udid))
}

fn simctl() -> ToolCommand {
    ToolCommand::new("xcrun").arg("simctl")
}

/// Lists all simulator devices.
pub fn list_devices(runner: &dyn ToolRunner) -> Result<DeviceList, PlaygroundError> {
    let cmd = simctl().args(["list", "devices", "--json"]);
    let output = run_command(runner, &cmd, "simctl list devices")
        .map_err(PlaygroundError::SimulatorBootFailed)?;
    DeviceList::parse(&output.stdout)
}

/// Boots a device by identifier.
pub fn boot(runner: &dyn ToolRunner, udid: &str) -> Result<(), PlaygroundError> {
    let cmd = simctl().args(["boot", udid]);
    run_command(runner, &cmd, "simctl boot").map_err(PlaygroundError::SimulatorBootFailed)?;
    Ok(())
}

/// Makes sure the simulator named `name` is booted and returns it.
///
/// Issues no boot command when the device is already booted, and exactly one
/// otherwise.
pub fn ensure_booted(
    runner: &dyn ToolRunner,
    name: &str,
    wait: &BootWait,
) -> Result<Device, PlaygroundError> {
    let devices = list_devices(runner)?;
    let device = devices
        .find(name)
        .ok_or_else(|| PlaygroundError::SimulatorNotFound(name.to_string()))?;

    if device.state == DeviceState::Booted {
        println!("Simulator {} is already booted.", name);
        return Ok(device);
    }

    println!("Booting simulator {}...", name);
    boot(runner, &device.udid)?;

    println!("Waiting for simulator to finish booting...");
    let max_polls = wait.max_polls();
    let started = Instant::now();
    let status_cmd = simctl().args(["list", "devices"]);
    for attempt in 1..=max_polls {
        let listing = run_command(runner, &status_cmd, "simctl list devices")
            .map_err(PlaygroundError::SimulatorBootFailed)?;
        if reports_booted(&listing.stdout, name, &device.udid) {
            println!("Simulator {} is now booted.", name);
            return Ok(Device {
                state: DeviceState::Booted,
                ..device
            });
        }
        tracing::debug!("{} not booted yet (check {}/{})", device.udid, attempt, max_polls);
        if attempt < max_polls {
            thread::sleep(wait.interval());
        }
    }

    Err(PlaygroundError::SimulatorBootTimeout {
        name: name.to_string(),
        udid: device.udid,
        waited: started.elapsed(),
    })
}

/// Installs an app bundle onto a device.
pub fn install(runner: &dyn ToolRunner, udid: &str, app_path: &Path) -> Result<(), PlaygroundError> {
    let cmd = simctl().args(["install", udid]).arg(app_path);
    run_command(runner, &cmd, "simctl install").map_err(PlaygroundError::InstallFailed)?;
    Ok(())
}

/// Bundle identifiers of the apps installed on a device.
///
/// `simctl listapps` prints an old-style plist, so it is converted to JSON
/// through `plutil` before parsing.
pub fn installed_apps(runner: &dyn ToolRunner, udid: &str) -> Result<BTreeSet<String>, PlaygroundError> {
    let listing = run_command(runner, &simctl().args(["listapps", udid]), "simctl listapps")
        .map_err(PlaygroundError::ListAppsFailed)?;

    let convert = ToolCommand::new("plutil")
        .args(["-convert", "json", "-r", "-o", "-", "--", "-"])
        .stdin(listing.stdout);
    let json = run_command(runner, &convert, "plutil -convert json")
        .map_err(PlaygroundError::ListAppsFailed)?;

    let apps: Map<String, Value> = serde_json::from_str(&json.stdout)
        .map_err(|e| PlaygroundError::ListAppsFailed(format!("failed to parse app list: {}", e)))?;
    Ok(apps.into_iter().map(|(bundle_id, _)| bundle_id).collect())
}

/// Brings Simulator.app to the foreground.
pub fn focus_simulator(runner: &dyn ToolRunner) -> Result<(), String> {
    let cmd = ToolCommand::new("open").args(["-a", "Simulator"]);
    run_command(runner, &cmd, "open -a Simulator").map(|_| ())
}

/// Launches an installed app and returns simctl's `<bundle id>: <pid>` line.
pub fn launch(runner: &dyn ToolRunner, udid: &str, bundle_id: &str) -> Result<String, PlaygroundError> {
    let cmd = simctl().args(["launch", udid, bundle_id]);
    let output = run_command(runner, &cmd, "simctl launch").map_err(PlaygroundError::LaunchFailed)?;
    Ok(output.stdout.trim().to_string())
}
