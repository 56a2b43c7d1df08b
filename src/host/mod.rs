//! Host queries used for board identification
//!
//! This module wraps the host tools the resolver depends on:
//! - `lsusb` for listing ST-Link debug adapters and their serial numbers
//! - `/dev` listing for candidate console devices
//! - `udevadm` for the properties of a console device
//!
//! Everything goes through [`HostProbe`] so identity resolution and console
//! lookup can run against a scripted host in tests.

#[cfg(test)]
pub mod fake;
pub mod lsusb;
pub mod udev;

use crate::error::{BoardError, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// ST-Link V2.1 USB vendor ID
pub const STLINK_VID: u16 = 0x0483;
/// ST-Link V2.1 USB product ID
pub const STLINK_PID: u16 = 0x374b;

/// Directory scanned for console devices
pub const DEV_DIR: &str = "/dev";
/// Name prefix of CDC-ACM console devices
pub const TTY_PREFIX: &str = "ttyACM";

/// Queries against the host that board identification needs
pub trait HostProbe {
    /// Serial numbers of every attached debug adapter (may be empty)
    fn stlink_serials(&self) -> Result<Vec<String>>;

    /// Console device paths that may belong to a board, in lookup order
    fn tty_candidates(&self) -> Result<Vec<PathBuf>>;

    /// Raw `KEY=value` property text for a console device
    fn tty_properties(&self, path: &Path) -> Result<String>;
}

/// [`HostProbe`] backed by the real host tools
#[derive(Debug, Clone)]
pub struct SystemHost {
    dev_dir: PathBuf,
    vid: u16,
    pid: u16,
}

impl Default for SystemHost {
    fn default() -> Self {
        Self {
            dev_dir: PathBuf::from(DEV_DIR),
            vid: STLINK_VID,
            pid: STLINK_PID,
        }
    }
}

impl SystemHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a different device directory
    #[cfg(test)]
    pub fn with_dev_dir(mut self, dev_dir: impl Into<PathBuf>) -> Self {
        self.dev_dir = dev_dir.into();
        self
    }
}

impl HostProbe for SystemHost {
    fn stlink_serials(&self) -> Result<Vec<String>> {
        let device = format!("{:#06x}:{:#06x}", self.vid, self.pid);
        debug!("lsusb -v -d {}", device);

        // lsusb exits non-zero when nothing matches, only the text matters
        let output = Command::new("lsusb")
            .args(["-v", "-d", &device])
            .output()
            .map_err(|source| BoardError::ToolSpawn {
                tool: "lsusb".to_string(),
                source,
            })?;

        let serials = lsusb::parse_serials(&String::from_utf8_lossy(&output.stdout));
        debug!("Found {} debug adapter(s): {:?}", serials.len(), serials);
        Ok(serials)
    }

    fn tty_candidates(&self) -> Result<Vec<PathBuf>> {
        let mut names: Vec<String> = fs::read_dir(&self.dev_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(TTY_PREFIX))
            .collect();
        sort_by_device_index(&mut names);

        Ok(names.into_iter().map(|n| self.dev_dir.join(n)).collect())
    }

    fn tty_properties(&self, path: &Path) -> Result<String> {
        debug!("udevadm info -a -n {} --query=property", path.display());

        let output = Command::new("udevadm")
            .arg("info")
            .arg("-a")
            .arg("-n")
            .arg(path)
            .arg("--query=property")
            .output()
            .map_err(|source| BoardError::ToolSpawn {
                tool: "udevadm".to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(BoardError::ToolFailed {
                tool: "udevadm".to_string(),
                log: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Order device names by their trailing number (ttyACM2 before ttyACM10)
pub fn sort_by_device_index(names: &mut [String]) {
    names.sort_by_key(|name| {
        let index = name
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .parse::<u32>()
            .unwrap_or(u32::MAX);
        (index, name.clone())
    });
}
