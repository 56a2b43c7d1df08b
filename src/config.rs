//! Harness configuration
//!
//! Paths and timeouts used by the board controller. Values come from an
//! optional TOML file and are overridden by command-line flags.

use crate::tools;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default OpenOCD scripts directory
pub const OCD_SCRIPT_DIR: &str = "/usr/local/share/openocd/scripts";

/// Default upper bound for a single openocd or make run
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 600;

/// Default wait for console data before a read session ends
pub const DEFAULT_CONSOLE_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// OpenOCD scripts directory (passed with -s)
    pub ocd_script_dir: PathBuf,
    /// EC source tree used for builds
    pub ec_dir: PathBuf,
    /// Directory holding openocd/build/console logs
    pub log_dir: PathBuf,
    /// File caching the TH debug-adapter serial number
    pub th_serial_path: PathBuf,
    /// Kill openocd/make after this many seconds
    pub tool_timeout_secs: u64,
    /// Console read session ends after this long without data
    pub console_timeout_ms: u64,
    /// Test harness board model
    pub th_board: String,
    /// Device under test board model
    pub dut_board: String,
    /// Test module to build
    pub module: String,
    /// Program run for reset and flash
    pub openocd_program: String,
    /// Program run for builds
    pub make_program: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            ocd_script_dir: PathBuf::from(OCD_SCRIPT_DIR),
            ec_dir: PathBuf::from("."),
            log_dir: PathBuf::from("/tmp/cts"),
            th_serial_path: default_serial_path(),
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            console_timeout_ms: DEFAULT_CONSOLE_TIMEOUT_MS,
            th_board: "stm32l476g-eval".to_string(),
            dut_board: "nucleo-f072rb".to_string(),
            module: "meta".to_string(),
            openocd_program: tools::OPENOCD.to_string(),
            make_program: tools::MAKE.to_string(),
        }
    }
}

fn default_serial_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".cts")
        .join("th_serial")
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from TOML text; missing keys keep their defaults
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    pub fn with_ec_dir(mut self, ec_dir: impl Into<PathBuf>) -> Self {
        self.ec_dir = ec_dir.into();
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    pub fn with_serial_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.th_serial_path = path.into();
        self
    }

    pub fn with_boards(mut self, th: &str, dut: &str) -> Self {
        self.th_board = th.to_string();
        self.dut_board = dut.to_string();
        self
    }

    pub fn with_module(mut self, module: &str) -> Self {
        self.module = module.to_string();
        self
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn console_timeout(&self) -> Duration {
        Duration::from_millis(self.console_timeout_ms)
    }
}
