//! Test harness board
//!
//! The harness serial cannot be told apart from the DUT's by looking at the
//! USB bus, so it is recorded once by [`TestHarness::save_serial`] while the
//! harness is the only board attached, and read back from disk afterwards.

use super::{Board, BoardRole, HarnessSerial, Role};
use crate::config::HarnessConfig;
use crate::error::{BoardError, Result};
use crate::host::HostProbe;
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct TestHarness {
    board: Board,
    serial_path: PathBuf,
}

impl TestHarness {
    pub fn new(name: &str, module: &str, config: &HarnessConfig) -> Result<Self> {
        Ok(Self {
            board: Board::new(name, module, Role::TestHarness, config)?,
            serial_path: config.th_serial_path.clone(),
        })
    }

    /// File the harness serial is cached in
    pub fn serial_path(&self) -> &Path {
        &self.serial_path
    }

    /// Read-only handle on the harness serial for the paired DUT
    pub fn serial_handle(&self) -> HarnessSerial {
        HarnessSerial(self.board.serial.clone())
    }

    /// One-time identification: record the only attached adapter as the harness
    ///
    /// Exactly one debug adapter may be visible while this runs.
    pub fn save_serial(&self, host: &dyn HostProbe) -> Result<&str> {
        let serials = host.stlink_serials()?;
        let serial = match serials.as_slice() {
            [serial] => serial.clone(),
            [] => {
                return Err(BoardError::ambiguous(
                    "No test boards were found. Connect the test harness and try again",
                    0,
                ))
            }
            _ => {
                return Err(BoardError::ambiguous(
                    "There is more than one test board connected to the host. \
                     Connect only the test harness and remove other boards",
                    serials.len(),
                ))
            }
        };

        if let Some(dir) = self.serial_path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.serial_path, &serial)?;
        info!(
            "TH serial {} saved to {}",
            serial,
            self.serial_path.display()
        );

        let stored = self.board.set_serial(serial.clone());
        if stored != serial {
            warn!(
                "TH serial was already {} in this run, the saved value applies next run",
                stored
            );
        }
        Ok(stored)
    }
}

impl BoardRole for TestHarness {
    fn board(&self) -> &Board {
        &self.board
    }

    fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    fn resolve_serial(&self, _host: &dyn HostProbe) -> Result<&str> {
        if let Some(serial) = self.board.serial() {
            return Ok(serial);
        }

        let content = fs::read_to_string(&self.serial_path).map_err(|source| {
            BoardError::HarnessNotIdentified {
                path: self.serial_path.clone(),
                source,
            }
        })?;

        let content = content.trim_end();
        if content.is_empty() {
            return Err(BoardError::HarnessNotIdentified {
                path: self.serial_path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, "serial cache file is empty"),
            });
        }

        let serial = self.board.set_serial(content.to_string());
        info!("TH serial {} loaded from {}", serial, self.serial_path.display());
        Ok(serial)
    }
}
