//! Scripted host for tests

use super::HostProbe;
use crate::error::{BoardError, Result};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct FakeHost {
    serials: Vec<String>,
    ttys: Vec<(PathBuf, String)>,
    enumerations: Cell<usize>,
    queries: RefCell<Vec<PathBuf>>,
}

impl FakeHost {
    pub fn with_serials(serials: &[&str]) -> Self {
        Self {
            serials: serials.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Register a tty whose udev properties report `serial`
    pub fn add_tty(&mut self, path: &str, serial: &str) {
        let properties = format!(
            "DEVNAME={}\nID_VENDOR_ID=0483\nID_SERIAL_SHORT={}\n",
            path, serial
        );
        self.ttys.push((PathBuf::from(path), properties));
    }

    /// Number of `stlink_serials` calls so far
    pub fn enumerations(&self) -> usize {
        self.enumerations.get()
    }

    /// Paths passed to `tty_properties`, in call order
    pub fn property_queries(&self) -> Vec<PathBuf> {
        self.queries.borrow().clone()
    }
}

impl HostProbe for FakeHost {
    fn stlink_serials(&self) -> Result<Vec<String>> {
        self.enumerations.set(self.enumerations.get() + 1);
        Ok(self.serials.clone())
    }

    fn tty_candidates(&self) -> Result<Vec<PathBuf>> {
        Ok(self.ttys.iter().map(|(path, _)| path.clone()).collect())
    }

    fn tty_properties(&self, path: &Path) -> Result<String> {
        self.queries.borrow_mut().push(path.to_path_buf());
        self.ttys
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, props)| props.clone())
            .ok_or_else(|| BoardError::ToolFailed {
                tool: "udevadm".to_string(),
                log: format!("Unknown device node '{}'", path.display()),
            })
    }
}
