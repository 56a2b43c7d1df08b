//! Boards attached to the host
//!
//! A [`Board`] carries what both roles share: the model tables, log files,
//! the adapter serial, the console and the openocd/make wrappers. The role
//! types ([`TestHarness`], [`DeviceUnderTest`]) differ only in how the serial
//! number is found, which is what [`BoardRole::resolve_serial`] captures.

pub mod dut;
pub mod harness;

pub use dut::DeviceUnderTest;
pub use harness::TestHarness;

use crate::config::HarnessConfig;
use crate::devices::{get_model, BoardModel};
use crate::error::{BoardError, Result};
use crate::host::HostProbe;
use crate::serial::{locate_tty, Console, ConsoleCapture};
use crate::tools::{self, make, openocd};
use chrono::Local;
use log::info;
use once_cell::unsync::OnceCell;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// Which side of the pair a board is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    TestHarness,
    DeviceUnderTest,
}

impl Role {
    /// Suffix used in log file names
    pub fn tag(&self) -> &'static str {
        match self {
            Role::TestHarness => "th",
            Role::DeviceUnderTest => "dut",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::TestHarness => write!(f, "Test Harness"),
            Role::DeviceUnderTest => write!(f, "Device Under Test"),
        }
    }
}

/// Read-only view of the test harness serial number
///
/// Handed to the DUT so it can exclude the harness adapter during
/// resolution. It observes the harness value once set and cannot change it.
#[derive(Debug, Clone)]
pub struct HarnessSerial(Rc<OnceCell<String>>);

impl HarnessSerial {
    pub fn get(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }
}

/// State and operations shared by both board roles
#[derive(Debug)]
pub struct Board {
    model: BoardModel,
    role: Role,
    module: String,
    serial: Rc<OnceCell<String>>,
    tty_port: OnceCell<PathBuf>,
    console: Option<Console>,
    log_dir: PathBuf,
    openocd_log: PathBuf,
    build_log: PathBuf,
    ocd_script_dir: PathBuf,
    openocd_program: String,
    make_program: String,
    tool_timeout: Duration,
    console_timeout: Duration,
}

impl Board {
    /// Create a board of model `name`, starting fresh openocd/build logs
    pub fn new(name: &str, module: &str, role: Role, config: &HarnessConfig) -> Result<Self> {
        let model = get_model(name)?;

        let log_dir = config.log_dir.clone();
        fs::create_dir_all(&log_dir)?;
        let openocd_log = log_dir.join(format!("openocd_{}.log", role.tag()));
        let build_log = log_dir.join(format!("build_{}.log", role.tag()));
        File::create(&openocd_log)?;
        File::create(&build_log)?;

        Ok(Self {
            model,
            role,
            module: module.to_string(),
            serial: Rc::new(OnceCell::new()),
            tty_port: OnceCell::new(),
            console: None,
            log_dir,
            openocd_log,
            build_log,
            ocd_script_dir: config.ocd_script_dir.clone(),
            openocd_program: config.openocd_program.clone(),
            make_program: config.make_program.clone(),
            tool_timeout: config.tool_timeout(),
            console_timeout: config.console_timeout(),
        })
    }

    pub fn name(&self) -> &str {
        &self.model.name
    }

    pub fn model(&self) -> &BoardModel {
        &self.model
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Adapter serial number, `None` until resolved
    pub fn serial(&self) -> Option<&str> {
        self.serial.get().map(String::as_str)
    }

    /// Console device path, `None` until located
    pub fn tty_port(&self) -> Option<&Path> {
        self.tty_port.get().map(PathBuf::as_path)
    }

    pub fn is_console_open(&self) -> bool {
        self.console.is_some()
    }

    pub fn openocd_log(&self) -> &Path {
        &self.openocd_log
    }

    pub fn build_log(&self) -> &Path {
        &self.build_log
    }

    /// Record the resolved serial; a board keeps the first value it is given
    fn set_serial(&self, serial: String) -> &str {
        self.serial.get_or_init(|| serial)
    }

    fn require_serial(&self) -> Result<&str> {
        self.serial()
            .ok_or_else(|| BoardError::SerialNotResolved(self.name().to_string()))
    }

    /// Run openocd against this board's adapter with `commands`
    pub fn send_openocd_commands<S: AsRef<str>>(&self, commands: &[S]) -> Result<()> {
        let args = openocd::openocd_args(
            &self.ocd_script_dir,
            self.model.openocd_config,
            self.require_serial()?,
            commands,
        );
        tools::run_logged(&self.openocd_program, &args, &self.openocd_log, self.tool_timeout)?
            .check(&self.openocd_program, self.tool_timeout)
    }

    /// Reset then halt the board
    pub fn reset(&self) -> Result<()> {
        info!("Resetting {} ({})", self.name(), self.role);
        self.send_openocd_commands(openocd::RESET_HALT)
    }

    /// Write `image` to flash
    pub fn flash(&self, image: &Path) -> Result<()> {
        info!("Flashing {} with {}", self.name(), image.display());
        let commands = openocd::flash_commands(image, &self.model.flash_offset_hex());
        self.send_openocd_commands(&commands)
    }

    /// Build the test module for this board in `ec_dir`
    pub fn build(&self, ec_dir: &Path) -> Result<()> {
        info!("Building {} for {}", self.module, self.name());
        let args = make::make_args(ec_dir, self.name(), &self.module);
        tools::run_logged(&self.make_program, &args, &self.build_log, self.tool_timeout)?
            .check(&self.make_program, self.tool_timeout)
    }

    /// Image produced by [`Board::build`] in `ec_dir`
    pub fn image_path(&self, ec_dir: &Path) -> PathBuf {
        make::image_path(ec_dir, self.name(), &self.module)
    }

    /// Find and remember the console device for the resolved serial
    pub fn locate_tty(&self, host: &dyn HostProbe) -> Result<&Path> {
        if let Some(port) = self.tty_port.get() {
            return Ok(port.as_path());
        }
        let port = locate_tty(host, self.require_serial()?)?;
        Ok(self.tty_port.get_or_init(|| port).as_path())
    }

    /// Open the located console if it is not already open
    pub fn open_console(&mut self) -> Result<()> {
        if self.console.is_some() {
            return Ok(());
        }
        let port = self
            .tty_port
            .get()
            .ok_or_else(|| BoardError::TtyNotLocated(self.model.name.clone()))?;
        self.console = Some(Console::open(&self.model.name, port, self.console_timeout)?);
        Ok(())
    }

    /// Run one console read session, see [`crate::serial::console::read_session`]
    pub fn read_tty(&mut self, max_boot_count: usize) -> Result<ConsoleCapture> {
        let console = self
            .console
            .as_mut()
            .ok_or_else(|| BoardError::ConsoleNotOpen(self.model.name.clone()))?;
        console.read_session(max_boot_count)
    }

    /// Release the console device
    pub fn close_tty(&mut self) {
        if let Some(console) = self.console.take() {
            info!("Closing {}", console.path().display());
        }
    }

    /// Append a captured session to `console_<role>.log`
    pub fn save_console(&self, capture: &ConsoleCapture) -> Result<PathBuf> {
        let path = self.log_dir.join(format!("console_{}.log", self.role.tag()));
        let mut log = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(
            log,
            "=== [{}] {} boot(s)",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            capture.boot_count
        )?;
        log.write_all(capture.text.as_bytes())?;
        if !capture.text.ends_with('\n') {
            writeln!(log)?;
        }
        Ok(path)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Type: {}", self.role)?;
        writeln!(f, "board: {}", self.model.name)?;
        writeln!(f, "module: {}", self.module)?;
        writeln!(f, "hla_serial: {}", self.serial().unwrap_or("<unresolved>"))?;
        writeln!(f, "openocd_config: {}", self.model.openocd_config)?;
        writeln!(f, "flash_offset: {}", self.model.flash_offset_hex())?;
        writeln!(
            f,
            "tty_port: {}",
            self.tty_port()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unknown>".to_string())
        )?;
        write!(
            f,
            "tty: {}",
            if self.is_console_open() { "open" } else { "closed" }
        )
    }
}

/// Board behaviour that depends on the role
pub trait BoardRole {
    fn board(&self) -> &Board;

    fn board_mut(&mut self) -> &mut Board;

    /// Determine this board's adapter serial number
    ///
    /// Resolution happens once; later calls return the stored value without
    /// touching the host.
    fn resolve_serial(&self, host: &dyn HostProbe) -> Result<&str>;

    /// Prepare the console for reading
    ///
    /// Resolves the serial, resets and halts the board so the next boot is
    /// seen from the start, locates the console and opens it.
    fn setup_tty(&mut self, host: &dyn HostProbe) -> Result<()> {
        self.resolve_serial(host)?;
        self.board().reset()?;
        self.board().locate_tty(host)?;
        self.board_mut().open_console()
    }

    fn read_tty(&mut self, max_boot_count: usize) -> Result<ConsoleCapture> {
        self.board_mut().read_tty(max_boot_count)
    }
}
