//! CTS Board Tools
//!
//! Host-side control of a Test Harness (TH) / Device Under Test (DUT) board
//! pair for the EC compatibility test suite.
//!
//! # Features
//!
//! - **Board identification**: tells two identical ST-Link adapters apart by
//!   remembering the TH serial and excluding it when looking for the DUT
//! - **Console reading**: finds each board's ttyACM device and reads its output
//!   in bounded sessions while counting reboots
//! - **Flashing and reset** through OpenOCD
//! - **Firmware builds** through make
//!
//! # Usage
//!
//! ```bash
//! # One-time setup, with only the TH connected
//! cts-board setup
//!
//! # Show which adapter and tty belongs to which board
//! cts-board identify --th stm32l476g-eval --dut nucleo-f072rb
//!
//! # Build, flash and watch the DUT console for up to two reboots
//! cts-board build --module gpio --ec-dir ~/ec
//! cts-board flash --module gpio --ec-dir ~/ec
//! cts-board read --board dut --max-boot-count 2 --save
//! ```

mod board;
mod config;
mod devices;
mod error;
mod host;
mod serial;
mod tools;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

use board::{BoardRole, DeviceUnderTest, TestHarness};
use config::HarnessConfig;
use devices::{get_model, model_names};
use host::SystemHost;

/// CTS Board Tools
///
/// Identify, build, flash and monitor a TH/DUT board pair
#[derive(Parser)]
#[command(name = "cts-board")]
#[command(author = "Prasanna Gautam")]
#[command(version = "0.1.0")]
#[command(about = "Identify, build, flash and monitor a test harness / DUT board pair")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Test harness board model
    #[arg(long, global = true)]
    th: Option<String>,

    /// Device under test board model
    #[arg(long, global = true)]
    dut: Option<String>,

    /// Test module (e.g. gpio, timer, meta)
    #[arg(short, long, global = true)]
    module: Option<String>,

    /// EC source directory
    #[arg(long, global = true)]
    ec_dir: Option<PathBuf>,

    /// Log directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// File caching the TH serial number
    #[arg(long, global = true)]
    serial_path: Option<PathBuf>,

    /// DUT adapter serial number, skips DUT identification
    #[arg(long, global = true)]
    dut_serial: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported board models
    Boards,

    /// Identify the test harness (connect only the TH)
    Setup,

    /// Resolve both boards' serial numbers and consoles
    Identify,

    /// Build the test module for both boards
    Build,

    /// Flash both boards
    Flash {
        /// TH image (default: <ec-dir>/build/<board>/<module>/ec.bin)
        #[arg(long)]
        th_image: Option<PathBuf>,

        /// DUT image (default: <ec-dir>/build/<board>/<module>/ec.bin)
        #[arg(long)]
        dut_image: Option<PathBuf>,
    },

    /// Reset and halt both boards
    Reset,

    /// Reset a board and read its console
    Read {
        /// Board to read
        #[arg(short, long, value_enum, default_value = "dut")]
        board: Target,

        /// Stop once more than this many reboots were seen
        #[arg(long, default_value_t = 1)]
        max_boot_count: usize,

        /// Append the output to console_<board>.log in the log directory
        #[arg(long)]
        save: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    Th,
    Dut,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = load_config(&cli)?;
    let host = SystemHost::new();

    match cli.command {
        Commands::Boards => handle_boards(),
        Commands::Setup => handle_setup(&config, &host),
        Commands::Identify => {
            let pair = BoardPair::new(&config, cli.dut_serial)?;
            handle_identify(&pair, &host)
        }
        Commands::Build => {
            let pair = BoardPair::new(&config, cli.dut_serial)?;
            handle_build(&pair, &config)
        }
        Commands::Flash {
            th_image,
            dut_image,
        } => {
            let pair = BoardPair::new(&config, cli.dut_serial)?;
            handle_flash(&pair, &host, &config, th_image, dut_image)
        }
        Commands::Reset => {
            let pair = BoardPair::new(&config, cli.dut_serial)?;
            handle_reset(&pair, &host)
        }
        Commands::Read {
            board,
            max_boot_count,
            save,
        } => {
            let mut pair = BoardPair::new(&config, cli.dut_serial)?;
            handle_read(&mut pair, &host, board, max_boot_count, save)
        }
    }
}

fn load_config(cli: &Cli) -> Result<HarnessConfig> {
    let mut config = match cli.config {
        Some(ref path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };

    let th = cli.th.clone().unwrap_or_else(|| config.th_board.clone());
    let dut = cli.dut.clone().unwrap_or_else(|| config.dut_board.clone());
    config = config.with_boards(&th, &dut);

    if let Some(ref module) = cli.module {
        config = config.with_module(module);
    }
    if let Some(ref ec_dir) = cli.ec_dir {
        config = config.with_ec_dir(ec_dir);
    }
    if let Some(ref log_dir) = cli.log_dir {
        config = config.with_log_dir(log_dir);
    }
    if let Some(ref serial_path) = cli.serial_path {
        config = config.with_serial_path(serial_path);
    }

    Ok(config)
}

/// The TH and DUT managed by this run
struct BoardPair {
    th: TestHarness,
    dut: DeviceUnderTest,
}

impl BoardPair {
    fn new(config: &HarnessConfig, dut_serial: Option<String>) -> Result<Self> {
        let th = TestHarness::new(&config.th_board, &config.module, config)
            .context("Failed to set up the test harness")?;
        let dut = DeviceUnderTest::new(&config.dut_board, &th, &config.module, config, dut_serial)
            .context("Failed to set up the device under test")?;
        Ok(Self { th, dut })
    }

    /// Resolve TH then DUT, in that order
    fn resolve_serials(&self, host: &SystemHost) -> Result<()> {
        let th_serial = self.th.resolve_serial(host)?;
        println!("{} TH serial: {}", "[OK]".green().bold(), th_serial.white());
        let dut_serial = self.dut.resolve_serial(host)?;
        println!("{} DUT serial: {}", "[OK]".green().bold(), dut_serial.white());
        Ok(())
    }
}

fn handle_boards() -> Result<()> {
    println!("{}", "=".repeat(60));
    println!("{}", "Supported Boards".cyan().bold());
    println!("{}", "=".repeat(60));

    for name in model_names() {
        let model = get_model(name)?;
        println!("\n  {}", name.white().bold());
        println!("    OpenOCD config: {}", model.openocd_config);
        println!("    Flash offset: {}", model.flash_offset_hex());
    }

    println!("\n{}", "=".repeat(60));
    Ok(())
}

fn handle_setup(config: &HarnessConfig, host: &SystemHost) -> Result<()> {
    let th = TestHarness::new(&config.th_board, &config.module, config)?;

    println!(
        "{} Looking for the test harness ({})...",
        "[*]".cyan().bold(),
        th.board().name()
    );
    let serial = th.save_serial(host)?;
    println!(
        "{} Your TH serial {} has been saved as {}",
        "[OK]".green().bold(),
        serial.white().bold(),
        th.serial_path().display()
    );
    Ok(())
}

fn handle_identify(pair: &BoardPair, host: &SystemHost) -> Result<()> {
    pair.resolve_serials(host)?;

    for board in [pair.th.board(), pair.dut.board()] {
        board.locate_tty(host)?;
        println!("\n{}", "=".repeat(60));
        println!("{}", board.role().to_string().cyan().bold());
        println!("{}", "=".repeat(60));
        println!("{}", board);
    }
    println!("{}", "=".repeat(60));
    Ok(())
}

fn handle_build(pair: &BoardPair, config: &HarnessConfig) -> Result<()> {
    for board in [pair.th.board(), pair.dut.board()] {
        println!(
            "{} Building {} for {}...",
            "[*]".cyan().bold(),
            board.module(),
            board.name().white()
        );
        board
            .build(&config.ec_dir)
            .with_context(|| format!("Build failed for {}", board.name()))?;
        println!("{} Build log: {}", "[OK]".green().bold(), board.build_log().display());
    }
    Ok(())
}

fn handle_flash(
    pair: &BoardPair,
    host: &SystemHost,
    config: &HarnessConfig,
    th_image: Option<PathBuf>,
    dut_image: Option<PathBuf>,
) -> Result<()> {
    pair.resolve_serials(host)?;

    let jobs = [(pair.th.board(), th_image), (pair.dut.board(), dut_image)];
    for (board, image) in jobs {
        let image = image.unwrap_or_else(|| board.image_path(&config.ec_dir));
        println!(
            "{} Flashing {} with {} at {}...",
            "[*]".cyan().bold(),
            board.name().white(),
            image.display(),
            board.model().flash_offset_hex()
        );
        board.flash(&image).with_context(|| {
            format!(
                "Flashing {} failed, see {}",
                board.name(),
                board.openocd_log().display()
            )
        })?;
        println!("{} Flashed {}", "[OK]".green().bold(), board.name());
    }
    Ok(())
}

fn handle_reset(pair: &BoardPair, host: &SystemHost) -> Result<()> {
    pair.resolve_serials(host)?;

    for board in [pair.th.board(), pair.dut.board()] {
        board.reset().with_context(|| {
            format!(
                "Reset failed for {}, see {}",
                board.name(),
                board.openocd_log().display()
            )
        })?;
        println!("{} {} reset and halted", "[OK]".green().bold(), board.name());
    }
    Ok(())
}

fn handle_read(
    pair: &mut BoardPair,
    host: &SystemHost,
    target: Target,
    max_boot_count: usize,
    save: bool,
) -> Result<()> {
    // The DUT can only be told apart once the TH serial is known
    pair.th.resolve_serial(host)?;

    let board: &mut dyn BoardRole = match target {
        Target::Th => &mut pair.th,
        Target::Dut => &mut pair.dut,
    };

    board
        .setup_tty(host)
        .with_context(|| format!("Console setup failed for {}", board.board().name()))?;
    println!(
        "{} Reading {} on {} (stops after {} reboot(s))",
        "[*]".cyan().bold(),
        board.board().name().white(),
        board
            .board()
            .tty_port()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        max_boot_count + 1
    );

    let capture = board.read_tty(max_boot_count)?;
    board.board_mut().close_tty();

    println!("{}", "=".repeat(70).dimmed());
    print!("{}", capture.text);
    if !capture.text.is_empty() && !capture.text.ends_with('\n') {
        println!();
    }
    println!("{}", "=".repeat(70).dimmed());
    println!("Boots detected: {}", capture.boot_count.to_string().white().bold());

    if save {
        let path = board.board().save_console(&capture)?;
        println!("{} Console saved to {}", "[LOG]".cyan().bold(), path.display());
    }
    Ok(())
}
