//! External tool invocation
//!
//! Thin wrappers over the programs a board is driven with:
//! - `openocd` for reset/halt and flashing through the ST-Link
//! - `make` for building the test module firmware

pub mod make;
pub mod openocd;
pub mod runner;

pub use runner::run_logged;

/// Default debug probe program
pub const OPENOCD: &str = "openocd";
/// Default build program
pub const MAKE: &str = "make";
