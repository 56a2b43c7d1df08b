//! Board console access
//!
//! This module provides functionality for:
//! - Finding the ttyACM device that belongs to a debug adapter serial number
//! - Reading console output in bounded sessions while counting reboots

pub mod console;
pub mod tty;

pub use console::{Console, ConsoleCapture};
pub use tty::locate_tty;
