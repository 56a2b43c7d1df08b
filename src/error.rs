//! Error types shared by board resolution, console access and tool runs.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("OpenOCD configuration not found for {0}")]
    UnsupportedBoard(String),

    #[error("Flash offset not found for {0}")]
    MissingFlashOffset(String),

    #[error(
        "Your TH board has not been identified ({path}).\n\
         Connect only the TH and run `cts-board setup`, then try again."
    )]
    HarnessNotIdentified {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TH serial number must be resolved before resolving the DUT")]
    HarnessNotResolved,

    #[error("Serial number of {0} is not resolved yet")]
    SerialNotResolved(String),

    #[error("{message} (found {found} candidate serial numbers)")]
    Ambiguous { message: String, found: usize },

    #[error("No console device under /dev matches serial number '{serial}'")]
    TtyNotFound { serial: String },

    #[error(
        "Unable to open {path} for {board}. If another program (e.g. cat) is \
         reading this tty, stop it and try again"
    )]
    ConsoleBusy {
        board: String,
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Console device for {0} has not been located, call locate_tty first")]
    TtyNotLocated(String),

    #[error("Console for {0} is not open, call setup_tty first")]
    ConsoleNotOpen(String),

    #[error("Failed to start {tool}: {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with failure, log follows:\n{log}")]
    ToolFailed { tool: String, log: String },

    #[error("{tool} did not finish within {timeout:?} and was killed, log follows:\n{log}")]
    ToolTimeout {
        tool: String,
        timeout: Duration,
        log: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BoardError {
    pub(crate) fn ambiguous(message: impl Into<String>, found: usize) -> Self {
        Self::Ambiguous {
            message: message.into(),
            found,
        }
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;
