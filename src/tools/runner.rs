//! Logged, time-bounded execution of external tools

use crate::error::{BoardError, Result};
use chrono::Local;
use log::{debug, warn};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of one tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Exit status was zero
    pub success: bool,
    /// Tool was killed for exceeding its timeout
    pub timed_out: bool,
    /// Full content of the log file after the run
    pub log: String,
}

impl ToolOutcome {
    /// Turn a failed run into the matching error
    pub fn check(self, tool: &str, timeout: Duration) -> Result<()> {
        if self.success {
            return Ok(());
        }

        warn!("{} failed, log:\n{}", tool, self.log);
        if self.timed_out {
            Err(BoardError::ToolTimeout {
                tool: tool.to_string(),
                timeout,
                log: self.log,
            })
        } else {
            Err(BoardError::ToolFailed {
                tool: tool.to_string(),
                log: self.log,
            })
        }
    }
}

/// Run `program` with stdout and stderr appended to `log_path`
///
/// The child is killed once `timeout` elapses. Spawn failures are errors,
/// a non-zero exit or a timeout is reported through [`ToolOutcome`].
pub fn run_logged(
    program: &str,
    args: &[String],
    log_path: &Path,
    timeout: Duration,
) -> Result<ToolOutcome> {
    let status = {
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        writeln!(
            log,
            "=== [{}] {} {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            program,
            args.join(" ")
        )?;

        debug!("Running {} {}", program, args.join(" "));
        let stderr = log.try_clone()?;
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(log.try_clone()?)
            .stderr(stderr)
            .spawn()
            .map_err(|source| BoardError::ToolSpawn {
                tool: program.to_string(),
                source,
            })?;

        let mut child = ChildGuard(child);
        let status = wait_with_timeout(&mut child.0, timeout)?;
        drop(child);
        if status.is_none() {
            writeln!(log, "=== killed after {:?}", timeout)?;
        }
        status
    };

    let log = fs::read_to_string(log_path)?;
    Ok(ToolOutcome {
        success: status.map(|s| s.success()).unwrap_or(false),
        timed_out: status.is_none(),
        log,
    })
}

/// Kills and reaps the child when dropped, unless it was already reaped
struct ChildGuard(Child);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        // Both are no-ops once a wait has collected the exit status
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Wait for `child` until `timeout` elapses; `None` means it is still running
///
/// A timeout too large to represent as a deadline waits without limit.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now().checked_add(timeout);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }

        let remaining = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                deadline - now
            }
            None => POLL_INTERVAL,
        };

        thread::sleep(POLL_INTERVAL.min(remaining));
    }
}
