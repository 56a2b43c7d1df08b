//! Board console reader
//!
//! A read session pulls one byte at a time from the console. Each wait for
//! data is bounded by the port timeout and a timeout ends the session, so a
//! quiet board never blocks the caller for longer than one timeout interval.
//! Lines containing [`REBOOT_MARKER`] are counted as boots.

use crate::error::{BoardError, Result};
use log::debug;
use serialport::SerialPort;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Printed once by the firmware on every boot
pub const REBOOT_MARKER: &str = "UART initialized after reboot";

/// Line rate used when opening the console (ignored by CDC-ACM adapters)
pub const CONSOLE_BAUD: u32 = 115200;

/// Output collected by one read session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleCapture {
    /// Everything read, including a trailing unterminated line
    pub text: String,
    /// Number of lines containing the reboot marker
    pub boot_count: usize,
}

/// Run one read session over `source`
///
/// The session ends when no byte arrives before the source times out, when
/// the source reaches end of stream, or as soon as a completed line pushes
/// the boot count above `max_boot_count`.
pub fn read_session<R: Read + ?Sized>(
    source: &mut R,
    max_boot_count: usize,
) -> Result<ConsoleCapture> {
    let mut output: Vec<u8> = Vec::new();
    let mut line: Vec<u8> = Vec::new();
    let mut boot_count = 0;
    let mut byte = [0u8; 1];

    loop {
        match source.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {}
            Err(ref e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                break
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }

        line.push(byte[0]);
        if byte[0] == b'\n' {
            if contains_marker(&line) {
                boot_count += 1;
            }
            output.append(&mut line);
            if boot_count > max_boot_count {
                break;
            }
        }
    }

    output.append(&mut line);

    Ok(ConsoleCapture {
        text: String::from_utf8_lossy(&output).into_owned(),
        boot_count,
    })
}

fn contains_marker(line: &[u8]) -> bool {
    line.windows(REBOOT_MARKER.len())
        .any(|window| window == REBOOT_MARKER.as_bytes())
}

/// An open board console; the device is released on drop
pub struct Console {
    path: PathBuf,
    port: Box<dyn SerialPort>,
}

impl Console {
    /// Open the console at `path` with `timeout` as the per-byte wait
    pub fn open(board: &str, path: &Path, timeout: Duration) -> Result<Self> {
        let port_path = path.to_string_lossy().into_owned();
        let port = serialport::new(port_path.as_str(), CONSOLE_BAUD)
            .timeout(timeout)
            .open()
            .map_err(|source| BoardError::ConsoleBusy {
                board: board.to_string(),
                path: port_path.clone(),
                source,
            })?;

        debug!("Opened {} for {}", port_path, board);
        Ok(Self {
            path: path.to_path_buf(),
            port,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run one bounded read session, see [`read_session`]
    pub fn read_session(&mut self, max_boot_count: usize) -> Result<ConsoleCapture> {
        read_session(self.port.as_mut(), max_boot_count)
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Yields queued bytes, then times out on every read
    struct ScriptedConsole {
        data: VecDeque<u8>,
        reads: usize,
        timeouts: usize,
    }

    impl ScriptedConsole {
        fn new(text: &str) -> Self {
            Self {
                data: text.bytes().collect(),
                reads: 0,
                timeouts: 0,
            }
        }
    }

    impl Read for ScriptedConsole {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            match self.data.pop_front() {
                Some(b) => {
                    buf[0] = b;
                    Ok(1)
                }
                None => {
                    self.timeouts += 1;
                    Err(io::Error::new(ErrorKind::TimedOut, "Operation timed out"))
                }
            }
        }
    }

    fn boot_line() -> String {
        format!("--- {} ---\n", REBOOT_MARKER)
    }

    #[test]
    fn test_stops_after_second_boot() {
        let rest = "this line must not be read\n";
        let stream = format!("{}test: ok\n{}{}", boot_line(), boot_line(), rest);
        let mut console = ScriptedConsole::new(&stream);

        let capture = read_session(&mut console, 1).unwrap();
        assert_eq!(capture.boot_count, 2);
        assert_eq!(
            capture.text,
            format!("{}test: ok\n{}", boot_line(), boot_line())
        );
        assert_eq!(console.data.len(), rest.len());
        assert_eq!(console.timeouts, 0);
    }

    #[test]
    fn test_keeps_partial_line() {
        let stream = format!("{}running\npartial", boot_line());
        let mut console = ScriptedConsole::new(&stream);

        let capture = read_session(&mut console, 1).unwrap();
        assert_eq!(capture.boot_count, 1);
        assert_eq!(capture.text, stream);
        assert_eq!(console.timeouts, 1);
    }

    #[test]
    fn test_partial_marker_line_not_counted() {
        let stream = format!("ok\n{}", REBOOT_MARKER);
        let mut console = ScriptedConsole::new(&stream);

        let capture = read_session(&mut console, 1).unwrap();
        assert_eq!(capture.boot_count, 0);
        assert_eq!(capture.text, stream);
    }

    #[test]
    fn test_silent_console() {
        let mut console = ScriptedConsole::new("");

        let capture = read_session(&mut console, 1).unwrap();
        assert_eq!(capture, ConsoleCapture::default());
        assert_eq!(console.reads, 1);
        assert_eq!(console.timeouts, 1);
    }

    #[test]
    fn test_end_of_stream() {
        let mut source = io::Cursor::new(b"line one\nline two".to_vec());

        let capture = read_session(&mut source, 1).unwrap();
        assert_eq!(capture.text, "line one\nline two");
        assert_eq!(capture.boot_count, 0);
    }

    #[test]
    fn test_max_boot_count_zero() {
        let stream = format!("{}after\n", boot_line());
        let mut console = ScriptedConsole::new(&stream);

        let capture = read_session(&mut console, 0).unwrap();
        assert_eq!(capture.boot_count, 1);
        assert_eq!(capture.text, boot_line());
    }

    #[test]
    fn test_read_error_propagates() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(ErrorKind::BrokenPipe, "gone"))
            }
        }

        assert!(matches!(
            read_session(&mut Broken, 1),
            Err(BoardError::Io(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_console_on_pty() {
        use std::io::Write;
        use std::time::Instant;

        let (mut master, slave) = serialport::TTYPort::pair().unwrap();
        let slave_path = slave.name().unwrap();
        let timeout = Duration::from_millis(300);

        let mut console = Console::open("nucleo-f072rb", Path::new(&slave_path), timeout).unwrap();
        assert_eq!(console.path(), Path::new(&slave_path));

        let started = Instant::now();
        let capture = console.read_session(1).unwrap();
        assert_eq!(capture, ConsoleCapture::default());
        assert!(started.elapsed() >= Duration::from_millis(250));

        write!(
            master,
            "a\n{marker}\nb\n{marker}\nrest\n",
            marker = REBOOT_MARKER
        )
        .unwrap();
        master.flush().unwrap();

        let capture = console.read_session(1).unwrap();
        assert_eq!(capture.boot_count, 2);
        assert_eq!(
            capture.text,
            format!("a\n{marker}\nb\n{marker}\n", marker = REBOOT_MARKER)
        );
        assert!(!capture.text.contains("rest"));
    }

    #[test]
    fn test_open_missing_device() {
        let err = Console::open(
            "nucleo-f072rb",
            Path::new("/dev/ttyACM-does-not-exist"),
            Duration::from_millis(10),
        )
        .unwrap_err();
        assert!(matches!(err, BoardError::ConsoleBusy { .. }));
    }
}
