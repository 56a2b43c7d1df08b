//! Console device lookup by adapter serial number

use crate::error::{BoardError, Result};
use crate::host::{udev, HostProbe};
use log::{debug, info};
use std::path::PathBuf;

/// Find the console device whose udev serial equals `serial`
///
/// Candidates are tried in the order the host returns them and the first
/// match is returned without querying the rest.
pub fn locate_tty(host: &dyn HostProbe, serial: &str) -> Result<PathBuf> {
    for candidate in host.tty_candidates()? {
        let properties = host.tty_properties(&candidate)?;
        if udev::matches_serial(&properties, serial) {
            info!("Serial {} is on {}", serial, candidate.display());
            return Ok(candidate);
        }
        debug!("{} does not belong to {}", candidate.display(), serial);
    }

    Err(BoardError::TtyNotFound {
        serial: serial.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::FakeHost;

    fn host_with(serials: &[&str]) -> FakeHost {
        let mut host = FakeHost::default();
        for (i, serial) in serials.iter().enumerate() {
            host.add_tty(&format!("/dev/ttyACM{}", i), serial);
        }
        host
    }

    #[test]
    fn test_third_candidate_matches() {
        let host = host_with(&["AAA", "BBB", "CCC", "DDD", "EEE"]);

        let path = locate_tty(&host, "CCC").unwrap();
        assert_eq!(path, PathBuf::from("/dev/ttyACM2"));
        assert_eq!(
            host.property_queries(),
            vec![
                PathBuf::from("/dev/ttyACM0"),
                PathBuf::from("/dev/ttyACM1"),
                PathBuf::from("/dev/ttyACM2"),
            ]
        );
    }

    #[test]
    fn test_no_candidate_matches() {
        let host = host_with(&["AAA", "BBB"]);

        let err = locate_tty(&host, "ZZZ").unwrap_err();
        assert!(matches!(err, BoardError::TtyNotFound { ref serial } if serial == "ZZZ"));
        assert_eq!(host.property_queries().len(), 2);
    }

    #[test]
    fn test_no_candidates() {
        let host = FakeHost::default();
        assert!(matches!(
            locate_tty(&host, "AAA"),
            Err(BoardError::TtyNotFound { .. })
        ));
    }

    #[test]
    fn test_prefix_of_serial_does_not_match() {
        let host = host_with(&["AAA111", "AAA"]);
        assert_eq!(
            locate_tty(&host, "AAA").unwrap(),
            PathBuf::from("/dev/ttyACM1")
        );
    }
}
