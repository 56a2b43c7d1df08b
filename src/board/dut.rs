//! Device under test board

use super::{Board, BoardRole, HarnessSerial, Role, TestHarness};
use crate::config::HarnessConfig;
use crate::error::{BoardError, Result};
use crate::host::HostProbe;
use log::info;

const AMBIGUOUS_DUT: &str =
    "Your TH serial number is incorrect, or you have too many ST-Link devices attached";

#[derive(Debug)]
pub struct DeviceUnderTest {
    board: Board,
    th: HarnessSerial,
}

impl DeviceUnderTest {
    /// Create the DUT paired with `th`
    ///
    /// `serial` presets the adapter serial, which skips resolution entirely.
    /// An empty string is a valid preset.
    pub fn new(
        name: &str,
        th: &TestHarness,
        module: &str,
        config: &HarnessConfig,
        serial: Option<String>,
    ) -> Result<Self> {
        let board = Board::new(name, module, Role::DeviceUnderTest, config)?;
        if let Some(serial) = serial {
            board.set_serial(serial);
        }

        Ok(Self {
            board,
            th: th.serial_handle(),
        })
    }
}

impl BoardRole for DeviceUnderTest {
    fn board(&self) -> &Board {
        &self.board
    }

    fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Pick the one attached adapter that is not the harness
    ///
    /// The harness serial must already be resolved.
    fn resolve_serial(&self, host: &dyn HostProbe) -> Result<&str> {
        if let Some(serial) = self.board.serial() {
            return Ok(serial);
        }

        let th_serial = self.th.get().ok_or(BoardError::HarnessNotResolved)?;
        let candidates: Vec<String> = host
            .stlink_serials()?
            .into_iter()
            .filter(|serial| serial != th_serial)
            .collect();

        if candidates.len() != 1 {
            return Err(BoardError::ambiguous(AMBIGUOUS_DUT, candidates.len()));
        }

        let serial = self
            .board
            .set_serial(candidates.into_iter().next().unwrap_or_default());
        info!("DUT serial is {}", serial);
        Ok(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::test_config;
    use crate::host::fake::FakeHost;
    use std::path::Path;

    fn pair(dir: &Path, dut_serial: Option<String>) -> (TestHarness, DeviceUnderTest) {
        let config = test_config(dir);
        let th = TestHarness::new("stm32l476g-eval", "meta", &config).unwrap();
        th.save_serial(&FakeHost::with_serials(&["ABC123"])).unwrap();
        let dut = DeviceUnderTest::new("nucleo-f072rb", &th, "meta", &config, dut_serial).unwrap();
        (th, dut)
    }

    #[test]
    fn test_only_harness_attached() {
        let dir = tempfile::tempdir().unwrap();
        let (_th, dut) = pair(dir.path(), None);

        match dut.resolve_serial(&FakeHost::with_serials(&["ABC123"])) {
            Err(BoardError::Ambiguous { found, message }) => {
                assert_eq!(found, 0);
                assert!(message.contains("TH serial number is incorrect"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(dut.board().serial().is_none());
    }

    #[test]
    fn test_one_other_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let (th, dut) = pair(dir.path(), None);

        let host = FakeHost::with_serials(&["ABC123", "XYZ789"]);
        assert_eq!(dut.resolve_serial(&host).unwrap(), "XYZ789");
        assert_eq!(dut.board().serial(), Some("XYZ789"));
        assert_eq!(th.board().serial(), Some("ABC123"));
    }

    #[test]
    fn test_two_other_adapters() {
        let dir = tempfile::tempdir().unwrap();
        let (_th, dut) = pair(dir.path(), None);

        let host = FakeHost::with_serials(&["ABC123", "XYZ789", "QQQ111"]);
        assert!(matches!(
            dut.resolve_serial(&host),
            Err(BoardError::Ambiguous { found: 2, .. })
        ));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (_th, dut) = pair(dir.path(), None);

        let host = FakeHost::with_serials(&["XYZ789", "ABC123"]);
        assert_eq!(dut.resolve_serial(&host).unwrap(), "XYZ789");
        assert_eq!(dut.resolve_serial(&host).unwrap(), "XYZ789");
        assert_eq!(host.enumerations(), 1);
    }

    #[test]
    fn test_empty_preset_is_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let (_th, dut) = pair(dir.path(), Some(String::new()));

        let host = FakeHost::with_serials(&["ABC123", "XYZ789", "QQQ111"]);
        assert_eq!(dut.resolve_serial(&host).unwrap(), "");
        assert_eq!(dut.resolve_serial(&host).unwrap(), "");
        assert_eq!(host.enumerations(), 0);
    }

    #[test]
    fn test_harness_must_be_resolved_first() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let th = TestHarness::new("stm32l476g-eval", "meta", &config).unwrap();
        let dut = DeviceUnderTest::new("nucleo-f072rb", &th, "meta", &config, None).unwrap();

        let host = FakeHost::with_serials(&["ABC123", "XYZ789"]);
        assert!(matches!(
            dut.resolve_serial(&host),
            Err(BoardError::HarnessNotResolved)
        ));
        assert_eq!(host.enumerations(), 0);
    }

    #[test]
    fn test_unsupported_dut() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let th = TestHarness::new("stm32l476g-eval", "meta", &config).unwrap();

        assert!(matches!(
            DeviceUnderTest::new("nucleo-h743zi", &th, "meta", &config, None),
            Err(BoardError::UnsupportedBoard(_))
        ));
    }
}
