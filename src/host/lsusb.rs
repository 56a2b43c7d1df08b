//! `lsusb -v` output parsing

/// Extract serial numbers from verbose lsusb descriptor text
///
/// Serials are taken from `iSerial` lines, which look like
/// `iSerial                 3 066DFF555654725187131529`. Lines with no value
/// after the string index are skipped.
pub fn parse_serials(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.contains("iSerial"))
        .filter_map(|line| line.split_whitespace().nth(2))
        .map(|serial| serial.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_STLINKS: &str = "\
Bus 001 Device 012: ID 0483:374b STMicroelectronics ST-LINK/V2.1
Device Descriptor:
  bLength                18
  idVendor           0x0483 STMicroelectronics
  idProduct          0x374b ST-LINK/V2.1
  iManufacturer           1 STMicroelectronics
  iProduct                2 STM32 STLink
  iSerial                 3 0670FF484957847167071621
Bus 001 Device 013: ID 0483:374b STMicroelectronics ST-LINK/V2.1
Device Descriptor:
  iSerial                 3 066DFF555654725187131529
";

    #[test]
    fn test_parse_two_adapters() {
        assert_eq!(
            parse_serials(TWO_STLINKS),
            vec!["0670FF484957847167071621", "066DFF555654725187131529"]
        );
    }

    #[test]
    fn test_serial_without_value() {
        assert!(parse_serials("  iSerial                 0 \n").is_empty());
    }

    #[test]
    fn test_no_adapters() {
        assert!(parse_serials("").is_empty());
    }
}
