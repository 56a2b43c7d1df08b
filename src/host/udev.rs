//! `udevadm --query=property` output parsing

/// Property carrying the adapter serial number of a tty
pub const SERIAL_PROPERTY: &str = "ID_SERIAL_SHORT=";

/// Serial numbers announced in udev property text
pub fn serial_values(properties: &str) -> impl Iterator<Item = &str> {
    properties
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(SERIAL_PROPERTY))
}

/// Whether the property text belongs to the adapter with `serial`
pub fn matches_serial(properties: &str, serial: &str) -> bool {
    serial_values(properties).any(|value| value == serial)
}
