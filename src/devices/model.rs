//! Board model definition

use std::fmt;

/// Static description of a supported board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardModel {
    /// Board name as known to the EC build (e.g. "nucleo-f072rb")
    pub name: String,
    /// OpenOCD board script, relative to the scripts directory
    pub openocd_config: &'static str,
    /// Address the firmware image is written to
    pub flash_offset: u32,
}

impl BoardModel {
    /// Flash offset as OpenOCD expects it on the command line
    pub fn flash_offset_hex(&self) -> String {
        format!("{:#010x}", self.flash_offset)
    }
}

impl fmt::Display for BoardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, flash at {})",
            self.name,
            self.openocd_config,
            self.flash_offset_hex()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_offset_format() {
        let model = BoardModel {
            name: "nucleo-f411re".to_string(),
            openocd_config: "board/st_nucleo_f4.cfg",
            flash_offset: 0x0800_0000,
        };
        assert_eq!(model.flash_offset_hex(), "0x08000000");
    }
}
