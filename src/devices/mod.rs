//! Supported board models
//!
//! Every board the harness can drive needs an OpenOCD board script and the
//! base address its image is written to. Both tables are static and a board
//! name missing from either one is rejected at construction.

pub mod model;

pub use model::BoardModel;

use crate::error::{BoardError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// OpenOCD board scripts, relative to the OpenOCD scripts directory
pub static OPENOCD_CONFIGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("stm32l476g-eval", "board/stm32l4discovery.cfg");
    m.insert("nucleo-f072rb", "board/st_nucleo_f0.cfg");
    m.insert("nucleo-f411re", "board/st_nucleo_f4.cfg");
    m
});

/// Flash base address per board
pub static FLASH_OFFSETS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("stm32l476g-eval", 0x0800_0000);
    m.insert("nucleo-f072rb", 0x0800_0000);
    m.insert("nucleo-f411re", 0x0800_0000);
    m
});

/// Look up a board model by name
pub fn get_model(name: &str) -> Result<BoardModel> {
    let openocd_config = OPENOCD_CONFIGS
        .get(name)
        .copied()
        .ok_or_else(|| BoardError::UnsupportedBoard(name.to_string()))?;
    let flash_offset = FLASH_OFFSETS
        .get(name)
        .copied()
        .ok_or_else(|| BoardError::MissingFlashOffset(name.to_string()))?;

    Ok(BoardModel {
        name: name.to_string(),
        openocd_config,
        flash_offset,
    })
}

/// Board names with a complete entry, sorted
pub fn model_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = OPENOCD_CONFIGS
        .keys()
        .filter(|name| FLASH_OFFSETS.contains_key(*name))
        .copied()
        .collect();
    names.sort();
    names
}
