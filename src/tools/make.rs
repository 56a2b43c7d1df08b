//! EC firmware build invocation

use std::path::{Path, PathBuf};

/// Arguments for a parallel build of `module` for `board`
pub fn make_args(ec_dir: &Path, board: &str, module: &str) -> Vec<String> {
    vec![
        format!("--directory={}", ec_dir.display()),
        format!("BOARD={}", board),
        format!("CTS_MODULE={}", module),
        "-j".to_string(),
    ]
}

/// Where the build leaves the image for `board`
pub fn image_path(ec_dir: &Path, board: &str, module: &str) -> PathBuf {
    ec_dir
        .join("build")
        .join(board)
        .join(module)
        .join("ec.bin")
}
