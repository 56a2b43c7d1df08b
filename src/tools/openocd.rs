//! OpenOCD command assembly

use std::path::Path;

/// Commands that reset the target and leave it halted
pub const RESET_HALT: &[&str] = &["init", "reset halt"];

/// Commands that write `image` at `flash_offset`
pub fn flash_commands(image: &Path, flash_offset: &str) -> Vec<String> {
    vec![
        "reset_config connect_assert_srst".to_string(),
        "init".to_string(),
        "reset init".to_string(),
        format!("flash write_image erase {} {}", image.display(), flash_offset),
    ]
}

/// Full argument list for a non-interactive openocd run
///
/// The adapter is selected by serial number and `shutdown` is always the
/// last command so openocd exits once the commands have run.
pub fn openocd_args<S: AsRef<str>>(
    script_dir: &Path,
    config: &str,
    serial: &str,
    commands: &[S],
) -> Vec<String> {
    let mut args = vec![
        "-s".to_string(),
        script_dir.display().to_string(),
        "-f".to_string(),
        config.to_string(),
        "-c".to_string(),
        format!("hla_serial {}", serial),
    ];

    for cmd in commands {
        args.push("-c".to_string());
        args.push(cmd.as_ref().to_string());
    }
    args.push("-c".to_string());
    args.push("shutdown".to_string());

    args
}
