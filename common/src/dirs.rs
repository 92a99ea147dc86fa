//! Where upload-ai keeps its files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use xdg::BaseDirectories;

pub const APP_NAME: &str = "upload-ai";

fn base_dirs() -> BaseDirectories {
    BaseDirectories::with_prefix(APP_NAME)
}

/// Directory holding the CLI log, e.g. `~/.local/state/upload-ai/`.
///
/// Created on first use since logging starts before any command runs.
pub fn state_dir() -> Result<PathBuf> {
    let dir = base_dirs()
        .get_state_home()
        .context("Failed to get XDG state directory (HOME not set?)")?;
    std::fs::create_dir_all(&dir).context("Failed to create state directory")?;
    Ok(dir)
}

/// Directory searched for `config.toml`, e.g. `~/.config/upload-ai/`.
/// Left alone until `config init` writes the file.
pub fn config_dir() -> Result<PathBuf> {
    base_dirs()
        .get_config_home()
        .context("Could not determine config directory (HOME not set?)")
}

/// Log file shared by every run, appended to rather than rotated.
pub fn log_path() -> Result<PathBuf> {
    Ok(state_dir()?.join(format!("{APP_NAME}.log")))
}
