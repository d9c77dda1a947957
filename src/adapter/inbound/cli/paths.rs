//! Path utilities for tonsettle.
//!
//! Operator files live under `~/.tonsettle/`:
//! - `~/.tonsettle/config.toml` - configuration, used when `--config` is absent

use std::path::{Path, PathBuf};

/// Returns the tonsettle home directory (`~/.tonsettle/`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tonsettle")
}

/// Returns the default config file path (`~/.tonsettle/config.toml`).
pub fn default_config() -> PathBuf {
    home_dir().join("config.toml")
}

/// The config file to read: the explicit one, else the default if present.
///
/// `None` means configuration comes from the environment alone.
pub fn resolve_config(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = default_config();
            default.is_file().then_some(default)
        }
    }
}
