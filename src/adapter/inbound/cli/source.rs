//! Configuration resolution shared by CLI handlers.

use std::path::PathBuf;

use tracing::debug;

use crate::adapter::inbound::cli::command::SourceArgs;
use crate::adapter::inbound::cli::paths;
use crate::infrastructure::config::settings::Config;
use crate::error::Result;

/// Load the configuration a command should use.
///
/// Reads `--config` if given, else `~/.tonsettle/config.toml` if present,
/// else the environment alone. `--database` is applied on top.
///
/// # Errors
///
/// Returns a config error if the file is unreadable or validation fails.
pub fn load_config(source: &SourceArgs) -> Result<Config> {
    let mut config = match paths::resolve_config(source.config.as_deref()) {
        Some(path) => {
            debug!(path = %path.display(), "Loading config file");
            Config::load(&path)?
        }
        None => {
            debug!("No config file, using environment");
            Config::from_env()?
        }
    };
    if let Some(database) = &source.database {
        config.database = database.to_string_lossy().into_owned();
    }
    Ok(config)
}

/// The ledger file a ledger command should open.
///
/// `--database` is enough on its own; otherwise the full configuration is
/// loaded for its `database` setting.
///
/// # Errors
///
/// Returns a config error if the configuration has to be loaded and fails.
pub fn ledger_path(source: &SourceArgs) -> Result<PathBuf> {
    match &source.database {
        Some(path) => Ok(path.clone()),
        None => Ok(PathBuf::from(load_config(source)?.database)),
    }
}
