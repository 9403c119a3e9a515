use std::path::PathBuf;

use super::Config;
use crate::error::{PumpError, PumpResult};

/// Returns the config directory: `~/.config/wndpump/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".config").join("wndpump"))
}

/// Returns the config file path: `~/.config/wndpump/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Parses and validates configuration text.
pub fn parse(content: &str) -> PumpResult<Config> {
    let mut config: Config =
        toml::from_str(content).map_err(|e| PumpError::Config(e.to_string()))?;
    config.validate();
    Ok(config)
}

/// Tries to load and parse `config.toml`.
pub fn try_load() -> PumpResult<Config> {
    let path = config_path()
        .ok_or_else(|| PumpError::Config("could not determine config path".into()))?;
    let content = std::fs::read_to_string(&path)
        .map_err(|e| PumpError::Config(format!("{}: {e}", path.display())))?;
    parse(&content).map_err(|e| match e {
        PumpError::Config(msg) => PumpError::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Loads the configuration from disk, falling back to defaults.
///
/// A missing file silently yields defaults; any other failure is reported
/// on stderr before falling back.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    if !path.exists() {
        return Config::default();
    }
    match try_load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {e}");
            Config::default()
        }
    }
}
