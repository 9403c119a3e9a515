mod loader;
pub mod template;

use serde::{Deserialize, Serialize};

use crate::log::LogConfig;

pub use loader::{config_dir, config_path, load, parse, try_load};

/// Top-level configuration for wndpump.
///
/// Loaded from `~/.config/wndpump/config.toml`. Missing sections
/// fall back to defaults thanks to `#[serde(default)]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Window class and creation parameters.
    pub window: WindowConfig,
    /// File logging settings.
    pub logging: LogConfig,
}

/// Window class and creation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Name the window class is registered under.
    pub class_name: String,
    /// Window title.
    pub title: String,
    /// Initial width in pixels.
    pub width: i32,
    /// Initial height in pixels.
    pub height: i32,
    /// What to do when the class is already registered.
    pub registration: RegistrationPolicy,
}

/// Handling of a class that is already registered in the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationPolicy {
    /// Treat "already registered" as success and create the window anyway.
    #[default]
    Reuse,
    /// Fail construction with a registration error.
    Strict,
}

const DEFAULT_CLASS_NAME: &str = "WndPumpWindow";

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            class_name: DEFAULT_CLASS_NAME.into(),
            title: "wndpump".into(),
            width: 300,
            height: 200,
            registration: RegistrationPolicy::Reuse,
        }
    }
}

impl Config {
    /// Clamps window dimensions and log rotation settings, and restores an
    /// empty class name.
    pub fn validate(&mut self) {
        self.window.validate();
        self.logging.validate();
    }
}

impl WindowConfig {
    pub fn validate(&mut self) {
        self.class_name = self.class_name.trim().to_string();
        if self.class_name.is_empty() {
            self.class_name = DEFAULT_CLASS_NAME.into();
        }
        self.width = self.width.clamp(0, 16_384);
        self.height = self.height.clamp(0, 16_384);
    }
}

#[cfg(test)]
mod tests;
