//! Commented default configuration written by `wndpump init`.

use super::Config;

/// Generates the default `config.toml` with explanatory comments.
pub fn generate_config() -> String {
    let d = Config::default();
    let w = &d.window;
    let l = &d.logging;

    format!(
        r#"# wndpump configuration

[window]
# Name the window class is registered under.
class_name = "{class_name}"
# Title of the created window.
title = "{title}"
# Initial size in pixels.
width = {width}
height = {height}
# "reuse": an already registered class is fine, the window is still created.
# "strict": an already registered class fails window construction.
registration = "reuse"

[logging]
# Write a log file to ~/.config/wndpump/logs/wndpump.log
enabled = {enabled}
# Minimum level: "debug", "info", "warn", or "error".
level = "{level}"
# Roll the log file over after this many megabytes (0 never rolls, at most 1024).
max_file_mb = {max_file_mb}
# Rolled-over files to keep as wndpump.log.1, .2, ... (0 truncates, at most 9).
backups = {backups}
"#,
        class_name = w.class_name,
        title = w.title,
        width = w.width,
        height = w.height,
        enabled = l.enabled,
        level = l.level,
        max_file_mb = l.max_file_mb,
        backups = l.backups,
    )
}
