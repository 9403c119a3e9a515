//! Rotating file log for pump diagnostics.
//!
//! Records land in `<config dir>/logs/wndpump.log`, each tagged with the
//! emitting thread's name. Affinity threads are named after their window
//! class, so a record shows which window's pump produced it. Once the file
//! passes `max_file_mb` it rolls into numbered backups (`wndpump.log.1` is
//! the newest). Before [`init`] installs a sink every macro is a no-op.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

static SINK: OnceLock<Mutex<RotatingFile>> = OnceLock::new();

const FILE_NAME: &str = "wndpump.log";

/// Largest accepted `max_file_mb`.
pub const MAX_FILE_MB: u64 = 1024;
/// Largest accepted number of rotated backups.
pub const MAX_BACKUPS: u32 = 9;

/// `[logging]` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub enabled: bool,
    /// Records below this level are dropped.
    pub level: Level,
    /// Size in megabytes at which the file rolls over; 0 never rolls.
    pub max_file_mb: u64,
    /// Rotated files kept next to the live one; 0 truncates in place.
    pub backups: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: Level::Info,
            max_file_mb: 10,
            backups: 1,
        }
    }
}

impl LogConfig {
    /// Clamps rotation settings into their supported ranges.
    pub fn validate(&mut self) {
        self.max_file_mb = self.max_file_mb.min(MAX_FILE_MB);
        self.backups = self.backups.min(MAX_BACKUPS);
    }

    /// Rollover threshold in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_file_mb.saturating_mul(1024 * 1024)
    }
}

/// Record severity, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// Lowercase, as written in the config file.
impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

struct RotatingFile {
    path: PathBuf,
    file: File,
    level: Level,
    max_bytes: u64,
    backups: u32,
    written: u64,
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl RotatingFile {
    fn open(dir: &Path, level: Level, max_bytes: u64, backups: u32) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(FILE_NAME);
        let file = open_append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            level,
            max_bytes,
            backups,
            written,
        })
    }

    fn record(&mut self, level: Level, args: fmt::Arguments<'_>) -> io::Result<()> {
        if level < self.level {
            return Ok(());
        }
        let current = thread::current();
        let line = format!(
            "{} {:<5} [{}] {args}\n",
            clock(),
            level.label(),
            current.name().unwrap_or("-"),
        );
        self.file.write_all(line.as_bytes())?;
        self.written = self.written.saturating_add(line.len() as u64);
        if self.max_bytes > 0 && self.written >= self.max_bytes {
            self.roll()?;
        }
        Ok(())
    }

    fn backup(&self, n: u32) -> PathBuf {
        self.path.with_file_name(format!("{FILE_NAME}.{n}"))
    }

    fn roll(&mut self) -> io::Result<()> {
        if self.backups == 0 {
            self.file = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&self.path)?;
        } else {
            for n in (1..self.backups).rev() {
                let older = self.backup(n);
                if older.exists() {
                    fs::rename(&older, self.backup(n + 1))?;
                }
            }
            fs::rename(&self.path, self.backup(1))?;
            self.file = open_append(&self.path)?;
        }
        self.written = 0;
        Ok(())
    }
}

/// UTC wall-clock time of day, `hh:mm:ss.mmm`.
fn clock() -> String {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let of_day = since_epoch.as_secs() % 86_400;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        of_day / 3600,
        of_day % 3600 / 60,
        of_day % 60,
        since_epoch.subsec_millis()
    )
}

/// Installs the process-wide log file described by `config`.
///
/// Disabled logging is not an error. A second call keeps the first sink.
pub fn init(config: &LogConfig) -> io::Result<()> {
    if !config.enabled {
        return Ok(());
    }
    let dir = crate::config::config_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?
        .join("logs");
    let mut config = config.clone();
    config.validate();
    let sink = RotatingFile::open(&dir, config.level, config.max_bytes(), config.backups)?;
    let _ = SINK.set(Mutex::new(sink));
    Ok(())
}

/// Backend of the `log_*` macros.
pub fn write(level: Level, args: fmt::Arguments<'_>) {
    if let Some(sink) = SINK.get() {
        let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = sink.record(level, args);
    }
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Debug, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Info, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Warn, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log::write($crate::log::Level::Error, format_args!($($arg)*)) };
}
