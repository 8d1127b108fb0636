//! Environment variable names used by this crate for configuring the
//! process-wide logger without code changes.
//!
//! These are purely helpers; [`Config`] itself stays decoupled from
//! environment access.

use crate::config::Config;
use crate::level::Level;
use std::path::PathBuf;

/// Minimum level: `debug`, `info`, `warn` or `error`.
pub const LOGCHAIN_LEVEL_ENV: &str = "LOGCHAIN_LEVEL";

/// Enable console output (`true`/`false`).
pub const LOGCHAIN_CONSOLE_ENV: &str = "LOGCHAIN_CONSOLE";

/// Console output as JSON.
pub const LOGCHAIN_CONSOLE_JSON_ENV: &str = "LOGCHAIN_CONSOLE_JSON";

/// Log file path.
pub const LOGCHAIN_FILE_ENV: &str = "LOGCHAIN_FILE";

/// File output as JSON.
pub const LOGCHAIN_JSON_FILE_ENV: &str = "LOGCHAIN_JSON_FILE";

/// Annotate records with the caller's `file:line`.
pub const LOGCHAIN_ADD_SOURCE_ENV: &str = "LOGCHAIN_ADD_SOURCE";

/// Level at which stack traces are attached; unset or `off` disables.
pub const LOGCHAIN_STACKTRACE_LEVEL_ENV: &str = "LOGCHAIN_STACKTRACE_LEVEL";

/// Rotation threshold in bytes.
pub const LOGCHAIN_FILE_MAX_SIZE_ENV: &str = "LOGCHAIN_FILE_MAX_SIZE";

/// Number of rotated files to keep.
pub const LOGCHAIN_FILE_MAX_BACKUPS_ENV: &str = "LOGCHAIN_FILE_MAX_BACKUPS";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// [`Config::default`] overridden by any `LOGCHAIN_*` variables that are
    /// set. Values that fail to parse leave the default in place.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        let flag = |key: &str, current: bool| {
            lookup(key).and_then(|v| parse_bool(&v)).unwrap_or(current)
        };

        if let Some(level) = lookup(LOGCHAIN_LEVEL_ENV).and_then(|v| v.parse::<Level>().ok()) {
            cfg.level = level;
        }
        cfg.console = flag(LOGCHAIN_CONSOLE_ENV, cfg.console);
        cfg.console_json = flag(LOGCHAIN_CONSOLE_JSON_ENV, cfg.console_json);
        cfg.json_file = flag(LOGCHAIN_JSON_FILE_ENV, cfg.json_file);
        cfg.add_source = flag(LOGCHAIN_ADD_SOURCE_ENV, cfg.add_source);

        if let Some(path) = lookup(LOGCHAIN_FILE_ENV).filter(|p| !p.is_empty()) {
            cfg.file_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(LOGCHAIN_STACKTRACE_LEVEL_ENV) {
            cfg.stacktrace_level = raw.parse::<Level>().ok();
        }
        if let Some(size) = lookup(LOGCHAIN_FILE_MAX_SIZE_ENV).and_then(|v| v.trim().parse::<u64>().ok()) {
            cfg.file_max_size_bytes = size;
        }
        if let Some(n) = lookup(LOGCHAIN_FILE_MAX_BACKUPS_ENV).and_then(|v| v.trim().parse::<usize>().ok()) {
            cfg.file_max_backups = n;
        }
        cfg
    }
}
