use crate::level::Level;
use crate::sink::Sink;
use crate::stack::DEFAULT_STACK_MAX_BYTES;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Logger construction options for
/// [`LoggerService::configure`](crate::controller::LoggerService::configure).
///
/// **Fields**
/// - `level`: minimum emitted level (also adjustable later via `set_level`).
/// - `console` / `console_json`: log to stderr, as text or JSON.
/// - `file_path` / `json_file`: log to a file, as text or JSON.
/// - `add_source`: annotate records with the caller's `file:line`.
/// - `stacktrace_level`: attach a `stack` attribute at or above this level;
///   `None` disables stack capture entirely.
/// - `stack_max_bytes`: cap for attached stacks.
/// - `file_max_size_bytes`: rotate the file past this size (`0` = never).
/// - `file_max_backups`: rotated files to keep (`0` = keep all).
/// - `file_writer`: caller-supplied sink used instead of `file_path`.
///
/// When neither console nor a file sink ends up usable, output falls back to
/// plain text on stderr.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub level: Level,
    pub console: bool,
    pub console_json: bool,
    pub file_path: Option<PathBuf>,
    pub json_file: bool,
    pub add_source: bool,
    pub stacktrace_level: Option<Level>,
    pub stack_max_bytes: usize,
    pub file_max_size_bytes: u64,
    pub file_max_backups: usize,
    #[serde(skip)]
    pub file_writer: Option<Arc<dyn Sink>>,
}

impl Default for Config {
    /// Console-only text output at `Info`.
    fn default() -> Self {
        Self {
            level: Level::Info,
            console: true,
            console_json: false,
            file_path: None,
            json_file: false,
            add_source: false,
            stacktrace_level: None,
            stack_max_bytes: DEFAULT_STACK_MAX_BYTES,
            file_max_size_bytes: 0,
            file_max_backups: 0,
            file_writer: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("level", &self.level)
            .field("console", &self.console)
            .field("console_json", &self.console_json)
            .field("file_path", &self.file_path)
            .field("json_file", &self.json_file)
            .field("add_source", &self.add_source)
            .field("stacktrace_level", &self.stacktrace_level)
            .field("stack_max_bytes", &self.stack_max_bytes)
            .field("file_max_size_bytes", &self.file_max_size_bytes)
            .field("file_max_backups", &self.file_max_backups)
            .field("file_writer", &self.file_writer.as_ref().map(|_| "<sink>"))
            .finish()
    }
}
