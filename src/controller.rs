use crate::color::{detect_color, ColorSink};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fanout::FanoutHandler;
use crate::format::{Format, FormatHandler};
use crate::handler::Handler;
use crate::level::{Level, LevelVar};
use crate::logger::{Loggable, Logger, Timer};
use crate::record::Attr;
use crate::redaction::{RedactedKeys, RedactionHandler};
use crate::rotate::RotatingWriter;
use crate::sink::{ConsoleSink, FileSink, Sink};
use crate::stack::StackHandler;
use parking_lot::{Mutex, RwLock};
use std::error::Error as StdError;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Owner of the active logger and of the sink it writes files to.
///
/// Reconfiguration builds a complete new chain first, swaps it in under a
/// short exclusive lock, and only then closes the previous file sink, so no
/// call can reach the old sink after the swap and nobody waits on its close.
///
/// Most programs use the process-wide instance through the free functions
/// of this crate ([`configure`], [`logger`], [`info`], ...). Tests can build
/// their own instance or [`reset`] the global one.
pub struct LoggerService {
    active: RwLock<Option<Active>>,
    /// Serializes configure/reset/lazy-init so builds never race each other.
    configure_lock: Mutex<()>,
    level: Arc<LevelVar>,
    redacted: Arc<RedactedKeys>,
}

struct Active {
    logger: Logger,
    closer: Option<Arc<dyn Sink>>,
}

struct Built {
    logger: Logger,
    closer: Option<Arc<dyn Sink>>,
    error: Option<Error>,
}

impl LoggerService {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
            configure_lock: Mutex::new(()),
            level: Arc::new(LevelVar::default()),
            redacted: Arc::new(RedactedKeys::new()),
        }
    }

    /// Build a chain from `cfg` and install it.
    ///
    /// If the file sink cannot be opened the error is returned, but a logger
    /// without that sink (console, or stderr fallback) is still installed.
    pub fn configure(&self, cfg: Config) -> Result<()> {
        let _serial = self.configure_lock.lock();
        self.configure_locked(cfg)
    }

    fn configure_locked(&self, cfg: Config) -> Result<()> {
        let built = self.build(&cfg);

        let previous = {
            let mut active = self.active.write();
            self.level.set(cfg.level);
            active.replace(Active {
                logger: built.logger,
                closer: built.closer.clone(),
            })
        };

        if let Some(prev) = previous.and_then(|a| a.closer) {
            let reused = built
                .closer
                .as_ref()
                .map(|next| Arc::ptr_eq(next, &prev))
                .unwrap_or(false);
            if !reused {
                let _ = prev.close();
            }
        }

        match built.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn build(&self, cfg: &Config) -> Built {
        let mut terminals: Vec<Arc<dyn Handler>> = Vec::new();

        if cfg.console {
            let mut sink: Arc<dyn Sink> = Arc::new(ConsoleSink);
            if detect_color() {
                sink = Arc::new(ColorSink::new(sink));
            }
            terminals.push(self.terminal(sink, cfg.console_json, cfg.add_source));
        }

        let (closer, error) = match (&cfg.file_writer, &cfg.file_path) {
            (Some(writer), _) => (Some(Arc::clone(writer)), None),
            (None, Some(path)) => match open_file_sink(path, cfg) {
                Ok(sink) => (Some(sink), None),
                Err(err) => (None, Some(err)),
            },
            (None, None) => (None, None),
        };
        if let Some(sink) = &closer {
            terminals.push(self.terminal(Arc::clone(sink), cfg.json_file, cfg.add_source));
        }

        let terminal = FanoutHandler::combine(terminals)
            .unwrap_or_else(|| self.terminal(Arc::new(ConsoleSink), false, cfg.add_source));

        let handler =
            StackHandler::wrap_with_max_bytes(terminal, cfg.stacktrace_level, cfg.stack_max_bytes);
        let handler: Arc<dyn Handler> =
            Arc::new(RedactionHandler::new(handler, Arc::clone(&self.redacted)));

        Built {
            logger: Logger::new(handler),
            closer,
            error,
        }
    }

    fn terminal(&self, sink: Arc<dyn Sink>, json: bool, add_source: bool) -> Arc<dyn Handler> {
        let format = if json { Format::Json } else { Format::Text };
        Arc::new(FormatHandler::new(sink, format, Arc::clone(&self.level)).add_source(add_source))
    }

    /// Tear down to the unconfigured state: close and drop the owned sink,
    /// drop the active logger, clear redacted keys, and restore `Info`.
    pub fn reset(&self) {
        let _serial = self.configure_lock.lock();
        let previous = {
            let mut active = self.active.write();
            self.level.set(Level::Info);
            active.take()
        };
        self.redacted.clear();

        if let Some(closer) = previous.and_then(|a| a.closer) {
            let _ = closer.close();
        }
    }

    /// Install `logger` as is. Any sink owned by the previous configuration
    /// is closed; the new logger's sinks stay owned by the caller.
    pub fn set_logger(&self, logger: Logger) {
        let _serial = self.configure_lock.lock();
        let previous = self.active.write().replace(Active {
            logger,
            closer: None,
        });
        if let Some(closer) = previous.and_then(|a| a.closer) {
            let _ = closer.close();
        }
    }

    /// The active logger. The first call on an unconfigured service installs
    /// [`Config::default`] through the regular configure path.
    pub fn logger(&self) -> Logger {
        if let Some(logger) = self.current() {
            return logger;
        }

        let _serial = self.configure_lock.lock();
        if let Some(logger) = self.current() {
            return logger;
        }
        let _ = self.configure_locked(Config::default());
        self.current().unwrap_or_else(|| {
            Logger::new(self.terminal(Arc::new(ConsoleSink), false, false))
        })
    }

    pub fn is_configured(&self) -> bool {
        self.active.read().is_some()
    }

    fn current(&self) -> Option<Logger> {
        self.active.read().as_ref().map(|a| a.logger.clone())
    }

    pub fn level(&self) -> Level {
        self.level.get()
    }

    /// Change the minimum level of the active chain without rebuilding it.
    pub fn set_level(&self, level: Level) {
        self.level.set(level);
    }

    pub fn redacted_keys(&self) -> &Arc<RedactedKeys> {
        &self.redacted
    }
}

impl Default for LoggerService {
    fn default() -> Self {
        Self::new()
    }
}

fn open_file_sink(path: &Path, cfg: &Config) -> Result<Arc<dyn Sink>> {
    if cfg.file_max_size_bytes > 0 {
        let writer = RotatingWriter::new(path, cfg.file_max_size_bytes, cfg.file_max_backups)?;
        return Ok(Arc::new(writer));
    }
    let file = FileSink::open(path).map_err(|source| Error::OpenFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Arc::new(file))
}

/// The process-wide [`LoggerService`].
pub fn global() -> &'static LoggerService {
    static GLOBAL: OnceLock<LoggerService> = OnceLock::new();
    GLOBAL.get_or_init(LoggerService::new)
}

/// [`LoggerService::configure`] on the process-wide service.
pub fn configure(cfg: Config) -> Result<()> {
    global().configure(cfg)
}

/// [`LoggerService::reset`] on the process-wide service.
pub fn reset() {
    global().reset()
}

/// [`LoggerService::logger`] on the process-wide service.
pub fn logger() -> Logger {
    global().logger()
}

pub fn set_logger(logger: Logger) {
    global().set_logger(logger)
}

pub fn set_level(level: Level) {
    global().set_level(level)
}

/// Add to the process-wide redacted key set. Existing keys are kept; call
/// [`clear_redacted_keys`] to start over.
pub fn set_redacted_keys<I>(keys: I)
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    global().redacted_keys().set(keys)
}

/// Same as [`set_redacted_keys`].
pub fn add_redacted_keys<I>(keys: I)
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    global().redacted_keys().add(keys)
}

pub fn clear_redacted_keys() {
    global().redacted_keys().clear()
}

pub fn list_redacted_keys() -> Vec<String> {
    global().redacted_keys().list()
}

#[track_caller]
pub fn debug<I: IntoIterator<Item = Attr>>(msg: impl Into<String>, attrs: I) {
    logger().debug(msg, attrs)
}

#[track_caller]
pub fn info<I: IntoIterator<Item = Attr>>(msg: impl Into<String>, attrs: I) {
    logger().info(msg, attrs)
}

#[track_caller]
pub fn warn<I: IntoIterator<Item = Attr>>(msg: impl Into<String>, attrs: I) {
    logger().warn(msg, attrs)
}

#[track_caller]
pub fn error<I: IntoIterator<Item = Attr>>(msg: impl Into<String>, attrs: I) {
    logger().error(msg, attrs)
}

/// Log at `Error` on the process-wide logger and exit with status 1.
#[track_caller]
pub fn fatal<I: IntoIterator<Item = Attr>>(msg: impl Into<String>, attrs: I) -> ! {
    logger().fatal(msg, attrs)
}

#[track_caller]
pub fn error_err<E, I>(msg: impl Into<String>, err: &E, attrs: I)
where
    E: StdError + ?Sized,
    I: IntoIterator<Item = Attr>,
{
    logger().error_err(msg, err, attrs)
}

#[track_caller]
pub fn error_loggable<E, I>(msg: impl Into<String>, err: &E, attrs: I)
where
    E: StdError + Loggable,
    I: IntoIterator<Item = Attr>,
{
    logger().error_loggable(msg, err, attrs)
}

pub fn with<I: IntoIterator<Item = Attr>>(attrs: I) -> Logger {
    logger().with(attrs)
}

pub fn with_group(name: &str) -> Logger {
    logger().with_group(name)
}

#[track_caller]
pub fn timed<I: IntoIterator<Item = Attr>>(msg: &str, attrs: I) -> Timer {
    logger().timed(msg, attrs)
}

#[track_caller]
pub fn timed_level<I: IntoIterator<Item = Attr>>(level: Level, msg: &str, attrs: I) -> Timer {
    logger().timed_level(level, msg, attrs)
}
