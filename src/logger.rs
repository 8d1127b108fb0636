use crate::handler::Handler;
use crate::level::Level;
use crate::record::{Attr, LogRecord, Value};
use std::error::Error as StdError;
use std::panic::Location;
use std::sync::Arc;
use std::time::Instant;

/// Errors that carry their own structured fields.
///
/// Implement this on an error type to have
/// [`Logger::error_loggable`] append the fields next to `error` and
/// `error_type`.
pub trait Loggable {
    fn log_attrs(&self) -> Vec<Attr>;
}

/// Front-end over a handler chain.
///
/// Logging calls never fail from the caller's point of view: records below
/// the chain's level are skipped before being built, and handler errors are
/// dropped. Cloning is cheap.
#[derive(Clone)]
pub struct Logger {
    handler: Arc<dyn Handler>,
}

impl Logger {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.handler.enabled(level)
    }

    /// Feed an already built record through the chain.
    pub fn log_record(&self, record: &LogRecord) {
        if self.handler.enabled(record.level) {
            let _ = self.handler.handle(record);
        }
    }

    #[track_caller]
    pub fn log<I>(&self, level: Level, msg: impl Into<String>, attrs: I)
    where
        I: IntoIterator<Item = Attr>,
    {
        if !self.handler.enabled(level) {
            return;
        }
        let mut record = LogRecord::new(level, msg).with_source(Location::caller());
        record.extend(attrs);
        let _ = self.handler.handle(&record);
    }

    #[track_caller]
    pub fn debug<I>(&self, msg: impl Into<String>, attrs: I)
    where
        I: IntoIterator<Item = Attr>,
    {
        self.log(Level::Debug, msg, attrs);
    }

    #[track_caller]
    pub fn info<I>(&self, msg: impl Into<String>, attrs: I)
    where
        I: IntoIterator<Item = Attr>,
    {
        self.log(Level::Info, msg, attrs);
    }

    #[track_caller]
    pub fn warn<I>(&self, msg: impl Into<String>, attrs: I)
    where
        I: IntoIterator<Item = Attr>,
    {
        self.log(Level::Warn, msg, attrs);
    }

    #[track_caller]
    pub fn error<I>(&self, msg: impl Into<String>, attrs: I)
    where
        I: IntoIterator<Item = Attr>,
    {
        self.log(Level::Error, msg, attrs);
    }

    /// Log at `Error`, then terminate the process with exit status 1.
    #[track_caller]
    pub fn fatal<I>(&self, msg: impl Into<String>, attrs: I) -> !
    where
        I: IntoIterator<Item = Attr>,
    {
        self.log(Level::Error, msg, attrs);
        std::process::exit(1)
    }

    /// Log at `Error` with normalized `error` and `error_type` attributes
    /// appended after `attrs`.
    #[track_caller]
    pub fn error_err<E, I>(&self, msg: impl Into<String>, err: &E, attrs: I)
    where
        E: StdError + ?Sized,
        I: IntoIterator<Item = Attr>,
    {
        let mut fields: Vec<Attr> = attrs.into_iter().collect();
        fields.extend(error_attrs(err));
        self.log(Level::Error, msg, fields);
    }

    /// [`error_err`](Self::error_err) plus the error's own
    /// [`Loggable::log_attrs`].
    #[track_caller]
    pub fn error_loggable<E, I>(&self, msg: impl Into<String>, err: &E, attrs: I)
    where
        E: StdError + Loggable,
        I: IntoIterator<Item = Attr>,
    {
        let mut fields: Vec<Attr> = attrs.into_iter().collect();
        fields.extend(error_attrs(err));
        fields.extend(err.log_attrs());
        self.log(Level::Error, msg, fields);
    }

    /// Child logger that adds `attrs` to every record.
    pub fn with<I>(&self, attrs: I) -> Logger
    where
        I: IntoIterator<Item = Attr>,
    {
        let attrs: Vec<Attr> = attrs.into_iter().collect();
        if attrs.is_empty() {
            return self.clone();
        }
        Logger::new(self.handler.with_attrs(&attrs))
    }

    /// Child logger that nests subsequent attributes under `name`.
    pub fn with_group(&self, name: &str) -> Logger {
        if name.is_empty() {
            return self.clone();
        }
        Logger::new(self.handler.with_group(name))
    }

    /// Log `"<msg> started"` at `Info` and return a [`Timer`] that logs
    /// `"<msg> completed"` with the elapsed `duration`.
    #[track_caller]
    pub fn timed<I>(&self, msg: &str, attrs: I) -> Timer
    where
        I: IntoIterator<Item = Attr>,
    {
        self.timed_level(Level::Info, msg, attrs)
    }

    #[track_caller]
    pub fn timed_level<I>(&self, level: Level, msg: &str, attrs: I) -> Timer
    where
        I: IntoIterator<Item = Attr>,
    {
        let attrs: Vec<Attr> = attrs.into_iter().collect();
        self.log(level, format!("{} started", msg), attrs.clone());
        Timer {
            logger: self.clone(),
            level,
            msg: format!("{} completed", msg),
            attrs,
            start: Instant::now(),
        }
    }
}

fn error_attrs<E: StdError + ?Sized>(err: &E) -> [Attr; 2] {
    [
        Attr::new("error", Value::Error(err.to_string())),
        Attr::new("error_type", std::any::type_name::<E>()),
    ]
}

/// Pending completion record of a [`Logger::timed`] operation.
#[must_use = "call `finish` to log the completion record"]
pub struct Timer {
    logger: Logger,
    level: Level,
    msg: String,
    attrs: Vec<Attr>,
    start: Instant,
}

impl Timer {
    /// Log the completion record with the start attributes, `extra`, and the
    /// elapsed `duration`.
    #[track_caller]
    pub fn finish<I>(self, extra: I)
    where
        I: IntoIterator<Item = Attr>,
    {
        let duration = self.start.elapsed();
        let mut fields = self.attrs;
        fields.extend(extra);
        fields.push(Attr::new("duration", duration));
        self.logger.log(self.level, self.msg, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatHandler;
    use crate::level::LevelVar;
    use crate::record::attr;
    use crate::sink::BufferSink;
    use std::fmt;

    fn capture(level: Level) -> (Logger, BufferSink) {
        let buf = BufferSink::new();
        let handler = FormatHandler::text(Arc::new(buf.clone()), Arc::new(LevelVar::new(level)));
        (Logger::new(Arc::new(handler)), buf)
    }

    #[derive(Debug)]
    struct DeviceError {
        device: String,
    }

    impl fmt::Display for DeviceError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "device {} unreachable", self.device)
        }
    }

    impl StdError for DeviceError {}

    impl Loggable for DeviceError {
        fn log_attrs(&self) -> Vec<Attr> {
            vec![attr("device_id", self.device.clone())]
        }
    }

    #[test]
    fn debug_suppressed_when_disabled() {
        let (log, buf) = capture(Level::Info);
        log.debug("hello", [attr("n", 1)]);
        assert_eq!(buf.contents(), "");
    }

    #[test]
    fn debug_emits_when_enabled() {
        let (log, buf) = capture(Level::Debug);
        log.debug("hello", [attr("n", 1)]);
        let out = buf.contents();
        assert!(out.contains("level=DEBUG"));
        assert!(out.contains("msg=hello"));
        assert!(out.contains("n=1"));
    }

    #[test]
    fn each_level_emits() {
        let (log, buf) = capture(Level::Debug);
        log.info("hi", [attr("who", "there")]);
        log.warn("careful", [attr("n", 2)]);
        log.error("bad", [attr("thing", true)]);
        let lines = buf.lines();
        assert!(lines[0].contains("level=INFO") && lines[0].contains("who=there"));
        assert!(lines[1].contains("level=WARN"));
        assert!(lines[2].contains("level=ERROR") && lines[2].contains("thing=true"));
    }

    #[test]
    fn with_adds_fields() {
        let (log, buf) = capture(Level::Info);
        log.with([attr("component", "api")])
            .info("request", [attr("method", "GET")]);
        let out = buf.contents();
        assert!(out.contains("component=api"));
        assert!(out.contains("method=GET"));
    }

    #[test]
    fn with_group_scopes_fields() {
        let (log, buf) = capture(Level::Info);
        log.with_group("http").info("request", [attr("status", 200)]);
        assert!(buf.contents().contains("http.status=200"));
    }

    #[test]
    fn error_err_adds_error_fields() {
        let (log, buf) = capture(Level::Info);
        let err = std::io::Error::other("boom");
        log.error_err("failed", &err, [attr("device", "fw1")]);
        let out = buf.contents();
        assert!(out.contains("level=ERROR"));
        assert!(out.contains("msg=failed"));
        assert!(out.contains("error=boom"));
        assert!(out.contains("error_type=std::io::error::Error"));
        assert!(out.contains("device=fw1"));
    }

    #[test]
    fn error_loggable_adds_custom_fields() {
        let (log, buf) = capture(Level::Info);
        let err = DeviceError {
            device: "fw9".to_string(),
        };
        log.error_loggable("unreachable", &err, []);
        let out = buf.contents();
        assert!(out.contains("device_id=fw9"));
        assert!(out.contains("error=\"device fw9 unreachable\""));
        assert!(out.contains("DeviceError"));
    }

    #[test]
    fn timed_emits_start_and_completion() {
        let (log, buf) = capture(Level::Info);
        let timer = log.timed("sync", [attr("job", "nightly")]);
        timer.finish([attr("rows", 10)]);

        let lines = buf.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("msg=\"sync started\""));
        assert!(lines[0].contains("job=nightly"));
        assert!(lines[1].contains("msg=\"sync completed\""));
        assert!(lines[1].contains("job=nightly"));
        assert!(lines[1].contains("rows=10"));
        assert!(lines[1].contains("duration="));
    }

    #[test]
    fn timed_level_respects_level() {
        let (log, buf) = capture(Level::Info);
        log.timed_level(Level::Debug, "quiet", []).finish([]);
        assert_eq!(buf.contents(), "");
    }

    #[test]
    fn records_carry_caller_location() {
        let buf = BufferSink::new();
        let handler = FormatHandler::text(Arc::new(buf.clone()), Arc::new(LevelVar::default()))
            .add_source(true);
        let log = Logger::new(Arc::new(handler));
        log.info("here", []);
        assert!(buf.contents().contains("source=src/logger.rs:"));
    }
}
