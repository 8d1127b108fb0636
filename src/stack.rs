use crate::error::HandlerError;
use crate::handler::Handler;
use crate::level::Level;
use crate::record::{Attr, LogRecord};
use std::backtrace::Backtrace;
use std::sync::Arc;

/// Default cap on the size of an attached stack trace.
pub const DEFAULT_STACK_MAX_BYTES: usize = 64 * 1024;

/// Attaches a `stack` attribute with the current call stack to every record
/// at or above `level`, truncated to `max_bytes`.
pub struct StackHandler {
    next: Arc<dyn Handler>,
    level: Level,
    max_bytes: usize,
}

impl StackHandler {
    /// Wrap `next`, or return `next` itself when `level` is `None`.
    pub fn wrap(next: Arc<dyn Handler>, level: Option<Level>) -> Arc<dyn Handler> {
        Self::wrap_with_max_bytes(next, level, DEFAULT_STACK_MAX_BYTES)
    }

    /// Like [`wrap`](Self::wrap) with an explicit size cap. A zero cap falls
    /// back to [`DEFAULT_STACK_MAX_BYTES`].
    pub fn wrap_with_max_bytes(
        next: Arc<dyn Handler>,
        level: Option<Level>,
        max_bytes: usize,
    ) -> Arc<dyn Handler> {
        let Some(level) = level else {
            return next;
        };
        let max_bytes = if max_bytes == 0 {
            DEFAULT_STACK_MAX_BYTES
        } else {
            max_bytes
        };
        Arc::new(Self {
            next,
            level,
            max_bytes,
        })
    }

    fn capture(&self) -> String {
        let mut stack = Backtrace::force_capture().to_string();
        truncate_at_char_boundary(&mut stack, self.max_bytes);
        stack
    }
}

impl Handler for StackHandler {
    fn enabled(&self, level: Level) -> bool {
        self.next.enabled(level)
    }

    fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
        if record.level < self.level {
            return self.next.handle(record);
        }
        let mut augmented = record.clone();
        augmented.push(Attr::new("stack", self.capture()));
        self.next.handle(&augmented)
    }

    fn with_attrs(&self, attrs: &[Attr]) -> Arc<dyn Handler> {
        Self::wrap_with_max_bytes(self.next.with_attrs(attrs), Some(self.level), self.max_bytes)
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        Self::wrap_with_max_bytes(self.next.with_group(name), Some(self.level), self.max_bytes)
    }
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatHandler;
    use crate::level::LevelVar;
    use crate::record::Value;
    use crate::sink::BufferSink;
    use parking_lot::Mutex;

    /// Keeps every record it receives.
    #[derive(Default)]
    struct Capture {
        records: Mutex<Vec<LogRecord>>,
    }

    impl Handler for Capture {
        fn enabled(&self, _level: Level) -> bool {
            true
        }

        fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
            self.records.lock().push(record.clone());
            Ok(())
        }

        fn with_attrs(&self, _attrs: &[Attr]) -> Arc<dyn Handler> {
            Arc::new(Capture::default())
        }

        fn with_group(&self, _name: &str) -> Arc<dyn Handler> {
            Arc::new(Capture::default())
        }
    }

    #[test]
    fn unset_level_returns_child_itself() {
        let child: Arc<dyn Handler> = Arc::new(Capture::default());
        let wrapped = StackHandler::wrap(Arc::clone(&child), None);
        assert!(Arc::ptr_eq(&wrapped, &child));
    }

    #[test]
    fn attaches_stack_at_or_above_threshold() {
        let capture = Arc::new(Capture::default());
        let handler = StackHandler::wrap(capture.clone(), Some(Level::Warn));

        handler.handle(&LogRecord::new(Level::Info, "calm")).unwrap();
        handler.handle(&LogRecord::new(Level::Warn, "uh oh")).unwrap();
        handler.handle(&LogRecord::new(Level::Error, "boom")).unwrap();

        let records = capture.records.lock();
        assert!(records[0].attr("stack").is_none());
        assert!(matches!(records[1].attr("stack"), Some(Value::Str(s)) if !s.is_empty()));
        assert!(records[2].attr("stack").is_some());
    }

    #[test]
    fn stack_is_capped() {
        let capture = Arc::new(Capture::default());
        let handler = StackHandler::wrap_with_max_bytes(capture.clone(), Some(Level::Error), 32);
        handler.handle(&LogRecord::new(Level::Error, "boom")).unwrap();

        let records = capture.records.lock();
        let stack = records[0].attr("stack").and_then(Value::as_str).unwrap();
        assert!(stack.len() <= 32);
    }

    #[test]
    fn original_record_is_not_modified() {
        let capture = Arc::new(Capture::default());
        let handler = StackHandler::wrap(capture, Some(Level::Error));
        let record = LogRecord::new(Level::Error, "boom");
        handler.handle(&record).unwrap();
        assert!(record.attrs.is_empty());
    }

    #[test]
    fn derived_handlers_keep_stack_attachment() {
        let buf = BufferSink::new();
        let base: Arc<dyn Handler> = Arc::new(FormatHandler::text(
            Arc::new(buf.clone()),
            Arc::new(LevelVar::default()),
        ));
        let handler = StackHandler::wrap(base, Some(Level::Error))
            .with_attrs(&[Attr::new("device", "fw1")])
            .with_group("g");
        handler.handle(&LogRecord::new(Level::Error, "boom")).unwrap();
        let out = buf.contents();
        assert!(out.contains("device=fw1"));
        assert!(out.contains("g.stack="));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut s = "aé".repeat(10);
        truncate_at_char_boundary(&mut s, 4);
        assert_eq!(s, "aéa");
    }
}
