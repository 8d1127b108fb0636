use crate::level::Level;
use crate::logger::Logger;
use crate::record::{Attr, LogRecord, Source, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns `tracing` events into
/// [`LogRecord`]s and feeds them through a [`Logger`] chain.
///
/// Events therefore get the same level filtering, redaction, stack capture
/// and sinks as direct calls. `TRACE` maps to `Debug`.
pub struct ChainLayer {
    target: Target,
}

enum Target {
    /// Resolve the process-wide logger on every event so reconfiguration is
    /// picked up.
    Global,
    Fixed(Logger),
}

impl ChainLayer {
    /// Forward to the process-wide logger.
    pub fn global() -> Self {
        Self {
            target: Target::Global,
        }
    }

    /// Forward to a specific logger.
    pub fn for_logger(logger: Logger) -> Self {
        Self {
            target: Target::Fixed(logger),
        }
    }

    fn logger(&self) -> Logger {
        match &self.target {
            Target::Global => crate::controller::logger(),
            Target::Fixed(logger) => logger.clone(),
        }
    }
}

fn map_level(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warn,
        tracing::Level::INFO => Level::Info,
        _ => Level::Debug,
    }
}

impl<S> Layer<S> for ChainLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = map_level(meta.level());
        let logger = self.logger();
        if !logger.enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut record = LogRecord::new(level, visitor.message.unwrap_or_default());
        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            record.source = Some(Source { file, line });
        }
        record.push(Attr::new("target", meta.target()));
        record.extend(visitor.fields);
        logger.log_record(&record);
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: Vec<Attr>,
    message: Option<String>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.push(Attr::new(field.name(), value));
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::Str(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::Uint(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::Float(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::Error(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, Value::Str(format!("{:?}", value)));
        }
    }
}
