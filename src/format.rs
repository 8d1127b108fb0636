use crate::error::HandlerError;
use crate::handler::Handler;
use crate::level::{Level, LevelVar};
use crate::record::{insert_at, Attr, LogRecord, Value};
use crate::sink::Sink;
use chrono::SecondsFormat;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt::Write as _;
use std::sync::Arc;

/// Line encoding used by a [`FormatHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `time=... level=INFO msg=... key=value`
    Text,
    /// One JSON object per line.
    Json,
}

/// Terminal stage of a chain: filters by level, encodes one line per record
/// and hands it to a [`Sink`] in a single `write` call.
#[derive(Clone)]
pub struct FormatHandler {
    sink: Arc<dyn Sink>,
    format: Format,
    level: Arc<LevelVar>,
    add_source: bool,
    /// Attributes bound through `with_attrs`, already nested under the
    /// groups that were open when they were bound.
    bound: Vec<Attr>,
    /// Currently open group path.
    groups: Vec<String>,
}

impl FormatHandler {
    pub fn new(sink: Arc<dyn Sink>, format: Format, level: Arc<LevelVar>) -> Self {
        Self {
            sink,
            format,
            level,
            add_source: false,
            bound: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn text(sink: Arc<dyn Sink>, level: Arc<LevelVar>) -> Self {
        Self::new(sink, Format::Text, level)
    }

    pub fn json(sink: Arc<dyn Sink>, level: Arc<LevelVar>) -> Self {
        Self::new(sink, Format::Json, level)
    }

    /// Emit the call site of each record as `source`.
    pub fn add_source(mut self, enabled: bool) -> Self {
        self.add_source = enabled;
        self
    }

    fn collect_attrs(&self, record: &LogRecord) -> Vec<Attr> {
        let mut attrs = self.bound.clone();
        insert_at(&mut attrs, &self.groups, record.attrs.clone());
        attrs
    }

    fn encode(&self, record: &LogRecord) -> Result<Vec<u8>, HandlerError> {
        let attrs = self.collect_attrs(record);
        let mut line = match self.format {
            Format::Text => encode_text(record, &attrs, self.add_source).into_bytes(),
            Format::Json => serde_json::to_vec(&JsonLine {
                record,
                attrs: &attrs,
                add_source: self.add_source,
            })?,
        };
        line.push(b'\n');
        Ok(line)
    }
}

impl Handler for FormatHandler {
    fn enabled(&self, level: Level) -> bool {
        self.level.allows(level)
    }

    fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
        if !self.enabled(record.level) {
            return Ok(());
        }
        let line = self.encode(record)?;
        self.sink.write(&line)?;
        Ok(())
    }

    fn with_attrs(&self, attrs: &[Attr]) -> Arc<dyn Handler> {
        let mut next = self.clone();
        insert_at(&mut next.bound, &self.groups, attrs.to_vec());
        Arc::new(next)
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        let mut next = self.clone();
        if !name.is_empty() {
            next.groups.push(name.to_string());
        }
        Arc::new(next)
    }
}

fn encode_text(record: &LogRecord, attrs: &[Attr], add_source: bool) -> String {
    let mut out = String::with_capacity(128);
    let time = record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
    let _ = write!(out, "time={} level={}", time, record.level);
    if add_source {
        if let Some(source) = &record.source {
            let _ = write!(out, " source={}", source);
        }
    }
    out.push_str(" msg=");
    push_text_value(&mut out, &record.message);
    for a in attrs {
        push_text_attr(&mut out, "", a);
    }
    out
}

fn push_text_attr(out: &mut String, prefix: &str, a: &Attr) {
    match &a.value {
        Value::Group(children) => {
            let nested = format!("{}{}.", prefix, a.key);
            for child in children {
                push_text_attr(out, &nested, child);
            }
        }
        value => {
            let _ = write!(out, " {}{}=", prefix, a.key);
            push_text_value(out, &value.to_string());
        }
    }
}

fn push_text_value(out: &mut String, value: &str) {
    if needs_quoting(value) {
        let _ = write!(out, "{:?}", value);
    } else {
        out.push_str(value);
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '=' || c == '"' || c.is_control())
}

struct JsonLine<'a> {
    record: &'a LogRecord,
    attrs: &'a [Attr],
    add_source: bool,
}

impl Serialize for JsonLine<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(
            "time",
            &self
                .record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        )?;
        map.serialize_entry("level", self.record.level.as_str())?;
        if self.add_source {
            if let Some(source) = &self.record.source {
                map.serialize_entry(
                    "source",
                    &serde_json::json!({ "file": source.file, "line": source.line }),
                )?;
            }
        }
        map.serialize_entry("msg", &self.record.message)?;
        for a in self.attrs {
            map.serialize_entry(&a.key, &a.value)?;
        }
        map.end()
    }
}
