use crate::level::Level;
use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::panic::Location;
use std::time::Duration;

/// A single structured log event travelling through the handler chain.
///
/// Handlers never mutate a record they were given; stages that add or
/// rewrite attributes clone it first, so upstream stages never observe
/// downstream changes.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub attrs: Vec<Attr>,
    pub source: Option<Source>,
}

impl LogRecord {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            attrs: Vec::new(),
            source: None,
        }
    }

    pub fn with_source(mut self, location: &'static Location<'static>) -> Self {
        self.source = Some(Source::from(location));
        self
    }

    pub fn push(&mut self, attr: Attr) {
        self.attrs.push(attr);
    }

    pub fn extend<I>(&mut self, attrs: I)
    where
        I: IntoIterator<Item = Attr>,
    {
        self.attrs.extend(attrs);
    }

    /// First attribute with the given key, if any.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.iter().find(|a| a.key == key).map(|a| &a.value)
    }
}

/// Call site of the logging call that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub file: &'static str,
    pub line: u32,
}

impl From<&'static Location<'static>> for Source {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Key/value attribute attached to a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Attribute whose value is a named group of nested attributes.
    pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Self {
        Self {
            key: key.into(),
            value: Value::Group(attrs),
        }
    }
}

/// Shorthand for [`Attr::new`].
pub fn attr(key: impl Into<String>, value: impl Into<Value>) -> Attr {
    Attr::new(key, value)
}

/// Append `attrs` under the nested group `path`, merging into groups that
/// already exist at each level. Empty groups are never created.
pub(crate) fn insert_at(target: &mut Vec<Attr>, path: &[String], attrs: Vec<Attr>) {
    if attrs.is_empty() {
        return;
    }
    let Some((head, rest)) = path.split_first() else {
        target.extend(attrs);
        return;
    };

    let existing = target
        .iter()
        .position(|a| a.key == *head && matches!(a.value, Value::Group(_)));
    let idx = match existing {
        Some(idx) => idx,
        None => {
            target.push(Attr::group(head.clone(), Vec::new()));
            target.len() - 1
        }
    };
    if let Value::Group(children) = &mut target[idx].value {
        insert_at(children, rest, attrs);
    }
}

/// Attribute value. Values are not validated; encoders stringify them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Duration(Duration),
    /// Display text of an error.
    Error(String),
    /// Arbitrary structured payload.
    Any(serde_json::Value),
    Group(Vec<Attr>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) | Value::Error(s) => f.write_str(s),
            Value::Int(v) => write!(f, "{}", v),
            Value::Uint(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Duration(d) => write!(f, "{:?}", d),
            Value::Any(v) => write!(f, "{}", v),
            Value::Group(attrs) => {
                f.write_str("[")?;
                for (i, a) in attrs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}={}", a.key, a.value)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Str(s) | Value::Error(s) => serializer.serialize_str(s),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Uint(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            // nanoseconds, matching how durations are usually ingested
            Value::Duration(d) => serializer.serialize_u128(d.as_nanos()),
            Value::Any(v) => v.serialize(serializer),
            Value::Group(attrs) => {
                let mut map = serializer.serialize_map(Some(attrs.len()))?;
                for a in attrs {
                    map.serialize_entry(&a.key, &a.value)?;
                }
                map.end()
            }
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint(v as u64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Uint(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Any(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_lookup_returns_first_match() {
        let mut record = LogRecord::new(Level::Info, "hello");
        record.push(attr("user", "alice"));
        record.push(attr("user", "bob"));
        assert_eq!(record.attr("user").and_then(Value::as_str), Some("alice"));
        assert!(record.attr("missing").is_none());
    }

    #[test]
    fn clone_does_not_share_attrs() {
        let mut original = LogRecord::new(Level::Warn, "x");
        original.push(attr("n", 1));
        let mut copy = original.clone();
        copy.push(attr("stack", "..."));
        assert_eq!(original.attrs.len(), 1);
        assert_eq!(copy.attrs.len(), 2);
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(Duration::from_millis(1500)).to_string(), "1.5s");
        let group = Value::Group(vec![attr("a", 1), attr("b", "x")]);
        assert_eq!(group.to_string(), "[a=1 b=x]");
    }

    #[test]
    fn group_serializes_as_object() {
        let group = Value::Group(vec![attr("id", 7u64), attr("ok", false)]);
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json, serde_json::json!({"id": 7, "ok": false}));
    }

    #[test]
    fn source_from_caller_location() {
        let record = LogRecord::new(Level::Info, "x").with_source(Location::caller());
        let source = record.source.unwrap();
        assert!(source.file.ends_with("record.rs"));
        assert!(source.line > 0);
    }
}
