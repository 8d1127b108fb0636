use crate::error::HandlerError;
use crate::handler::Handler;
use crate::level::Level;
use crate::record::{insert_at, Attr, LogRecord, Value};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use url::{form_urlencoded, Position, Url};

/// Placeholder written in place of redacted values.
pub const REDACTED: &str = "REDACTED";

/// Query parameters always redacted by [`sanitize_url`], compared
/// case-insensitively.
const SENSITIVE_QUERY_PARAMS: [&str; 4] = ["apikey", "password", "token", "key"];

/// Case-insensitive set of attribute keys whose values must be redacted.
///
/// The set is published as immutable snapshots: writers build a complete new
/// set and swap it in, readers take one snapshot per record and never see a
/// partially applied update.
#[derive(Debug, Default)]
pub struct RedactedKeys {
    current: RwLock<Arc<HashSet<String>>>,
    /// Serializes writers so concurrent `add` calls don't lose each other's keys.
    writer: Mutex<()>,
}

impl RedactedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<HashSet<String>> {
        Arc::clone(&self.current.read())
    }

    /// Add `keys` to the set. Keys already present stay; use
    /// [`clear`](Self::clear) first to start over.
    pub fn set<I>(&self, keys: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.add(keys)
    }

    /// Add `keys` to the set.
    pub fn add<I>(&self, keys: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let _writer = self.writer.lock();
        let mut next = (*self.snapshot()).clone();
        next.extend(normalize(keys));
        self.publish(next);
    }

    pub fn clear(&self) {
        let _writer = self.writer.lock();
        self.publish(HashSet::new());
    }

    /// Sorted copy of the configured keys (lower-cased).
    pub fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.snapshot().iter().cloned().collect();
        keys.sort();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    fn publish(&self, next: HashSet<String>) {
        *self.current.write() = Arc::new(next);
    }
}

fn normalize<I>(keys: I) -> impl Iterator<Item = String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    keys.into_iter().map(|k| k.as_ref().to_lowercase())
}

/// Replaces the value of every attribute whose key is in the shared
/// [`RedactedKeys`] with [`REDACTED`] before passing the record on.
///
/// Matching is case-insensitive and applies inside groups too.
///
/// Attributes bound through `with_attrs` and groups opened through
/// `with_group` are kept here unredacted and resolved per record, so each
/// record is checked against one current snapshot of the key set. The
/// downstream chain receives the merged attributes with groups already
/// nested.
pub struct RedactionHandler {
    next: Arc<dyn Handler>,
    keys: Arc<RedactedKeys>,
    bound: Vec<Attr>,
    groups: Vec<String>,
}

impl RedactionHandler {
    pub fn new(next: Arc<dyn Handler>, keys: Arc<RedactedKeys>) -> Self {
        Self {
            next,
            keys,
            bound: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn derive(&self) -> Self {
        Self {
            next: Arc::clone(&self.next),
            keys: Arc::clone(&self.keys),
            bound: self.bound.clone(),
            groups: self.groups.clone(),
        }
    }
}

impl Handler for RedactionHandler {
    fn enabled(&self, level: Level) -> bool {
        self.next.enabled(level)
    }

    fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
        let keys = self.keys.snapshot();
        if keys.is_empty() && self.bound.is_empty() && self.groups.is_empty() {
            return self.next.handle(record);
        }

        let mut attrs = self.bound.clone();
        insert_at(&mut attrs, &self.groups, record.attrs.clone());
        if !keys.is_empty() {
            attrs = redact_attrs(&attrs, &keys);
        }
        let resolved = LogRecord {
            timestamp: record.timestamp,
            level: record.level,
            message: record.message.clone(),
            attrs,
            source: record.source,
        };
        self.next.handle(&resolved)
    }

    fn with_attrs(&self, attrs: &[Attr]) -> Arc<dyn Handler> {
        let mut next = self.derive();
        insert_at(&mut next.bound, &self.groups, attrs.to_vec());
        Arc::new(next)
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        let mut next = self.derive();
        if !name.is_empty() {
            next.groups.push(name.to_string());
        }
        Arc::new(next)
    }
}

fn redact_attrs(attrs: &[Attr], keys: &HashSet<String>) -> Vec<Attr> {
    attrs
        .iter()
        .map(|a| {
            if keys.contains(&a.key.to_lowercase()) {
                Attr::new(a.key.clone(), REDACTED)
            } else if let Value::Group(children) = &a.value {
                Attr::group(a.key.clone(), redact_attrs(children, keys))
            } else {
                a.clone()
            }
        })
        .collect()
}

/// Render `url` with the values of well-known credential query parameters
/// (`apikey`, `password`, `token`, `key`; any case) replaced by
/// [`REDACTED`]. Query parameters are re-encoded sorted by key, in
/// `application/x-www-form-urlencoded` form (spaces become `+`).
pub fn sanitize_url(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let lower = k.to_lowercase();
            if SENSITIVE_QUERY_PARAMS.contains(&lower.as_str()) {
                (k.into_owned(), REDACTED.to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(&pairs)
        .finish();

    let mut clone = url.clone();
    clone.set_query(if query.is_empty() { None } else { Some(query.as_str()) });
    clone.to_string()
}

/// String form of [`sanitize_url`]. Relative request targets such as
/// `/api?token=x` are accepted; input that cannot be parsed at all yields an
/// empty string so it is never logged verbatim.
pub fn sanitize_url_str(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => sanitize_url(&url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let Ok(base) = Url::parse("http://relative.invalid/") else {
                return String::new();
            };
            match base.join(raw) {
                Ok(joined) => {
                    let sanitized = sanitize_url(&joined);
                    match Url::parse(&sanitized) {
                        Ok(u) => u[Position::BeforePath..].to_string(),
                        Err(_) => String::new(),
                    }
                }
                Err(_) => String::new(),
            }
        }
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatHandler;
    use crate::level::LevelVar;
    use crate::record::attr;
    use crate::sink::BufferSink;
    use std::thread;

    fn chain(keys: &Arc<RedactedKeys>) -> (RedactionHandler, BufferSink) {
        let buf = BufferSink::new();
        let terminal = Arc::new(FormatHandler::text(
            Arc::new(buf.clone()),
            Arc::new(LevelVar::default()),
        ));
        (RedactionHandler::new(terminal, Arc::clone(keys)), buf)
    }

    fn login() -> LogRecord {
        let mut record = LogRecord::new(Level::Info, "login");
        record.push(attr("password", "secret"));
        record.push(attr("user", "admin"));
        record
    }

    #[test]
    fn redacts_matching_keys_case_insensitively() {
        let keys = Arc::new(RedactedKeys::new());
        keys.set(["Password"]);
        let (handler, buf) = chain(&keys);

        handler.handle(&login()).unwrap();
        let out = buf.contents();
        assert!(out.contains("password=REDACTED"));
        assert!(out.contains("user=admin"));
        assert!(!out.contains("secret"));
    }

    #[test]
    fn attribute_order_is_preserved() {
        let keys = Arc::new(RedactedKeys::new());
        keys.set(["password"]);
        let (handler, buf) = chain(&keys);
        handler.handle(&login()).unwrap();
        let out = buf.contents();
        assert!(out.find("password=").unwrap() < out.find("user=").unwrap());
    }

    #[test]
    fn cleared_keys_pass_through() {
        let keys = Arc::new(RedactedKeys::new());
        keys.add(["password"]);
        keys.clear();
        let (handler, buf) = chain(&keys);
        handler.handle(&login()).unwrap();
        assert!(buf.contents().contains("password=secret"));
    }

    #[test]
    fn redaction_is_idempotent() {
        let keys = Arc::new(RedactedKeys::new());
        keys.set(["token"]);
        let snapshot = keys.snapshot();
        let attrs = vec![attr("TOKEN", "abc"), attr("n", 1)];
        let once = redact_attrs(&attrs, &snapshot);
        let twice = redact_attrs(&once, &snapshot);
        assert_eq!(once, twice);
        assert_eq!(once[0].value, Value::from(REDACTED));
    }

    #[test]
    fn redacts_inside_groups_and_bound_attrs() {
        let keys = Arc::new(RedactedKeys::new());
        keys.set(["apikey"]);
        let (handler, buf) = chain(&keys);

        let child = handler.with_attrs(&[attr("ApiKey", "bound-secret")]);
        let mut record = LogRecord::new(Level::Info, "call");
        record.push(Attr::group("req", vec![attr("apikey", "nested-secret")]));
        child.handle(&record).unwrap();

        let out = buf.contents();
        assert!(out.contains("ApiKey=REDACTED"));
        assert!(out.contains("req.apikey=REDACTED"));
        assert!(!out.contains("secret"));
    }

    #[test]
    fn input_record_is_untouched() {
        let keys = Arc::new(RedactedKeys::new());
        keys.set(["password"]);
        let (handler, _buf) = chain(&keys);
        let record = login();
        handler.handle(&record).unwrap();
        assert_eq!(record.attr("password"), Some(&Value::from("secret")));
    }

    #[test]
    fn set_and_add_both_extend() {
        let keys = RedactedKeys::new();
        keys.set(["A", "b"]);
        keys.add(["C"]);
        assert_eq!(keys.list(), vec!["a", "b", "c"]);
        keys.set(["d", "A"]);
        assert_eq!(keys.list(), vec!["a", "b", "c", "d"]);
        keys.clear();
        assert!(keys.is_empty());
    }

    #[test]
    fn bound_attrs_follow_current_key_set() {
        let keys = Arc::new(RedactedKeys::new());
        let (handler, buf) = chain(&keys);
        let child = handler.with_attrs(&[attr("token", "s3cr3t")]);

        child.handle(&LogRecord::new(Level::Info, "before-set")).unwrap();
        keys.set(["token"]);
        child.handle(&LogRecord::new(Level::Info, "after-set")).unwrap();
        keys.clear();
        child.handle(&LogRecord::new(Level::Info, "after-clear")).unwrap();

        let lines = buf.lines();
        assert!(lines[0].contains("token=s3cr3t"));
        assert!(lines[1].contains("token=REDACTED"));
        assert!(!lines[1].contains("s3cr3t"));
        assert!(lines[2].contains("token=s3cr3t"));
    }

    #[test]
    fn bound_attrs_keep_their_group_position() {
        let keys = Arc::new(RedactedKeys::new());
        keys.set(["password"]);
        let (handler, buf) = chain(&keys);
        let child = handler
            .with_attrs(&[attr("svc", "auth")])
            .with_group("req")
            .with_attrs(&[attr("password", "pw")]);

        let mut record = LogRecord::new(Level::Info, "call");
        record.push(attr("id", 7));
        child.handle(&record).unwrap();

        let out = buf.contents();
        assert!(out.contains(" svc=auth"));
        assert!(out.contains("req.password=REDACTED"));
        assert!(out.contains("req.id=7"));
    }

    #[test]
    fn concurrent_adds_are_not_lost() {
        let keys = Arc::new(RedactedKeys::new());
        let handles: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|prefix| {
                let keys = Arc::clone(&keys);
                thread::spawn(move || {
                    for i in 0..100 {
                        keys.add([format!("{}{}", prefix, i)]);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(keys.list().len(), 200);
    }

    #[test]
    fn readers_see_whole_snapshots() {
        let keys = Arc::new(RedactedKeys::new());
        let writer = {
            let keys = Arc::clone(&keys);
            thread::spawn(move || {
                for i in 0..200 {
                    keys.set([format!("x{}", i), format!("y{}", i), format!("z{}", i)]);
                }
            })
        };
        for _ in 0..2000 {
            assert_eq!(keys.snapshot().len() % 3, 0);
        }
        writer.join().unwrap();
        assert_eq!(keys.list().len(), 600);
    }

    #[test]
    fn sanitize_url_redacts_known_params() {
        let url = Url::parse("https://fw/api?apikey=abc123&name=test").unwrap();
        let s = sanitize_url(&url);
        assert!(s.contains("apikey=REDACTED"));
        assert!(s.contains("name=test"));
        assert!(!s.contains("abc123"));
    }

    #[test]
    fn sanitize_url_is_case_insensitive_and_ignores_key_set() {
        let url = Url::parse("https://host/p?Token=t0k&PASSWORD=pw&Key=k&page=2").unwrap();
        let s = sanitize_url(&url);
        assert!(s.contains("Token=REDACTED"));
        assert!(s.contains("PASSWORD=REDACTED"));
        assert!(s.contains("Key=REDACTED"));
        assert!(s.contains("page=2"));
        assert!(!s.contains("t0k"));
    }

    #[test]
    fn sanitize_url_form_encodes_spaces() {
        let url = Url::parse("https://host/search?q=hello%20world&apikey=a%20b").unwrap();
        let s = sanitize_url(&url);
        assert_eq!(s, "https://host/search?apikey=REDACTED&q=hello+world");
    }

    #[test]
    fn sanitize_url_without_query_is_unchanged() {
        let url = Url::parse("https://host/path").unwrap();
        assert_eq!(sanitize_url(&url), "https://host/path");
    }

    #[test]
    fn sanitize_relative_target() {
        assert_eq!(
            sanitize_url_str("/api/v1?token=abc&q=1"),
            "/api/v1?q=1&token=REDACTED"
        );
        assert_eq!(sanitize_url_str("http://[::1"), "");
    }
}
