use crate::sink::Sink;
use std::io::{self, IsTerminal};
use std::sync::Arc;

const COLOR_RESET: &str = "\x1b[0m";
const COLOR_RED: &str = "\x1b[31m";
const COLOR_YELLOW: &str = "\x1b[33m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_GRAY: &str = "\x1b[90m";

const LEVEL_COLORS: [(&str, &str); 4] = [
    ("level=ERROR", COLOR_RED),
    ("level=WARN", COLOR_YELLOW),
    ("level=INFO", COLOR_GREEN),
    ("level=DEBUG", COLOR_GRAY),
];

/// Wraps a text sink and colors the `level=...` tag of each line.
///
/// Lines without a recognised tag (including JSON lines) pass through
/// untouched.
pub struct ColorSink {
    inner: Arc<dyn Sink>,
}

impl ColorSink {
    pub fn new(inner: Arc<dyn Sink>) -> Self {
        Self { inner }
    }
}

impl Sink for ColorSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        match colorize(buf) {
            Some(colored) => {
                self.inner.write(&colored)?;
                Ok(buf.len())
            }
            None => self.inner.write(buf),
        }
    }

    fn close(&self) -> io::Result<()> {
        self.inner.close()
    }
}

fn colorize(line: &[u8]) -> Option<Vec<u8>> {
    let (tag, color) = LEVEL_COLORS
        .iter()
        .find(|(tag, _)| find(line, tag.as_bytes()).is_some())?;
    let at = find(line, tag.as_bytes())?;

    let mut out = Vec::with_capacity(line.len() + color.len() + COLOR_RESET.len());
    out.extend_from_slice(&line[..at]);
    out.extend_from_slice(color.as_bytes());
    out.extend_from_slice(tag.as_bytes());
    out.extend_from_slice(COLOR_RESET.as_bytes());
    out.extend_from_slice(&line[at + tag.len()..]);
    Some(out)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Decide whether console output should carry ANSI colors.
///
/// `NO_COLOR` always wins; otherwise stderr must be a terminal. On Windows
/// the terminal must also advertise ANSI support.
pub fn detect_color() -> bool {
    if env_set("NO_COLOR") {
        return false;
    }
    if !io::stderr().is_terminal() {
        return false;
    }
    if !cfg!(windows) {
        return true;
    }
    env_set("WT_SESSION") || env_set("TERM_PROGRAM") || env_set("ANSICON")
}

fn env_set(key: &str) -> bool {
    std::env::var_os(key).map(|v| !v.is_empty()).unwrap_or(false)
}
