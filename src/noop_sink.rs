use crate::sink::Sink;
use std::io;

/// A sink that simply drops all bytes.
///
/// Useful for measuring the overhead of the handler chain itself without
/// any I/O, and for tests that don't care about output.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl Sink for NoopSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
}
