use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Synchronous byte destination at the end of a handler chain.
///
/// Implementations must be safe to call from many threads at once; each
/// `write` call carries exactly one encoded record.
pub trait Sink: Send + Sync {
    /// Write one encoded record.
    ///
    /// **Returns**
    /// - `Ok(n)` with the number of bytes accepted.
    /// - `Err(..)` if the underlying device failed. Callers in the chain
    ///   surface this from `Handler::handle`; the logging front-end drops it.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Release the underlying resource.
    ///
    /// Must be idempotent: a second call is a no-op returning `Ok(())`.
    /// Default implementation is a no-op.
    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes records to the process's standard error stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut stderr = io::stderr().lock();
        stderr.write_all(buf)?;
        Ok(buf.len())
    }
}

/// Plain append-only file without rotation.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileSink {
    /// Open (or create) `path` in append mode. Parent directories are not
    /// created.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.file.lock();
        match guard.as_mut() {
            Some(file) => {
                file.write_all(buf)?;
                Ok(buf.len())
            }
            None => Err(closed_error()),
        }
    }

    fn close(&self) -> io::Result<()> {
        match self.file.lock().take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// In-memory sink, mostly for tests and for capturing output of a child
/// logger. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    buf: Arc<Mutex<Vec<u8>>>,
    closes: Arc<AtomicUsize>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    /// Non-empty lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn clear(&self) {
        self.buf.lock().clear();
    }

    /// How many times `close` has been called.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Sink for BufferSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

pub(crate) fn closed_error() -> io::Error {
    io::Error::other("sink is closed")
}
