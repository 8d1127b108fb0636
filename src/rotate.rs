use crate::error::{Error, Result};
use crate::sink::{closed_error, open_append, Sink};
use chrono::Utc;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Timestamp layout of backup suffixes. Fixed width, so lexicographic order
/// of backup names is chronological order.
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Size-bounded append-only log file.
///
/// When a write would push the active file past `max_size` bytes, the file
/// is renamed to `<path>.<YYYYMMDDThhmmss>` and a fresh file is opened at
/// `path` before the write goes through. After each successful rotation the
/// oldest backups beyond `max_backups` are deleted.
///
/// - `max_size == 0` disables rotation.
/// - `max_backups == 0` keeps every backup.
///
/// Backups created within the same second get a zero-padded counter suffix
/// (`<path>.<ts>.001`, ...) instead of overwriting each other.
pub struct RotatingWriter {
    path: PathBuf,
    max_size: u64,
    max_backups: usize,
    state: Mutex<RotatorState>,
    /// Successful rotations since construction.
    rotations: AtomicU64,
    /// Rotations that failed to rename or reopen. Never surfaced to writers.
    rotation_failures: AtomicU64,
}

struct RotatorState {
    /// `None` after `close` or after a failed reopen; only `closed` makes
    /// that permanent.
    file: Option<File>,
    /// Bytes written to `file` since it was opened or last rotated.
    size: u64,
    closed: bool,
}

impl RotatingWriter {
    /// Create parent directories, open `path` for appending and pick up the
    /// current file size so restarts keep rotation accounting.
    pub fn new(path: impl Into<PathBuf>, max_size: u64, max_backups: usize) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let open_err = |source| Error::OpenFile {
            path: path.clone(),
            source,
        };
        let file = open_append(&path).map_err(open_err)?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            path,
            max_size,
            max_backups,
            state: Mutex::new(RotatorState {
                file: Some(file),
                size,
                closed: false,
            }),
            rotations: AtomicU64::new(0),
            rotation_failures: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes accounted to the active file.
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    pub fn rotation_failures(&self) -> u64 {
        self.rotation_failures.load(Ordering::Relaxed)
    }

    /// Existing backup files, oldest first.
    pub fn backups(&self) -> Vec<PathBuf> {
        list_backups(&self.path)
    }

    /// Reopen `path` after an earlier rename or reopen failure left the
    /// writer without a handle.
    fn reopen(&self, state: &mut RotatorState) -> io::Result<()> {
        let file = open_append(&self.path)?;
        state.size = file.metadata().map(|m| m.len()).unwrap_or(0);
        state.file = Some(file);
        Ok(())
    }

    fn rotate(&self, state: &mut RotatorState) -> io::Result<()> {
        if let Some(mut file) = state.file.take() {
            let _ = file.flush();
        }

        let backup = next_backup_path(&self.path);
        if let Err(rename_err) = fs::rename(&self.path, &backup) {
            // Keep writing to whatever is at `path` now.
            self.reopen(state)?;
            return Err(rename_err);
        }

        state.file = Some(open_append(&self.path)?);
        state.size = 0;

        if self.max_backups > 0 {
            prune_backups(&self.path, self.max_backups);
        }

        Ok(())
    }
}

impl Sink for RotatingWriter {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(closed_error());
        }
        if state.file.is_none() {
            self.reopen(state)?;
        }

        if self.max_size > 0 && state.size + buf.len() as u64 > self.max_size {
            match self.rotate(state) {
                Ok(()) => self.rotations.fetch_add(1, Ordering::Relaxed),
                Err(_) => self.rotation_failures.fetch_add(1, Ordering::Relaxed),
            };
            if state.file.is_none() {
                self.reopen(state)?;
            }
        }

        let file = state.file.as_mut().ok_or_else(closed_error)?;
        file.write_all(buf)?;
        state.size += buf.len() as u64;
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.closed = true;
        match state.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for RotatingWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingWriter")
            .field("path", &self.path)
            .field("max_size", &self.max_size)
            .field("max_backups", &self.max_backups)
            .field("rotations", &self.rotations())
            .finish()
    }
}

fn next_backup_path(path: &Path) -> PathBuf {
    let stamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
    let base = format!("{}.{}", path.display(), stamp);

    let mut candidate = PathBuf::from(&base);
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{}.{:03}", base, counter));
        counter += 1;
    }
    candidate
}

fn backup_prefix(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| format!("{}.", n))
}

fn log_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn list_backups(path: &Path) -> Vec<PathBuf> {
    let Some(prefix) = backup_prefix(path) else {
        return Vec::new();
    };
    let Ok(entries) = fs::read_dir(log_dir(path)) else {
        return Vec::new();
    };

    let mut backups: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with(&prefix))
                .unwrap_or(false)
        })
        .map(|e| e.path())
        .collect();
    backups.sort();
    backups
}

fn prune_backups(path: &Path, keep: usize) {
    let backups = list_backups(path);
    if backups.len() <= keep {
        return;
    }
    let excess = backups.len() - keep;
    for old in &backups[..excess] {
        let _ = fs::remove_file(old);
    }
}
