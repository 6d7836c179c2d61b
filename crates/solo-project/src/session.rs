//! Per-request resources: the temporary project directory, the error sink,
//! and deferred deletion of directories that could not be removed in time.

use std::error::Error as StdError;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::error::{Result, SynthError};

/// Where failures are rendered when the caller asked not to receive them as
/// errors.
pub struct ErrorSink<'a> {
    out: &'a mut dyn Write,
}

impl std::fmt::Debug for ErrorSink<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorSink").finish_non_exhaustive()
    }
}

impl<'a> ErrorSink<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out }
    }

    /// Write `err` and its chain of causes, one per line.
    pub fn report(&mut self, err: &dyn StdError) -> io::Result<()> {
        writeln!(self.out, "error: {err}")?;
        let mut source = err.source();
        while let Some(cause) = source {
            writeln!(self.out, "caused by: {cause}")?;
            source = cause.source();
        }
        self.out.flush()
    }

    fn close(&mut self) {
        if let Err(err) = self.out.flush() {
            tracing::debug!(target: "solo.project", error = %err, "failed to flush error sink");
        }
    }
}

/// Directories whose removal failed, retried by [`PendingCleanup::flush`] at
/// orderly shutdown.
#[derive(Debug, Default)]
pub struct PendingCleanup {
    paths: Mutex<Vec<PathBuf>>,
}

impl PendingCleanup {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide list the CLI flushes before exiting.
    pub fn global() -> Arc<PendingCleanup> {
        static GLOBAL: OnceLock<Arc<PendingCleanup>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(PendingCleanup::new())).clone()
    }

    pub fn defer(&self, path: PathBuf) {
        tracing::debug!(target: "solo.project", path = %path.display(), "deferring removal");
        self.paths.lock().push(path);
    }

    pub fn pending(&self) -> Vec<PathBuf> {
        self.paths.lock().clone()
    }

    /// Remove every deferred directory. Returns how many are gone afterwards;
    /// failures are logged and forgotten.
    pub fn flush(&self) -> usize {
        let paths = std::mem::take(&mut *self.paths.lock());
        let mut removed = 0;
        for path in paths {
            match std::fs::remove_dir_all(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == io::ErrorKind::NotFound => removed += 1,
                Err(err) => tracing::warn!(
                    target: "solo.project",
                    path = %path.display(),
                    error = %err,
                    "failed to remove temporary directory"
                ),
            }
        }
        removed
    }
}

/// One synthesis request's temporary state.
///
/// Owns at most one temporary directory and the error sink. Both are
/// released when the session is closed or dropped, whichever comes first.
#[derive(Debug)]
pub struct SynthesisSession<'a> {
    temp_dir: Option<TempDir>,
    sink: Option<ErrorSink<'a>>,
    pending: Arc<PendingCleanup>,
}

impl<'a> SynthesisSession<'a> {
    pub fn new(sink: Option<ErrorSink<'a>>, pending: Arc<PendingCleanup>) -> Self {
        Self {
            temp_dir: None,
            sink,
            pending,
        }
    }

    /// Create the session's temporary directory. Only one may exist per
    /// session; later calls return the existing one.
    pub fn create_temp_dir(&mut self) -> Result<&Path> {
        let dir = match self.temp_dir.take() {
            Some(dir) => dir,
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("solo-java-")
                    .tempdir()
                    .map_err(|err| SynthError::io(std::env::temp_dir(), err))?;
                tracing::debug!(target: "solo.project", dir = %dir.path().display(), "created temporary project");
                dir
            }
        };
        Ok(self.temp_dir.insert(dir).path())
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Hand `err` to the sink, or give it back when there is none.
    pub fn fail<T>(&mut self, err: SynthError) -> Result<Option<T>> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(err);
        };
        tracing::debug!(target: "solo.project", error = %err, "reporting failure to error sink");
        if let Err(io_err) = sink.report(&err) {
            tracing::warn!(
                target: "solo.project",
                error = %io_err,
                "failed to write to error sink"
            );
        }
        Ok(None)
    }

    /// Release everything now. Never fails: a directory that cannot be
    /// removed is deferred to [`PendingCleanup::flush`].
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            sink.close();
        }
        self.sink = None;

        let Some(dir) = self.temp_dir.take() else {
            return;
        };
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => {
                tracing::debug!(target: "solo.project", dir = %path.display(), "removed temporary project");
            }
            Err(err) => {
                tracing::warn!(
                    target: "solo.project",
                    dir = %path.display(),
                    error = %err,
                    "failed to remove temporary project; deferring"
                );
                self.pending.defer(path);
            }
        }
    }
}

impl Drop for SynthesisSession<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
