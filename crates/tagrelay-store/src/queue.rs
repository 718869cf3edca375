//! # Queue Store
//!
//! Two plain-text files hold every record that has not been confirmed
//! delivered.
//!
//! ## Rotation Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Queue File Lifecycle                              │
//! │                                                                         │
//! │  enqueue()            begin_drain()          finish_drain()             │
//! │     │                      │                       │                    │
//! │     ▼                      ▼                       ▼                    │
//! │  queue.txt  ──── rename(queue.txt, sending.txt) ──► remove(sending.txt) │
//! │  (active)         ▲ single atomic step             (after every line   │
//! │                   │ + directory fsync               delivered or        │
//! │                   │                                 re-enqueued)        │
//! │                                                                         │
//! │  CRASH WINDOWS:                                                        │
//! │  • before rename   → all records still in queue.txt                    │
//! │  • after rename    → all records in sending.txt, queue.txt fresh       │
//! │  • mid drain       → sending.txt kept, drained again in full           │
//! │                      (at-least-once, duplicates acceptable)            │
//! │                                                                         │
//! │  RECOVERY:                                                             │
//! │  A sending.txt found by begin_drain() is opened directly. It is never  │
//! │  renamed again, so a queue.txt written after a restart is not touched. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use tagrelay_core::Record;

use crate::error::{StoreError, StoreResult};
use crate::fsync::{sync_dir, sync_file};

// =============================================================================
// Constants
// =============================================================================

/// File name of the active (append target) log.
pub const ACTIVE_LOG: &str = "queue.txt";

/// File name of the in-flight (being drained) log.
pub const IN_FLIGHT_LOG: &str = "sending.txt";

// =============================================================================
// Queue Store
// =============================================================================

/// Durable queue of undelivered records.
///
/// Single-writer: the control loop never interleaves an enqueue from a scan
/// with a drain step, so no locking is done here.
#[derive(Debug, Clone)]
pub struct QueueStore {
    /// Directory holding both logs.
    dir: PathBuf,

    /// `<dir>/queue.txt`
    active: PathBuf,

    /// `<dir>/sending.txt`
    in_flight: PathBuf,
}

impl QueueStore {
    /// Opens the store rooted at `dir`, creating the directory if needed.
    ///
    /// Nothing is moved or deleted here; a leftover in-flight log from an
    /// interrupted drain is left for the next drain pass.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let store = QueueStore {
            active: dir.join(ACTIVE_LOG),
            in_flight: dir.join(IN_FLIGHT_LOG),
            dir,
        };

        if store.in_flight.exists() {
            warn!(
                path = ?store.in_flight,
                "Found in-flight log from an interrupted drain, it will be drained again"
            );
        }
        debug!(
            dir = ?store.dir,
            active_bytes = file_len(&store.active),
            in_flight = store.in_flight.exists(),
            "Queue store opened"
        );

        Ok(store)
    }

    /// Directory holding the logs.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the active log.
    pub fn active_path(&self) -> &Path {
        &self.active
    }

    /// Path of the in-flight log.
    pub fn in_flight_path(&self) -> &Path {
        &self.in_flight
    }

    /// Appends one record to the active log and flushes it to the medium.
    ///
    /// The file is opened and closed on every call; nothing is buffered in
    /// memory between calls. A torn final line left by power loss is cut
    /// off first, so the record always starts a line of its own.
    pub fn enqueue(&self, record: &Record) -> StoreResult<()> {
        let created = !self.active.exists();

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.active)
            .map_err(|source| StoreError::Open {
                path: self.active.clone(),
                source,
            })?;

        let append_err = |source| StoreError::Append {
            path: self.active.clone(),
            source,
        };

        let dropped = cut_torn_tail(&mut file).map_err(append_err)?;
        if dropped > 0 {
            warn!(path = ?self.active, bytes = dropped, "Dropped torn line at end of queue");
        }

        // One write call per line keeps a torn write confined to this line.
        let line = format!("{record}\n");
        file.write_all(line.as_bytes())
            .and_then(|()| sync_file(&file))
            .map_err(append_err)?;

        if created {
            sync_dir(&self.dir).map_err(|source| StoreError::Append {
                path: self.dir.clone(),
                source,
            })?;
        }

        debug!(record = %record, path = ?self.active, "Record queued");
        Ok(())
    }

    /// True if there is anything to drain.
    pub fn has_pending(&self) -> bool {
        self.in_flight.exists() || file_len(&self.active) > 0
    }

    /// Starts a drain pass.
    ///
    /// ## Returns
    /// - `None` if there is nothing pending
    /// - A handle over the leftover in-flight log if one exists
    /// - Otherwise a handle over the active log, freshly rotated to the
    ///   in-flight name
    pub fn begin_drain(&self) -> StoreResult<Option<DrainHandle>> {
        if self.in_flight.exists() {
            info!(path = ?self.in_flight, "Resuming interrupted drain");
            return DrainHandle::open(&self.in_flight, true).map(Some);
        }

        if file_len(&self.active) == 0 {
            return Ok(None);
        }

        fs::rename(&self.active, &self.in_flight)
            .and_then(|()| sync_dir(&self.dir))
            .map_err(|source| StoreError::Rotate {
                path: self.active.clone(),
                source,
            })?;

        debug!(from = ?self.active, to = ?self.in_flight, "Active log rotated");
        DrainHandle::open(&self.in_flight, false).map(Some)
    }

    /// Completes a drain pass by deleting the in-flight log.
    ///
    /// Only call this once every record read from `handle` has been either
    /// delivered or re-enqueued.
    pub fn finish_drain(&self, handle: DrainHandle) -> StoreResult<()> {
        let path = handle.path.clone();
        drop(handle);

        fs::remove_file(&path)
            .and_then(|()| sync_dir(&self.dir))
            .map_err(|source| StoreError::Remove { path, source })?;

        debug!(path = ?self.in_flight, "Drain finished");
        Ok(())
    }

    /// Counts parseable records across both logs.
    ///
    /// Diagnostic only; reads both files in full.
    pub fn pending_records(&self) -> StoreResult<usize> {
        let mut total = 0;
        for path in [&self.in_flight, &self.active] {
            if !path.exists() {
                continue;
            }
            let mut handle = DrainHandle::open(path, false)?;
            while handle.next_line()?.is_some() {
                total += 1;
            }
        }
        Ok(total)
    }
}

/// How far back from the end a torn line is searched for.
const TAIL_SCAN: u64 = 4096;

/// Truncates `file` back to its last complete line.
///
/// Returns the number of bytes removed. A fragment longer than the scan
/// window cannot be a record; it is terminated in place instead and later
/// skipped as unreadable.
fn cut_torn_tail(file: &mut File) -> io::Result<u64> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(0);
    }

    let start = len.saturating_sub(TAIL_SCAN);
    file.seek(SeekFrom::Start(start))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)?;

    if tail.last() == Some(&b'\n') {
        return Ok(0);
    }

    match tail.iter().rposition(|&b| b == b'\n') {
        Some(pos) => {
            let keep = start + pos as u64 + 1;
            file.set_len(keep)?;
            Ok(len - keep)
        }
        None if start == 0 => {
            file.set_len(0)?;
            Ok(len)
        }
        None => {
            file.write_all(b"\n")?;
            Ok(0)
        }
    }
}

/// Size of a file, treating a missing or unreadable file as empty.
fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

// =============================================================================
// Drain Handle
// =============================================================================

/// Line-by-line reader over the in-flight log.
#[derive(Debug)]
pub struct DrainHandle {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    line_no: usize,
    skipped: usize,
    resumed: bool,
}

impl DrainHandle {
    fn open(path: &Path, resumed: bool) -> StoreResult<Self> {
        let file = File::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(DrainHandle {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            buf: Vec::new(),
            line_no: 0,
            skipped: 0,
            resumed,
        })
    }

    /// Reads the next record, skipping blank lines.
    ///
    /// Lines that are not valid records (typically a write torn by power
    /// loss) are logged and skipped.
    pub fn next_line(&mut self) -> StoreResult<Option<Record>> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .map_err(|source| StoreError::Read {
                    path: self.path.clone(),
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = String::from_utf8_lossy(&self.buf);
            if line.trim().is_empty() {
                continue;
            }

            // Every enqueue ends its line; an unterminated one was torn.
            if self.buf.last() != Some(&b'\n') {
                warn!(
                    path = ?self.path,
                    line = self.line_no,
                    "Skipping torn final queue line"
                );
                self.skipped += 1;
                continue;
            }

            match line.parse::<Record>() {
                Ok(record) => return Ok(Some(record)),
                Err(e) => {
                    warn!(
                        path = ?self.path,
                        line = self.line_no,
                        error = %e,
                        "Skipping unreadable queue line"
                    );
                    self.skipped += 1;
                }
            }
        }
    }

    /// Number of unreadable lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// True if this pass picked up a log left by an interrupted drain.
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }
}

// =============================================================================
// Tests
// =============================================================================
