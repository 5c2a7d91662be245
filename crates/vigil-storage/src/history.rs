//! Approval history: snapshot-per-transition, append-only.
//!
//! Every state transition appends a complete [`ApprovalRequest`] snapshot
//! rather than a delta, so replay is "latest snapshot per request wins"
//! and a torn tail line can be skipped without losing earlier state.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use vigil_core::{ApprovalRequest, RequestId, Timestamp};

use crate::error::{StorageError, StorageResult};

/// One append-only history line: a full request snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// When the snapshot was taken.
    pub recorded_at: Timestamp,
    /// The request state after the transition.
    pub request: ApprovalRequest,
}

impl HistoryRecord {
    /// Snapshot a request now.
    #[must_use]
    pub fn snapshot(request: &ApprovalRequest) -> Self {
        Self {
            recorded_at: Timestamp::now(),
            request: request.clone(),
        }
    }
}

/// Append-only store of approval request snapshots.
///
/// Implementations must be thread-safe. Once a terminal snapshot for a
/// request has been appended, further appends for that request are
/// rejected with [`StorageError::AlreadyTerminal`].
pub trait HistoryStore: Send + Sync {
    /// Append a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyTerminal`] for a request whose
    /// history is closed, or an I/O error if the write fails.
    fn append(&self, record: &HistoryRecord) -> StorageResult<()>;

    /// Reconstruct the latest snapshot of every request, in first-seen
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn replay(&self) -> StorageResult<Vec<ApprovalRequest>>;

    /// Number of snapshots appended so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn count(&self) -> StorageResult<usize>;
}

fn fold_latest(records: impl IntoIterator<Item = HistoryRecord>) -> Vec<ApprovalRequest> {
    let mut order: Vec<RequestId> = Vec::new();
    let mut latest: HashMap<RequestId, ApprovalRequest> = HashMap::new();
    for record in records {
        let id = record.request.id.clone();
        if !latest.contains_key(&id) {
            order.push(id.clone());
        }
        latest.insert(id, record.request);
    }
    order.into_iter().filter_map(|id| latest.remove(&id)).collect()
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    records: Vec<HistoryRecord>,
    terminal: HashSet<RequestId>,
}

/// Volatile history store for tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryHistoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryHistoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, record: &HistoryRecord) -> StorageResult<()> {
        let mut inner = self.lock();
        let id = &record.request.id;
        if inner.terminal.contains(id) {
            return Err(StorageError::AlreadyTerminal { id: id.clone() });
        }
        if record.request.status.is_terminal() {
            inner.terminal.insert(id.clone());
        }
        inner.records.push(record.clone());
        Ok(())
    }

    fn replay(&self) -> StorageResult<Vec<ApprovalRequest>> {
        Ok(fold_latest(self.lock().records.iter().cloned()))
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.lock().records.len())
    }
}

// ---------------------------------------------------------------------------
// JSONL store
// ---------------------------------------------------------------------------

struct JsonlInner {
    file: File,
    terminal: HashSet<RequestId>,
    count: usize,
}

/// Durable history store: one JSON snapshot per line, append-only.
pub struct JsonlHistoryStore {
    path: PathBuf,
    inner: Mutex<JsonlInner>,
}

impl JsonlHistoryStore {
    /// Open (or create) the history file and index its terminal requests.
    ///
    /// A torn final line, from a crash mid-write, is skipped with a
    /// warning; everything before it is intact because snapshots are
    /// self-contained.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut terminal = HashSet::new();
        let mut count = 0;
        if path.exists() {
            for (line_no, line) in read_lines(&path)?.into_iter().enumerate() {
                match serde_json::from_str::<HistoryRecord>(&line) {
                    Ok(record) => {
                        count += 1;
                        if record.request.status.is_terminal() {
                            terminal.insert(record.request.id);
                        }
                    },
                    Err(err) => {
                        tracing::warn!(
                            path = %path.display(),
                            line = line_no + 1,
                            error = %err,
                            "skipping unparseable history line"
                        );
                    },
                }
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::Io {
                path: path.clone(),
                source: e,
            })?;
        tracing::debug!(path = %path.display(), count, "opened history store");
        Ok(Self {
            path,
            inner: Mutex::new(JsonlInner {
                file,
                terminal,
                count,
            }),
        })
    }

    /// The file this store appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JsonlInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl HistoryStore for JsonlHistoryStore {
    fn append(&self, record: &HistoryRecord) -> StorageResult<()> {
        let line =
            serde_json::to_string(record).map_err(|e| StorageError::Serialize { source: e })?;
        let mut inner = self.lock();
        let id = &record.request.id;
        if inner.terminal.contains(id) {
            return Err(StorageError::AlreadyTerminal { id: id.clone() });
        }
        writeln!(inner.file, "{line}").map_err(|e| StorageError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        inner.file.flush().map_err(|e| StorageError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        if record.request.status.is_terminal() {
            inner.terminal.insert(id.clone());
        }
        inner.count += 1;
        Ok(())
    }

    fn replay(&self) -> StorageResult<Vec<ApprovalRequest>> {
        // Take the lock so a concurrent append cannot leave a half line.
        let _guard = self.lock();
        let mut records = Vec::new();
        for (line_no, line) in read_lines(&self.path)?.into_iter().enumerate() {
            match serde_json::from_str::<HistoryRecord>(&line) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = line_no + 1,
                        error = %err,
                        "skipping unparseable history line"
                    );
                },
            }
        }
        Ok(fold_latest(records))
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.lock().count)
    }
}

fn read_lines(path: &Path) -> StorageResult<Vec<String>> {
    let file = File::open(path).map_err(|e| StorageError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| StorageError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}
