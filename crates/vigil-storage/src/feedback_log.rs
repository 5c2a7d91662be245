//! Feedback record log: the raw input to the learning cycle.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use vigil_core::FeedbackRecord;

use crate::error::{StorageError, StorageResult};

/// Append-only log of decision feedback.
///
/// Unlike history, feedback has no per-request lifecycle; every record
/// is kept forever and the learning cycle re-aggregates from scratch.
pub trait FeedbackLog: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&self, record: &FeedbackRecord) -> StorageResult<()>;

    /// All records, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self) -> StorageResult<Vec<FeedbackRecord>>;
}

/// Volatile feedback log for tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryFeedbackLog {
    records: Mutex<Vec<FeedbackRecord>>,
}

impl MemoryFeedbackLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedbackLog for MemoryFeedbackLog {
    fn append(&self, record: &FeedbackRecord) -> StorageResult<()> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn load(&self) -> StorageResult<Vec<FeedbackRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }
}

/// Durable feedback log: one JSON record per line, append-only.
pub struct JsonlFeedbackLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlFeedbackLog {
    /// Open (or create) the feedback file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::Io {
                path: path.clone(),
                source: e,
            })?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// The file this log appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeedbackLog for JsonlFeedbackLog {
    fn append(&self, record: &FeedbackRecord) -> StorageResult<()> {
        let line =
            serde_json::to_string(record).map_err(|e| StorageError::Serialize { source: e })?;
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(file, "{line}").map_err(|e| StorageError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        file.flush().map_err(|e| StorageError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    fn load(&self) -> StorageResult<Vec<FeedbackRecord>> {
        let _guard = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let file = File::open(&self.path).map_err(|e| StorageError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        let mut records = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| StorageError::Io {
                path: self.path.clone(),
                source: e,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FeedbackRecord>(&line) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = line_no + 1,
                        error = %err,
                        "skipping unparseable feedback line"
                    );
                },
            }
        }
        Ok(records)
    }
}
