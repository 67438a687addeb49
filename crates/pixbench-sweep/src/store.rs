//! Persistence of raw run records, queried when resuming a sweep.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::csv;
use crate::error::StoreError;
use crate::record::{CellKey, RunRecord};

/// Where the orchestrator keeps measured runs.
///
/// Injected into [`crate::Orchestrator`] so resume behavior does not
/// depend on any file layout.
pub trait RecordStore {
    /// Records already stored for `key`, in run order.
    fn lookup(&self, key: CellKey) -> Vec<RunRecord>;

    /// Persist newly measured records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the records cannot be saved.
    fn append(&mut self, records: &[RunRecord]) -> Result<(), StoreError>;
}

/// In-memory store, empty unless seeded.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Vec<RunRecord>,
}

impl MemoryRecordStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `records`.
    #[must_use]
    pub const fn with_records(records: Vec<RunRecord>) -> Self {
        Self { records }
    }

    /// Everything stored so far.
    #[must_use]
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }
}

impl RecordStore for MemoryRecordStore {
    fn lookup(&self, key: CellKey) -> Vec<RunRecord> {
        self.records
            .iter()
            .filter(|r| r.key() == key)
            .copied()
            .collect()
    }

    fn append(&mut self, records: &[RunRecord]) -> Result<(), StoreError> {
        self.records.extend_from_slice(records);
        Ok(())
    }
}

/// Raw results CSV, read once on open and appended to afterwards.
///
/// The header is written only when the file is new or empty, so several
/// sessions can share one file.
#[derive(Debug)]
pub struct CsvRecordStore {
    path: PathBuf,
    memory: MemoryRecordStore,
}

impl CsvRecordStore {
    /// Load `path` if it exists; otherwise start empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if an existing file cannot be read and
    /// [`StoreError::Parse`] if it is not a raw results file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            csv::read_raw(&text)?
        } else {
            Vec::new()
        };
        tracing::debug!(path = %path.display(), records = records.len(), "record store opened");
        Ok(Self {
            path,
            memory: MemoryRecordStore::with_records(records),
        })
    }

    /// File backing the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in the file, including those appended this session.
    #[must_use]
    pub fn records(&self) -> &[RunRecord] {
        self.memory.records()
    }
}

impl RecordStore for CsvRecordStore {
    fn lookup(&self, key: CellKey) -> Vec<RunRecord> {
        self.memory.lookup(key)
    }

    fn append(&mut self, records: &[RunRecord]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        let is_new = file.metadata().map_err(io_err)?.len() == 0;

        let mut out = BufWriter::new(file);
        csv::write_raw(&mut out, records, is_new).map_err(io_err)?;
        out.flush().map_err(io_err)?;

        self.memory.append(records)
    }
}
