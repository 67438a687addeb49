//! Configuration and persistence errors for benchmark sessions.
//!
//! Pool failures are not here: they abort one sweep cell and are recorded
//! as a [`crate::CellFailure`] while the sweep carries on.

use std::io;
use std::path::PathBuf;

use pixbench_pool::InputError;

/// Failure reading or writing persisted records.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file could not be opened, read or written.
    #[error("record file {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A CSV line did not parse.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },
}

/// A benchmark session could not start or could not save its output.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// The input directory could not be listed.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The input directory contains no images.
    #[error("no images found in {}", path.display())]
    NoImages {
        /// Directory that was scanned.
        path: PathBuf,
    },

    /// The configuration or sweep dimensions are unusable.
    #[error("invalid benchmark configuration: {0}")]
    InvalidConfig(String),

    /// The record store failed.
    #[error("record store failed: {0}")]
    Store(#[from] StoreError),
}
