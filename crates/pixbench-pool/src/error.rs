//! Error types for input discovery and pool execution.
//!
//! Per-image problems never surface here; they become a failed
//! [`crate::TaskResult`]. A [`PoolError`] means the pool itself could not
//! finish the batch.

use std::io;
use std::path::PathBuf;

use pixbench_pipeline::PipelineError;

/// Failure to enumerate the input directory.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// The input directory does not exist or is not a directory.
    #[error("input directory {} does not exist", path.display())]
    MissingDirectory {
        /// The directory that was requested.
        path: PathBuf,
    },

    /// The directory exists but could not be read.
    #[error("failed to read input directory {}: {source}", path.display())]
    ReadDir {
        /// The directory being listed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Why a single task failed. Rendered into [`crate::TaskResult::message`].
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The input could not be read or decoded.
    #[error("failed to load {}: {source}", path.display())]
    Load {
        /// Input path.
        path: PathBuf,
        /// Read or decode failure.
        #[source]
        source: image::ImageError,
    },

    /// The transform rejected the image.
    #[error("processing failed for {}: {source}", path.display())]
    Process {
        /// Input path.
        path: PathBuf,
        /// Transform failure.
        #[source]
        source: PipelineError,
    },

    /// The transform panicked.
    #[error("panicked while processing {}: {message}", path.display())]
    Panicked {
        /// Input path.
        path: PathBuf,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// The output could not be written.
    #[error("failed to save {}: {source}", path.display())]
    Save {
        /// Output path.
        path: PathBuf,
        /// Encode or write failure.
        #[source]
        source: image::ImageError,
    },
}

/// Failure of the newline-delimited JSON transport between pool and worker.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Reading or writing the pipe failed.
    #[error("pipe i/o failed: {0}")]
    Io(#[from] io::Error),

    /// A frame could not be encoded or decoded.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The peer closed its end of the pipe.
    #[error("peer closed the connection")]
    Closed,
}

/// Fatal failure of a whole `execute` call.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A worker process or dispatch thread could not be started.
    #[error("failed to spawn worker {index}: {source}")]
    Spawn {
        /// Worker slot index.
        index: usize,
        /// Underlying OS failure.
        #[source]
        source: io::Error,
    },

    /// The rayon dispatch pool could not be built.
    #[error("failed to build dispatch threads: {0}")]
    DispatchThreads(#[from] rayon::ThreadPoolBuildError),

    /// A worker process exited or closed its pipe mid-batch.
    #[error("worker {index} crashed: {detail}")]
    WorkerCrashed {
        /// Worker slot index.
        index: usize,
        /// Exit status or pipe error.
        detail: String,
    },

    /// A worker sent something other than what the protocol allows.
    #[error("worker {index} protocol error: expected {expected}, got {got}")]
    Protocol {
        /// Worker slot index.
        index: usize,
        /// What the pool was waiting for.
        expected: String,
        /// What arrived instead.
        got: String,
    },

    /// Talking to a worker failed for a reason other than it exiting.
    #[error("i/o error on worker {index}: {source}")]
    Io {
        /// Worker slot index.
        index: usize,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A request could not be serialized.
    #[error("failed to encode worker request: {0}")]
    Encode(#[from] serde_json::Error),

    /// A dispatch thread found every worker busy or gone.
    #[error("no idle worker available")]
    NoIdleWorker,

    /// A dispatch thread panicked outside task execution.
    #[error("dispatch thread panicked")]
    DispatchPanicked,

    /// Dispatch finished without a result for every task.
    #[error("expected {expected} results, got {got}")]
    MissingResults {
        /// Number of tasks submitted.
        expected: usize,
        /// Number of results collected.
        got: usize,
    },
}
