//! CLI error type. Every failure ends the process with a one-line
//! diagnostic and a non-zero exit code.

use std::io;
use std::path::PathBuf;

use pixbench_pipeline::PipelineError;
use pixbench_pool::{FrameError, InputError, PoolError};
use pixbench_sweep::{StoreError, SweepError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("no images found in {}", path.display())]
    NoImages { path: PathBuf },

    #[error(transparent)]
    Sweep(#[from] SweepError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("pool failed: {0}")]
    Pool(#[from] PoolError),

    #[error("{}: {source}", path.display())]
    Pipeline {
        path: PathBuf,
        #[source]
        source: PipelineError,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot locate the pixbench executable: {0}")]
    CurrentExe(#[source] io::Error),

    #[error("invalid pipeline JSON: {0}")]
    PipelineJson(#[source] serde_json::Error),

    #[error("failed to write session file: {0}")]
    Session(#[source] serde_json::Error),

    #[error("worker protocol failed: {0}")]
    Worker(#[from] FrameError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}
