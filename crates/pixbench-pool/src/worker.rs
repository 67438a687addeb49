//! The worker side of the process protocol.
//!
//! A worker process runs [`run_worker`]: it announces itself, then answers
//! batch requests until told to shut down or until its stdin closes.

use std::io::{self, BufRead, Write};

use pixbench_pipeline::{FilterPipeline, ImageTransform, PipelineConfig};

use crate::error::FrameError;
use crate::protocol::{FrameReader, FrameWriter, PROTOCOL_VERSION, Reply, Request};

/// Serve requests from `input`, writing replies to `output`.
///
/// Returns the number of batches answered. A closed `input` is a normal
/// shutdown.
///
/// # Errors
///
/// Returns a [`FrameError`] if a frame cannot be read, decoded or written.
pub fn serve<R: BufRead, W: Write>(
    input: R,
    output: W,
    transform: &dyn ImageTransform,
) -> Result<u64, FrameError> {
    let mut reader = FrameReader::new(input);
    let mut writer = FrameWriter::new(output);

    let pid = std::process::id();
    writer.write(&Reply::Ready {
        protocol_version: PROTOCOL_VERSION,
        pid,
    })?;
    tracing::debug!(pid, "worker ready");

    let mut answered = 0;
    loop {
        let request: Request<'static> = match reader.read() {
            Ok(request) => request,
            Err(FrameError::Closed) => {
                tracing::debug!(pid, "pool closed the pipe");
                return Ok(answered);
            }
            Err(err) => return Err(err),
        };

        match request {
            Request::Batch { id, tasks } => {
                let results = tasks.iter().map(|task| task.run(transform)).collect();
                writer.write(&Reply::Batch { id, results })?;
                answered += 1;
            }
            Request::Shutdown => {
                tracing::debug!(pid, answered, "worker shutting down");
                return Ok(answered);
            }
        }
    }
}

/// Run the worker loop on this process's stdin and stdout.
///
/// # Errors
///
/// Returns a [`FrameError`] if the protocol breaks.
pub fn run_worker(config: PipelineConfig) -> Result<u64, FrameError> {
    let pipeline = FilterPipeline::new(config);
    serve(io::stdin().lock(), io::stdout().lock(), &pipeline)
}
