//! Spawning and talking to worker processes.

use std::borrow::Cow;
use std::ffi::OsString;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use pixbench_pipeline::PipelineConfig;

use crate::error::{FrameError, PoolError};
use crate::protocol::{FrameReader, FrameWriter, PROTOCOL_VERSION, Reply, Request};
use crate::task::{Task, TaskResult};

/// Flag carrying the JSON pipeline configuration to a worker.
pub const PIPELINE_FLAG: &str = "--pipeline-json";

/// Knows how to start a worker process.
///
/// The worker is `program args... --pipeline-json <config>`; by default
/// `args` is the single subcommand `worker`.
#[derive(Debug, Clone)]
pub struct WorkerLauncher {
    program: PathBuf,
    args: Vec<OsString>,
    pipeline: PipelineConfig,
}

impl WorkerLauncher {
    /// Launch workers as `program worker --pipeline-json <config>`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, pipeline: PipelineConfig) -> Self {
        Self {
            program: program.into(),
            args: vec![OsString::from("worker")],
            pipeline,
        }
    }

    /// Replace the arguments placed before [`PIPELINE_FLAG`].
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Configuration handed to every worker.
    #[must_use]
    pub const fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    /// Start one worker and wait for its `Ready` frame.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] if the process cannot start, and a
    /// crash or protocol error if the handshake fails.
    pub fn spawn(&self, index: usize) -> Result<WorkerHandle, PoolError> {
        let config = serde_json::to_string(&self.pipeline)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(PIPELINE_FLAG)
            .arg(config)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| PoolError::Spawn { index, source })?;

        let pipes = child.stdin.take().zip(child.stdout.take());
        let Some((stdin, stdout)) = pipes else {
            // Unreachable with piped stdio; reap the child anyway.
            let _ = child.kill();
            let _ = child.wait();
            return Err(PoolError::Spawn {
                index,
                source: io::Error::other("worker pipes were not captured"),
            });
        };

        let mut handle = WorkerHandle {
            index,
            pid: child.id(),
            child,
            writer: FrameWriter::new(stdin),
            reader: FrameReader::new(BufReader::new(stdout)),
        };
        handle.wait_for_ready()?;
        tracing::debug!(index, pid = handle.pid, "worker spawned");
        Ok(handle)
    }
}

/// A live worker process.
///
/// Dropping a handle kills the process if it is still running.
#[derive(Debug)]
pub struct WorkerHandle {
    index: usize,
    pid: u32,
    child: Child,
    writer: FrameWriter<ChildStdin>,
    reader: FrameReader<BufReader<ChildStdout>>,
}

impl WorkerHandle {
    /// Slot index this worker was spawned for.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// OS process id.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    fn wait_for_ready(&mut self) -> Result<(), PoolError> {
        let reply: Reply = self.reader.read().map_err(|e| self.frame_error(e))?;
        match reply {
            Reply::Ready {
                protocol_version, ..
            } if protocol_version == PROTOCOL_VERSION => Ok(()),
            Reply::Ready {
                protocol_version, ..
            } => Err(PoolError::Protocol {
                index: self.index,
                expected: format!("protocol version {PROTOCOL_VERSION}"),
                got: format!("protocol version {protocol_version}"),
            }),
            other => Err(PoolError::Protocol {
                index: self.index,
                expected: "Ready".to_string(),
                got: format!("{other:?}"),
            }),
        }
    }

    /// Send `tasks` as one batch and wait for their results.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::WorkerCrashed`] if the worker exits, and
    /// [`PoolError::Protocol`] if the reply does not match the request.
    pub fn run_batch(&mut self, id: u64, tasks: &[Task]) -> Result<Vec<TaskResult>, PoolError> {
        let request = Request::Batch {
            id,
            tasks: Cow::Borrowed(tasks),
        };
        self.writer.write(&request).map_err(|e| self.frame_error(e))?;

        let reply: Reply = self.reader.read().map_err(|e| self.frame_error(e))?;
        match reply {
            Reply::Batch {
                id: reply_id,
                results,
            } if reply_id == id && results.len() == tasks.len() => Ok(results),
            Reply::Batch {
                id: reply_id,
                results,
            } => Err(PoolError::Protocol {
                index: self.index,
                expected: format!("batch {id} with {} results", tasks.len()),
                got: format!("batch {reply_id} with {} results", results.len()),
            }),
            other => Err(PoolError::Protocol {
                index: self.index,
                expected: format!("batch {id}"),
                got: format!("{other:?}"),
            }),
        }
    }

    /// Ask the worker to exit and reap it.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown frame cannot be sent or the process
    /// cannot be waited on.
    pub fn shutdown(mut self) -> Result<(), PoolError> {
        self.writer
            .write(&Request::Shutdown)
            .map_err(|e| self.frame_error(e))?;
        let status = self.child.wait().map_err(|source| PoolError::Io {
            index: self.index,
            source,
        })?;
        tracing::debug!(index = self.index, pid = self.pid, %status, "worker exited");
        Ok(())
    }

    /// Classify a transport failure. A closed or broken pipe means the
    /// process is gone, so its exit status is collected for the message.
    fn frame_error(&mut self, err: FrameError) -> PoolError {
        match err {
            FrameError::Closed => self.crashed("closed its output"),
            FrameError::Io(source) if source.kind() == io::ErrorKind::BrokenPipe => {
                self.crashed("stopped reading requests")
            }
            FrameError::Io(source) => PoolError::Io {
                index: self.index,
                source,
            },
            FrameError::Json(err) => PoolError::Protocol {
                index: self.index,
                expected: "a JSON frame".to_string(),
                got: err.to_string(),
            },
        }
    }

    fn crashed(&mut self, what: &str) -> PoolError {
        let detail = match self.child.wait() {
            Ok(status) => format!("pid {} {what} ({status})", self.pid),
            Err(err) => format!("pid {} {what} (wait failed: {err})", self.pid),
        };
        tracing::warn!(index = self.index, %detail, "worker crashed");
        PoolError::WorkerCrashed {
            index: self.index,
            detail,
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
