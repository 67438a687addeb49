//! Pool ↔ worker protocol: newline-delimited JSON over stdin/stdout.
//!
//! ```text
//! worker → pool   Ready { protocol_version, pid }      once, at start
//! pool → worker   Batch { id, tasks }                  any number
//! worker → pool   Batch { id, results }                one per request
//! pool → worker   Shutdown                             last
//! ```
//!
//! Each frame is one JSON value followed by `\n`. Worker diagnostics go to
//! stderr so stdout carries nothing but frames.

use std::borrow::Cow;
use std::io::{BufRead, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::task::{Task, TaskResult};

/// Bumped whenever a frame's shape changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Pool → worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request<'a> {
    /// Run these tasks in order and reply with their results.
    Batch {
        /// Echoed back in the reply.
        id: u64,
        /// Tasks to run.
        tasks: Cow<'a, [Task]>,
    },
    /// Exit after the current frame.
    Shutdown,
}

/// Worker → pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// Sent once after startup.
    Ready {
        /// The worker's [`PROTOCOL_VERSION`].
        protocol_version: u32,
        /// OS process id, for logs.
        pid: u32,
    },
    /// Results for the request with the same `id`, in task order.
    Batch {
        /// Request id being answered.
        id: u64,
        /// One result per task.
        results: Vec<TaskResult>,
    },
}

/// Writes one JSON frame per message.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> FrameWriter<W> {
    /// Wrap a writer.
    pub const fn new(inner: W) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    /// Encode `message`, terminate it with `\n`, and flush.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Json`] if encoding fails and [`FrameError::Io`]
    /// if the write fails.
    pub fn write<T: Serialize>(&mut self, message: &T) -> Result<(), FrameError> {
        self.buf.clear();
        serde_json::to_writer(&mut self.buf, message)?;
        self.buf.push(b'\n');
        self.inner.write_all(&self.buf)?;
        self.inner.flush()?;
        Ok(())
    }
}

/// Reads one JSON frame per line.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    line: String,
}

impl<R: BufRead> FrameReader<R> {
    /// Wrap a buffered reader.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            line: String::new(),
        }
    }

    /// Read the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Closed`] at end of stream, [`FrameError::Io`]
    /// if the read fails, and [`FrameError::Json`] if the line is not a
    /// valid `T`.
    pub fn read<T: DeserializeOwned>(&mut self) -> Result<T, FrameError> {
        self.line.clear();
        if self.inner.read_line(&mut self.line)? == 0 {
            return Err(FrameError::Closed);
        }
        Ok(serde_json::from_str(self.line.trim_end())?)
    }
}
