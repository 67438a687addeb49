//! The unit of work handed to pools and the per-task outcome.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use pixbench_pipeline::ImageTransform;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::input;

/// Prefix added to the input file name when writing the output.
pub const OUTPUT_PREFIX: &str = "processed_";

/// One input image to load, transform and optionally save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Image to read.
    pub input_path: PathBuf,
    /// Directory the output is written to when `save_to_disk` is set.
    pub output_dir: PathBuf,
    /// Whether to encode the transformed image to disk.
    pub save_to_disk: bool,
}

impl Task {
    /// Create a task.
    #[must_use]
    pub fn new(input_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, save: bool) -> Self {
        Self {
            input_path: input_path.into(),
            output_dir: output_dir.into(),
            save_to_disk: save,
        }
    }

    /// One task per input path, all sharing an output directory.
    #[must_use]
    pub fn batch(inputs: &[PathBuf], output_dir: &Path, save: bool) -> Vec<Self> {
        inputs
            .iter()
            .map(|path| Self::new(path.clone(), output_dir, save))
            .collect()
    }

    /// `output_dir/processed_<input file name>`.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        let name = self
            .input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output_dir.join(format!("{OUTPUT_PREFIX}{name}"))
    }

    /// Load, transform and optionally save this task's image.
    ///
    /// Never panics and never returns early for the caller: every failure,
    /// including a panicking transform, becomes a failed [`TaskResult`].
    #[must_use]
    pub fn run(&self, transform: &dyn ImageTransform) -> TaskResult {
        match self.try_run(transform) {
            Ok(()) => TaskResult::success(),
            Err(err) => {
                tracing::debug!(path = %self.input_path.display(), error = %err, "task failed");
                TaskResult::failure(err.to_string())
            }
        }
    }

    fn try_run(&self, transform: &dyn ImageTransform) -> Result<(), TaskError> {
        let image = input::load_image(&self.input_path).map_err(|source| TaskError::Load {
            path: self.input_path.clone(),
            source,
        })?;

        let processed = catch_unwind(AssertUnwindSafe(|| transform.transform(&image)))
            .map_err(|payload| TaskError::Panicked {
                path: self.input_path.clone(),
                message: panic_message(payload.as_ref()),
            })?
            .map_err(|source| TaskError::Process {
                path: self.input_path.clone(),
                source,
            })?;

        if self.save_to_disk {
            let out = self.output_path();
            input::save_image(&processed, &out)
                .map_err(|source| TaskError::Save { path: out, source })?;
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Outcome of one task. Positionally matches its [`Task`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether the task completed.
    pub success: bool,
    /// Failure cause; `None` on success.
    pub message: Option<String>,
}

impl TaskResult {
    /// A successful result.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// A failed result with a human-readable cause.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}
