//! Measurements produced by a benchmark session.

use std::path::PathBuf;

use pixbench_pool::{Strategy, Task, TaskResult};
use serde::{Deserialize, Serialize};

/// Identity of one sweep cell; also the resume key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    /// Number of images in the batch.
    pub image_count: usize,
    /// Number of workers.
    pub worker_count: usize,
    /// Pool that ran the batch.
    pub strategy: Strategy,
}

impl CellKey {
    /// Build a key.
    #[must_use]
    pub const fn new(image_count: usize, worker_count: usize, strategy: Strategy) -> Self {
        Self {
            image_count,
            worker_count,
            strategy,
        }
    }

    /// The single-worker cell this one's speedup is measured against.
    #[must_use]
    pub const fn baseline(self) -> Self {
        Self {
            worker_count: 1,
            ..self
        }
    }
}

/// One timed `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Pool that ran the batch.
    pub strategy: Strategy,
    /// Number of workers, at least 1.
    pub worker_count: usize,
    /// Number of images in the batch.
    pub image_count: usize,
    /// 1-based repetition index within the cell.
    pub run_index: usize,
    /// Wall-clock seconds, including pool setup and teardown.
    pub duration_seconds: f64,
}

impl RunRecord {
    /// The cell this run belongs to.
    #[must_use]
    pub const fn key(&self) -> CellKey {
        CellKey::new(self.image_count, self.worker_count, self.strategy)
    }
}

/// Mean duration of a cell with speedup and efficiency derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStat {
    /// Pool that ran the batch.
    pub strategy: Strategy,
    /// Number of workers.
    pub worker_count: usize,
    /// Number of images in the batch.
    pub image_count: usize,
    /// Mean wall-clock seconds across repetitions.
    pub mean_duration: f64,
    /// Baseline mean over this mean; `None` when the baseline is missing.
    pub speedup: Option<f64>,
    /// `speedup / worker_count` as a fraction; `None` with `speedup`.
    pub efficiency: Option<f64>,
}

impl AggregatedStat {
    /// The cell this stat summarizes.
    #[must_use]
    pub const fn key(&self) -> CellKey {
        CellKey::new(self.image_count, self.worker_count, self.strategy)
    }
}

/// Per-run success accounting for the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Cell the run belongs to.
    pub key: CellKey,
    /// 1-based repetition index.
    pub run_index: usize,
    /// Tasks that succeeded.
    pub succeeded: usize,
    /// Failed tasks with their input path and message.
    pub failures: Vec<(PathBuf, String)>,
}

impl RunSummary {
    /// Pair each failed result with its task's input path.
    #[must_use]
    pub fn from_results(
        key: CellKey,
        run_index: usize,
        tasks: &[Task],
        results: &[TaskResult],
    ) -> Self {
        let failures: Vec<_> = tasks
            .iter()
            .zip(results)
            .filter(|(_, result)| !result.success)
            .map(|(task, result)| {
                (
                    task.input_path.clone(),
                    result.message.clone().unwrap_or_default(),
                )
            })
            .collect();
        Self {
            key,
            run_index,
            succeeded: results.len() - failures.len(),
            failures,
        }
    }

    /// Number of failed tasks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// A cell whose pool failed; its remaining repetitions were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFailure {
    /// Cell that failed.
    pub key: CellKey,
    /// Repetition during which the pool failed.
    pub run_index: usize,
    /// Rendered pool error.
    pub error: String,
}

/// A requested image count larger than the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountAdjustment {
    /// Count asked for.
    pub requested: usize,
    /// Count actually used.
    pub available: usize,
}
