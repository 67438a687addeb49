//! Chunked process pool.
//!
//! Spawns every worker up front, splits the batch into chunks of
//! `ceil(len / (4 × workers))` tasks, and lets a rayon pool with one
//! thread per worker feed chunks to whichever worker is free. Results are
//! collected in chunk order, so they line up with the input.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::error::PoolError;
use crate::lifecycle::{Lifecycle, PoolState};
use crate::strategy::Execute;
use crate::supervisor::{WorkerHandle, WorkerLauncher};
use crate::task::{Task, TaskResult};

/// Chunks per worker.
const CHUNKS_PER_WORKER: usize = 4;

/// Tasks per chunk for a batch of `task_count` across `worker_count`.
#[must_use]
pub fn chunk_size(task_count: usize, worker_count: NonZeroUsize) -> usize {
    let chunks = worker_count.get().saturating_mul(CHUNKS_PER_WORKER);
    task_count.div_ceil(chunks).max(1)
}

/// Pool of worker processes fed in chunks.
#[derive(Debug, Clone)]
pub struct ProcessPool {
    launcher: WorkerLauncher,
}

impl ProcessPool {
    /// Create a pool that starts workers through `launcher`.
    #[must_use]
    pub const fn new(launcher: WorkerLauncher) -> Self {
        Self { launcher }
    }
}

impl Execute for ProcessPool {
    fn execute(
        &self,
        tasks: &[Task],
        worker_count: NonZeroUsize,
    ) -> Result<Vec<TaskResult>, PoolError> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let workers = worker_count.get();
        let lifecycle = Lifecycle::new("process-pool");
        let handles = (0..workers)
            .map(|index| self.launcher.spawn(index))
            .collect::<Result<Vec<_>, _>>()?;
        let idle = Mutex::new(handles);

        let dispatch = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pixbench-dispatch-{i}"))
            .build()?;

        let chunks: Vec<&[Task]> = tasks.chunks(chunk_size(tasks.len(), worker_count)).collect();
        let taken = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        tracing::debug!(workers, chunks = chunks.len(), "dispatching chunks");
        lifecycle.advance(PoolState::Idle);

        let outcomes: Vec<Result<Vec<TaskResult>, PoolError>> = dispatch.install(|| {
            chunks
                .par_iter()
                .enumerate()
                .map(|(id, chunk)| {
                    if taken.fetch_add(1, Ordering::AcqRel) + 1 == chunks.len() {
                        lifecycle.advance(PoolState::Dispatching);
                    }
                    if abort.load(Ordering::Acquire) {
                        return Ok(Vec::new());
                    }
                    let mut worker = checkout(&idle)?;
                    match worker.run_batch(id as u64, chunk) {
                        Ok(results) => {
                            checkin(&idle, worker);
                            Ok(results)
                        }
                        Err(err) => {
                            abort.store(true, Ordering::Release);
                            Err(err)
                        }
                    }
                })
                .collect()
        });

        let mut results = Vec::with_capacity(tasks.len());
        let mut failure = None;
        for outcome in outcomes {
            match outcome {
                Ok(chunk) => results.extend(chunk),
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }

        for worker in idle.into_inner().unwrap_or_else(PoisonError::into_inner) {
            let index = worker.index();
            if let Err(err) = worker.shutdown() {
                tracing::warn!(index, error = %err, "worker did not shut down cleanly");
            }
        }
        lifecycle.finish();

        if let Some(err) = failure {
            return Err(err);
        }
        if results.len() != tasks.len() {
            return Err(PoolError::MissingResults {
                expected: tasks.len(),
                got: results.len(),
            });
        }
        Ok(results)
    }
}

fn checkout(idle: &Mutex<Vec<WorkerHandle>>) -> Result<WorkerHandle, PoolError> {
    idle.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop()
        .ok_or(PoolError::NoIdleWorker)
}

fn checkin(idle: &Mutex<Vec<WorkerHandle>>, worker: WorkerHandle) {
    idle.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(worker);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
    }

    #[test]
    fn chunk_size_targets_four_chunks_per_worker() {
        assert_eq!(chunk_size(100, nz(4)), 7);
        assert_eq!(chunk_size(16, nz(4)), 1);
        assert_eq!(chunk_size(50, nz(1)), 13);
    }

    #[test]
    fn chunk_size_is_never_zero() {
        assert_eq!(chunk_size(0, nz(8)), 1);
        assert_eq!(chunk_size(3, nz(8)), 1);
    }

    #[test]
    fn empty_batch_spawns_nothing() {
        let pool = ProcessPool::new(WorkerLauncher::new(
            "/nonexistent/pixbench",
            pixbench_pipeline::PipelineConfig::default(),
        ));
        let results = pool.execute(&[], nz(4));
        assert!(matches!(results, Ok(ref r) if r.is_empty()));
    }

    #[test]
    fn missing_worker_program_is_a_spawn_error() {
        let pool = ProcessPool::new(WorkerLauncher::new(
            "/nonexistent/pixbench",
            pixbench_pipeline::PipelineConfig::default(),
        ));
        let tasks = [Task::new("a.png", "out", false)];
        let result = pool.execute(&tasks, nz(2));
        assert!(matches!(result, Err(PoolError::Spawn { index: 0, .. })));
    }
}
