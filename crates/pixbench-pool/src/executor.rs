//! Generic executor: one task at a time to whichever slot is free.
//!
//! [`Executor`] owns the dispatch loop and is parameterized by a
//! [`Backend`] that decides what a worker slot is. The process backend
//! gives each slot its own worker process; the thread backend runs tasks
//! in-process behind the shared [`ExecutionContext`]. Both strategies
//! therefore share one scheduling implementation and differ only in where
//! the work runs.

use std::num::NonZeroUsize;
use std::slice;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use pixbench_pipeline::ImageTransform;

use crate::context::{ContextMode, ExecutionContext};
use crate::error::PoolError;
use crate::lifecycle::{Lifecycle, PoolState};
use crate::strategy::Execute;
use crate::supervisor::{WorkerHandle, WorkerLauncher};
use crate::task::{Task, TaskResult};

/// Where an [`Executor`]'s work runs.
pub trait Backend: Sync {
    /// One worker's state, owned by one dispatch thread.
    type Slot: WorkerSlot;

    /// Short name used in thread names and logs.
    fn name(&self) -> &'static str;

    /// Start the slot with the given index.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] if the slot cannot be started.
    fn start(&self, index: usize) -> Result<Self::Slot, PoolError>;
}

/// One worker, driven by a single dispatch thread.
pub trait WorkerSlot: Send {
    /// Run one task. `position` is the task's index in the batch.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] only if the worker itself failed; task-level
    /// failures are reported in the [`TaskResult`].
    fn run(&mut self, position: usize, task: &Task) -> Result<TaskResult, PoolError>;

    /// Release the worker after the last task.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] if the worker cannot be shut down cleanly.
    fn stop(self) -> Result<(), PoolError>;
}

/// Dispatches a batch over up to `worker_count` slots of a [`Backend`].
///
/// Slots are started on demand: a batch of `n` tasks never starts more
/// than `n` slots.
#[derive(Debug, Clone)]
pub struct Executor<B> {
    backend: B,
}

impl<B: Backend> Executor<B> {
    /// Wrap a backend.
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend this executor dispatches to.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: Backend> Execute for Executor<B> {
    fn execute(
        &self,
        tasks: &[Task],
        worker_count: NonZeroUsize,
    ) -> Result<Vec<TaskResult>, PoolError> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let name = self.backend.name();
        let lifecycle = Lifecycle::new(name);
        let slot_count = worker_count.get().min(tasks.len());
        let slots = (0..slot_count)
            .map(|index| self.backend.start(index))
            .collect::<Result<Vec<_>, _>>()?;

        let cursor = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        tracing::debug!(pool = name, slots = slot_count, tasks = tasks.len(), "dispatching tasks");
        lifecycle.advance(PoolState::Idle);

        let outcomes = thread::scope(|scope| {
            let mut running = Vec::with_capacity(slot_count);
            for (index, slot) in slots.into_iter().enumerate() {
                let (cursor, abort, lifecycle) = (&cursor, &abort, &lifecycle);
                let spawned = thread::Builder::new()
                    .name(format!("pixbench-{name}-{index}"))
                    .spawn_scoped(scope, move || drive(slot, tasks, cursor, abort, lifecycle));
                match spawned {
                    Ok(handle) => running.push(handle),
                    Err(source) => {
                        abort.store(true, Ordering::Release);
                        running.clear();
                        return vec![Err(PoolError::Spawn { index, source })];
                    }
                }
            }
            running
                .into_iter()
                .map(|handle| handle.join().unwrap_or(Err(PoolError::DispatchPanicked)))
                .collect::<Vec<_>>()
        });
        lifecycle.finish();

        let mut slots_out: Vec<Option<TaskResult>> = vec![None; tasks.len()];
        for outcome in outcomes {
            for (position, result) in outcome? {
                slots_out[position] = Some(result);
            }
        }
        let got = slots_out.iter().filter(|r| r.is_some()).count();
        slots_out
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(PoolError::MissingResults {
                expected: tasks.len(),
                got,
            })
    }
}

/// Pull tasks off the shared cursor until the batch is exhausted.
fn drive<S: WorkerSlot>(
    mut slot: S,
    tasks: &[Task],
    cursor: &AtomicUsize,
    abort: &AtomicBool,
    lifecycle: &Lifecycle,
) -> Result<Vec<(usize, TaskResult)>, PoolError> {
    let mut done = Vec::new();
    while !abort.load(Ordering::Acquire) {
        let position = cursor.fetch_add(1, Ordering::AcqRel);
        let Some(task) = tasks.get(position) else {
            break;
        };
        if position + 1 == tasks.len() {
            lifecycle.advance(PoolState::Dispatching);
        }
        match slot.run(position, task) {
            Ok(result) => done.push((position, result)),
            Err(err) => {
                abort.store(true, Ordering::Release);
                return Err(err);
            }
        }
    }
    slot.stop()?;
    Ok(done)
}

/// Each slot is a dedicated worker process fed one task per request.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    launcher: WorkerLauncher,
}

impl ProcessBackend {
    /// Start workers through `launcher`.
    #[must_use]
    pub const fn new(launcher: WorkerLauncher) -> Self {
        Self { launcher }
    }
}

impl Backend for ProcessBackend {
    type Slot = WorkerHandle;

    fn name(&self) -> &'static str {
        "process-executor"
    }

    fn start(&self, index: usize) -> Result<WorkerHandle, PoolError> {
        self.launcher.spawn(index)
    }
}

impl WorkerSlot for WorkerHandle {
    fn run(&mut self, position: usize, task: &Task) -> Result<TaskResult, PoolError> {
        let mut results = self.run_batch(position as u64, slice::from_ref(task))?;
        results.pop().ok_or(PoolError::MissingResults {
            expected: 1,
            got: 0,
        })
    }

    fn stop(self) -> Result<(), PoolError> {
        self.shutdown()
    }
}

/// Each slot is the dispatch thread itself, running the transform in-process.
#[derive(Clone)]
pub struct ThreadBackend {
    transform: Arc<dyn ImageTransform>,
    context: Arc<ExecutionContext>,
}

impl ThreadBackend {
    /// Run `transform` on worker threads that share one context in `mode`.
    #[must_use]
    pub fn new(transform: Arc<dyn ImageTransform>, mode: ContextMode) -> Self {
        Self {
            transform,
            context: Arc::new(ExecutionContext::new(mode)),
        }
    }

    /// How the worker threads share the execution context.
    #[must_use]
    pub fn context_mode(&self) -> ContextMode {
        self.context.mode()
    }
}

impl std::fmt::Debug for ThreadBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadBackend")
            .field("context", &self.context.mode())
            .finish_non_exhaustive()
    }
}

impl Backend for ThreadBackend {
    type Slot = ThreadSlot;

    fn name(&self) -> &'static str {
        "thread-pool"
    }

    fn start(&self, _index: usize) -> Result<ThreadSlot, PoolError> {
        Ok(ThreadSlot {
            transform: Arc::clone(&self.transform),
            context: Arc::clone(&self.context),
        })
    }
}

/// In-process slot of a [`ThreadBackend`].
pub struct ThreadSlot {
    transform: Arc<dyn ImageTransform>,
    context: Arc<ExecutionContext>,
}

impl WorkerSlot for ThreadSlot {
    fn run(&mut self, _position: usize, task: &Task) -> Result<TaskResult, PoolError> {
        Ok(self.context.enter(|| task.run(self.transform.as_ref())))
    }

    fn stop(self) -> Result<(), PoolError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;

    use image::DynamicImage;
    use pixbench_pipeline::{FilterPipeline, PipelineError};

    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn write_pngs(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("img_{i:02}.png"));
                image::RgbImage::from_pixel(6, 6, image::Rgb([u8::try_from(i).unwrap(); 3]))
                    .save(&path)
                    .unwrap();
                path
            })
            .collect()
    }

    /// Records which thread ran each task and sleeps briefly so threads
    /// interleave.
    #[derive(Default)]
    struct Recording {
        threads: Mutex<Vec<String>>,
    }

    impl ImageTransform for Recording {
        fn transform(&self, image: &DynamicImage) -> Result<DynamicImage, PipelineError> {
            let name = thread::current().name().unwrap_or_default().to_string();
            self.threads.lock().unwrap().push(name);
            thread::sleep(Duration::from_millis(5));
            Ok(image.clone())
        }
    }

    /// Backend whose slots fail on a chosen task position.
    struct Failing {
        fail_at: usize,
    }

    struct FailingSlot {
        fail_at: usize,
    }

    impl Backend for Failing {
        type Slot = FailingSlot;

        fn name(&self) -> &'static str {
            "failing"
        }

        fn start(&self, _index: usize) -> Result<FailingSlot, PoolError> {
            Ok(FailingSlot {
                fail_at: self.fail_at,
            })
        }
    }

    impl WorkerSlot for FailingSlot {
        fn run(&mut self, position: usize, _task: &Task) -> Result<TaskResult, PoolError> {
            if position == self.fail_at {
                return Err(PoolError::WorkerCrashed {
                    index: 0,
                    detail: "injected".to_string(),
                });
            }
            Ok(TaskResult::success())
        }

        fn stop(self) -> Result<(), PoolError> {
            Ok(())
        }
    }

    #[test]
    fn results_match_task_order_with_failures_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let mut inputs = write_pngs(tmp.path(), 7);
        inputs.insert(3, tmp.path().join("missing.png"));
        let tasks = Task::batch(&inputs, tmp.path(), false);

        let executor = Executor::new(ThreadBackend::new(
            Arc::new(FilterPipeline::default()),
            ContextMode::Isolated,
        ));
        let results = executor.execute(&tasks, nz(3)).unwrap();

        assert_eq!(results.len(), tasks.len());
        for (position, result) in results.iter().enumerate() {
            assert_eq!(result.success, position != 3, "position {position}: {result:?}");
        }
    }

    #[test]
    fn never_starts_more_slots_than_tasks() {
        let tmp = tempfile::tempdir().unwrap();
        let tasks = Task::batch(&write_pngs(tmp.path(), 2), tmp.path(), false);
        let recording = Arc::new(Recording::default());

        let executor = Executor::new(ThreadBackend::new(recording.clone(), ContextMode::Isolated));
        executor.execute(&tasks, nz(8)).unwrap();

        let threads = recording.threads.lock().unwrap();
        assert_eq!(threads.len(), 2);
        assert!(
            threads
                .iter()
                .all(|t| t == "pixbench-thread-pool-0" || t == "pixbench-thread-pool-1"),
            "{threads:?}"
        );
    }

    #[test]
    fn every_task_runs_exactly_once() {
        let tmp = tempfile::tempdir().unwrap();
        let tasks = Task::batch(&write_pngs(tmp.path(), 12), tmp.path(), false);
        let recording = Arc::new(Recording::default());

        let executor = Executor::new(ThreadBackend::new(recording.clone(), ContextMode::Shared));
        let results = executor.execute(&tasks, nz(4)).unwrap();

        assert!(results.iter().all(|r| r.success));
        assert_eq!(recording.threads.lock().unwrap().len(), 12);
    }

    #[test]
    fn empty_batch_returns_empty() {
        let executor = Executor::new(Failing { fail_at: 0 });
        assert!(executor.execute(&[], nz(2)).unwrap().is_empty());
    }

    #[test]
    fn slot_failure_is_fatal_for_the_batch() {
        let tasks: Vec<Task> = (0..10)
            .map(|i| Task::new(format!("{i}.png"), "out", false))
            .collect();
        let executor = Executor::new(Failing { fail_at: 4 });
        let result = executor.execute(&tasks, nz(2));
        assert!(matches!(result, Err(PoolError::WorkerCrashed { .. })));
    }

    #[test]
    fn thread_backend_reports_its_mode() {
        let backend = ThreadBackend::new(Arc::new(FilterPipeline::default()), ContextMode::Shared);
        assert_eq!(backend.context_mode(), ContextMode::Shared);
        assert_eq!(backend.name(), "thread-pool");
    }
}
