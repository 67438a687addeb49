//! Execution strategies and the capability they share.
//!
//! # Strategy pattern
//!
//! Every pool implements [`Execute`]. [`Strategy`] is the closed set of
//! pools a benchmark can select, and [`Dispatcher`] maps each variant to
//! its engine so callers never branch on the pool kind themselves.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use pixbench_pipeline::{FilterPipeline, ImageTransform, PipelineConfig};
use serde::{Deserialize, Serialize};

use crate::context::ContextMode;
use crate::error::PoolError;
use crate::executor::{Executor, ProcessBackend, ThreadBackend};
use crate::process_pool::ProcessPool;
use crate::supervisor::WorkerLauncher;
use crate::task::{Task, TaskResult};

/// Run a batch of tasks on up to `worker_count` workers.
///
/// Guarantees: one attempt per task, results in task order, per-task
/// failures reported in place. An empty batch returns an empty vector.
pub trait Execute {
    /// Execute `tasks`, blocking until all have finished.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] if the pool itself fails (a worker crashes or
    /// cannot be started). Individual task failures are not errors.
    fn execute(
        &self,
        tasks: &[Task],
        worker_count: NonZeroUsize,
    ) -> Result<Vec<TaskResult>, PoolError>;
}

/// The pools a benchmark can compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strategy {
    /// Chunked process pool ([`ProcessPool`]).
    ProcessPool,
    /// Process pool built on the generic [`Executor`].
    ProcessExecutor,
    /// In-process thread pool built on the generic [`Executor`].
    ThreadPool,
}

impl Strategy {
    /// Every strategy, in reporting order.
    pub const ALL: [Self; 3] = [Self::ProcessPool, Self::ProcessExecutor, Self::ThreadPool];

    /// Column label used in CSV files and tables.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ProcessPool => "MP",
            Self::ProcessExecutor => "CF_Proc",
            Self::ThreadPool => "CF_Thread",
        }
    }

    /// Short name accepted on the command line.
    #[must_use]
    pub const fn cli_name(self) -> &'static str {
        match self {
            Self::ProcessPool => "mp",
            Self::ProcessExecutor => "cfp",
            Self::ThreadPool => "cf",
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ProcessPool => "process pool (chunked)",
            Self::ProcessExecutor => "process pool (executor)",
            Self::ThreadPool => "thread pool (executor)",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A string that names no [`Strategy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy {0:?} (expected one of mp, cfp, cf, MP, CF_Proc, CF_Thread)")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    /// Accepts either the CLI name or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| {
                s.eq_ignore_ascii_case(strategy.cli_name()) || s.eq_ignore_ascii_case(strategy.label())
            })
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Run a batch under a named strategy.
///
/// The benchmark orchestrator depends on this seam rather than on
/// [`Dispatcher`], so it can be driven by substitute pools.
pub trait Dispatch {
    /// Execute `tasks` with `strategy` on `worker_count` workers.
    ///
    /// # Errors
    ///
    /// Returns the strategy's [`PoolError`].
    fn dispatch(
        &self,
        strategy: Strategy,
        tasks: &[Task],
        worker_count: NonZeroUsize,
    ) -> Result<Vec<TaskResult>, PoolError>;
}

impl<T: Dispatch + ?Sized> Dispatch for &T {
    fn dispatch(
        &self,
        strategy: Strategy,
        tasks: &[Task],
        worker_count: NonZeroUsize,
    ) -> Result<Vec<TaskResult>, PoolError> {
        (**self).dispatch(strategy, tasks, worker_count)
    }
}

/// Owns one engine per [`Strategy`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    process_pool: ProcessPool,
    process_executor: Executor<ProcessBackend>,
    thread_pool: Executor<ThreadBackend>,
}

impl Dispatcher {
    /// Build engines around a worker launcher and an in-process transform.
    #[must_use]
    pub fn new(
        launcher: WorkerLauncher,
        transform: Arc<dyn ImageTransform>,
        context: ContextMode,
    ) -> Self {
        Self {
            process_pool: ProcessPool::new(launcher.clone()),
            process_executor: Executor::new(ProcessBackend::new(launcher)),
            thread_pool: Executor::new(ThreadBackend::new(transform, context)),
        }
    }

    /// Engines that all run the filter pipeline with `config`.
    ///
    /// Worker processes are started as `worker_program worker`.
    #[must_use]
    pub fn for_pipeline(
        worker_program: impl Into<PathBuf>,
        config: PipelineConfig,
        context: ContextMode,
    ) -> Self {
        Self::new(
            WorkerLauncher::new(worker_program, config),
            Arc::new(FilterPipeline::new(config)),
            context,
        )
    }

    /// The engine behind `strategy`.
    #[must_use]
    pub fn engine(&self, strategy: Strategy) -> &dyn Execute {
        match strategy {
            Strategy::ProcessPool => &self.process_pool,
            Strategy::ProcessExecutor => &self.process_executor,
            Strategy::ThreadPool => &self.thread_pool,
        }
    }
}

impl Dispatch for Dispatcher {
    fn dispatch(
        &self,
        strategy: Strategy,
        tasks: &[Task],
        worker_count: NonZeroUsize,
    ) -> Result<Vec<TaskResult>, PoolError> {
        tracing::debug!(%strategy, tasks = tasks.len(), workers = worker_count.get(), "execute");
        self.engine(strategy).execute(tasks, worker_count)
    }
}
