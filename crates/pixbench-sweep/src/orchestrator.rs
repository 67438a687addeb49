//! The benchmark sweep: every strategy over every image and worker count.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::time::Instant;

use pixbench_pool::{Dispatch, PoolError, Strategy, Task, TaskResult};

use crate::catalog::InputCatalog;
use crate::config::BenchmarkConfig;
use crate::error::SweepError;
use crate::record::{
    AggregatedStat, CellFailure, CellKey, CountAdjustment, RunRecord, RunSummary,
};
use crate::stats;
use crate::store::RecordStore;

/// Everything measured by one [`Orchestrator::run_sweep`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepOutcome {
    /// Image counts actually run, ascending, after clamping.
    pub image_counts: Vec<usize>,
    /// Worker counts actually run, ascending, always starting at 1.
    pub worker_counts: Vec<usize>,
    /// Every timed run, measured or reused, in sweep order.
    pub raw: Vec<RunRecord>,
    /// One stat per cell that produced at least one run.
    pub aggregated: Vec<AggregatedStat>,
    /// Success accounting for runs measured this session.
    pub runs: Vec<RunSummary>,
    /// Cells whose pool failed.
    pub failures: Vec<CellFailure>,
    /// Requested image counts that exceeded the dataset.
    pub adjustments: Vec<CountAdjustment>,
    /// Cells skipped because the store already held their records.
    pub reused: Vec<CellKey>,
}

/// Drives benchmark sessions against a [`Dispatch`] and a [`RecordStore`].
///
/// Cells run one after another; nothing here is concurrent except the
/// pools themselves.
#[derive(Debug)]
pub struct Orchestrator<D, S> {
    config: BenchmarkConfig,
    dispatcher: D,
    store: S,
}

impl<D: Dispatch, S: RecordStore> Orchestrator<D, S> {
    /// Validate `config` and assemble an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::InvalidConfig`] if `config` is unusable.
    pub fn new(config: BenchmarkConfig, dispatcher: D, store: S) -> Result<Self, SweepError> {
        config.validate()?;
        Ok(Self {
            config,
            dispatcher,
            store,
        })
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// The record store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Give back the record store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Time every strategy over every image and worker count.
    ///
    /// Image counts above the dataset size are clamped to it; worker
    /// count 1 is always included so every cell has a speedup baseline.
    /// A pool failure ends its cell and the sweep moves on.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::InvalidConfig`] for no image counts or a zero
    /// count, [`SweepError::Input`] or [`SweepError::NoImages`] if the input
    /// directory is unusable, and [`SweepError::Store`] if new records
    /// cannot be persisted.
    pub fn run_sweep(
        &mut self,
        image_counts: &[usize],
        worker_counts: &[NonZeroUsize],
        repetitions: NonZeroUsize,
    ) -> Result<SweepOutcome, SweepError> {
        let requested = sorted_image_counts(image_counts)?;
        let catalog = InputCatalog::open(&self.config.input_dir)?;

        let mut outcome = SweepOutcome {
            worker_counts: sorted_worker_counts(worker_counts),
            ..SweepOutcome::default()
        };

        tracing::info!(
            images = ?requested,
            workers = ?outcome.worker_counts,
            runs = repetitions.get(),
            available = catalog.available(),
            "starting sweep"
        );

        for count in requested {
            let effective = count.min(catalog.available());
            if effective < count {
                tracing::warn!(
                    requested = count,
                    available = effective,
                    "not enough images, clamping"
                );
                outcome.adjustments.push(CountAdjustment {
                    requested: count,
                    available: effective,
                });
            }
            if outcome.image_counts.contains(&effective) {
                tracing::info!(images = effective, "already measured after clamping, skipping");
                continue;
            }
            outcome.image_counts.push(effective);

            let tasks = Task::batch(catalog.prefix(effective), &self.config.output_dir, false);
            for workers in outcome.worker_counts.clone() {
                for strategy in self.config.strategies.clone() {
                    let key = CellKey::new(effective, workers, strategy);
                    self.run_cell(key, &tasks, repetitions, &mut outcome)?;
                }
            }
        }

        tracing::info!(
            runs = outcome.raw.len(),
            failures = outcome.failures.len(),
            reused = outcome.reused.len(),
            "sweep finished"
        );
        Ok(outcome)
    }

    fn run_cell(
        &mut self,
        key: CellKey,
        tasks: &[Task],
        repetitions: NonZeroUsize,
        outcome: &mut SweepOutcome,
    ) -> Result<(), SweepError> {
        let mut records = if self.config.resume {
            self.store.lookup(key)
        } else {
            Vec::new()
        };

        if records.is_empty() {
            let workers = NonZeroUsize::new(key.worker_count).unwrap_or(NonZeroUsize::MIN);
            for run_index in 1..=repetitions.get() {
                match self.timed_run(key.strategy, tasks, workers) {
                    Ok((duration_seconds, results)) => {
                        let record = RunRecord {
                            strategy: key.strategy,
                            worker_count: key.worker_count,
                            image_count: key.image_count,
                            run_index,
                            duration_seconds,
                        };
                        self.store.append(&[record])?;
                        let summary = RunSummary::from_results(key, run_index, tasks, &results);
                        tracing::info!(
                            images = key.image_count,
                            workers = key.worker_count,
                            strategy = %key.strategy,
                            run = run_index,
                            seconds = duration_seconds,
                            failed = summary.failed(),
                            "run complete"
                        );
                        records.push(record);
                        outcome.runs.push(summary);
                    }
                    Err(err) => {
                        tracing::warn!(
                            images = key.image_count,
                            workers = key.worker_count,
                            strategy = %key.strategy,
                            run = run_index,
                            error = %err,
                            "pool failed, skipping rest of cell"
                        );
                        outcome.failures.push(CellFailure {
                            key,
                            run_index,
                            error: err.to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            tracing::info!(
                images = key.image_count,
                workers = key.worker_count,
                strategy = %key.strategy,
                runs = records.len(),
                "reusing stored runs"
            );
            outcome.reused.push(key);
        }

        let durations: Vec<f64> = records.iter().map(|r| r.duration_seconds).collect();
        if let Some(mean) = stats::mean(&durations) {
            let baseline = outcome
                .aggregated
                .iter()
                .find(|s| s.key() == key.baseline())
                .map(|s| s.mean_duration);
            outcome.aggregated.push(stats::derive_stat(key, mean, baseline));
        }
        outcome.raw.extend(records);
        Ok(())
    }

    /// Cool down, then time one `execute` call including pool setup and
    /// teardown.
    pub(crate) fn timed_run(
        &self,
        strategy: Strategy,
        tasks: &[Task],
        workers: NonZeroUsize,
    ) -> Result<(f64, Vec<TaskResult>), PoolError> {
        if !self.config.cooldown.is_zero() {
            std::thread::sleep(self.config.cooldown);
        }
        let start = Instant::now();
        let results = self.dispatcher.dispatch(strategy, tasks, workers)?;
        Ok((start.elapsed().as_secs_f64(), results))
    }
}

/// Ascending, deduplicated, non-empty, no zeros.
pub(crate) fn sorted_image_counts(counts: &[usize]) -> Result<Vec<usize>, SweepError> {
    if counts.is_empty() {
        return Err(SweepError::InvalidConfig(
            "at least one image count is required".to_string(),
        ));
    }
    if counts.contains(&0) {
        return Err(SweepError::InvalidConfig(
            "image counts must be at least 1".to_string(),
        ));
    }
    Ok(counts.iter().copied().collect::<BTreeSet<_>>().into_iter().collect())
}

/// Ascending, deduplicated, always containing 1.
fn sorted_worker_counts(counts: &[NonZeroUsize]) -> Vec<usize> {
    let mut set: BTreeSet<usize> = counts.iter().map(|w| w.get()).collect();
    set.insert(1);
    set.into_iter().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn worker_counts_gain_a_baseline() {
        assert_eq!(sorted_worker_counts(&[nz(8), nz(2), nz(8)]), [1, 2, 8]);
        assert_eq!(sorted_worker_counts(&[]), [1]);
    }

    #[test]
    fn image_counts_are_sorted_and_validated() {
        assert_eq!(sorted_image_counts(&[50, 10, 50]).unwrap(), [10, 50]);
        assert!(sorted_image_counts(&[]).is_err());
        assert!(sorted_image_counts(&[10, 0]).is_err());
    }
}
