//! Saturation search: grow the dataset until speedup stops improving.

use std::num::NonZeroUsize;

use pixbench_pool::{Dispatch, Strategy, Task};

use crate::catalog::InputCatalog;
use crate::error::SweepError;
use crate::orchestrator::{Orchestrator, sorted_image_counts};
use crate::record::{AggregatedStat, CellFailure, CellKey, CountAdjustment, RunSummary};
use crate::stats;
use crate::store::RecordStore;

/// Strategy and worker count of the serial reference run.
pub const SERIAL_BASELINE: Strategy = Strategy::ProcessPool;

/// Measurements at one dataset size.
#[derive(Debug, Clone, PartialEq)]
pub struct SaturationStep {
    /// Number of images processed.
    pub image_count: usize,
    /// Time of the single-worker reference run.
    pub serial_seconds: f64,
    /// One stat per strategy, speedup relative to `serial_seconds`.
    pub stats: Vec<AggregatedStat>,
}

impl SaturationStep {
    /// Highest speedup any strategy reached at this size.
    #[must_use]
    pub fn best_speedup(&self) -> Option<f64> {
        self.stats
            .iter()
            .filter_map(|s| s.speedup)
            .reduce(f64::max)
    }
}

/// Result of [`Orchestrator::run_saturation`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaturationOutcome {
    /// Workers used by every parallel run.
    pub worker_count: usize,
    /// Relative speedup change treated as a plateau.
    pub tolerance: f64,
    /// Measured sizes, ascending.
    pub steps: Vec<SaturationStep>,
    /// Success accounting per run.
    pub runs: Vec<RunSummary>,
    /// Runs whose pool failed.
    pub failures: Vec<CellFailure>,
    /// Targets larger than the dataset.
    pub adjustments: Vec<CountAdjustment>,
}

impl SaturationOutcome {
    /// See [`saturation_point`].
    #[must_use]
    pub fn saturation_point(&self) -> Option<usize> {
        saturation_point(&self.steps, self.tolerance)
    }
}

/// The smallest dataset size whose best speedup differs from the next
/// measured size's by less than `tolerance`, relative to itself.
#[must_use]
pub fn saturation_point(steps: &[SaturationStep], tolerance: f64) -> Option<usize> {
    steps.windows(2).find_map(|pair| {
        let current = pair[0].best_speedup()?;
        let next = pair[1].best_speedup()?;
        (current > 0.0 && ((next - current) / current).abs() < tolerance)
            .then_some(pair[0].image_count)
    })
}

impl<D: Dispatch, S: RecordStore> Orchestrator<D, S> {
    /// Measure speedup at increasing dataset sizes with a fixed worker
    /// count.
    ///
    /// Each size runs a serial reference ([`SERIAL_BASELINE`], one worker)
    /// and then every configured strategy at `workers`. A target larger
    /// than the dataset runs once at the dataset size, after which the
    /// search stops. Results are not written to the record store.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::InvalidConfig`] for no targets, a zero target
    /// or a negative tolerance, and [`SweepError::Input`] or
    /// [`SweepError::NoImages`] if the input directory is unusable.
    pub fn run_saturation(
        &self,
        targets: &[usize],
        workers: NonZeroUsize,
        tolerance: f64,
    ) -> Result<SaturationOutcome, SweepError> {
        if tolerance.is_nan() || tolerance < 0.0 {
            return Err(SweepError::InvalidConfig(format!(
                "tolerance must be non-negative, got {tolerance}"
            )));
        }
        let targets = sorted_image_counts(targets)?;
        let catalog = InputCatalog::open(&self.config().input_dir)?;

        let mut outcome = SaturationOutcome {
            worker_count: workers.get(),
            tolerance,
            steps: Vec::new(),
            runs: Vec::new(),
            failures: Vec::new(),
            adjustments: Vec::new(),
        };
        tracing::info!(
            targets = ?targets,
            workers = workers.get(),
            available = catalog.available(),
            "starting saturation search"
        );

        let mut last = 0;
        for target in targets {
            let count = target.min(catalog.available());
            let exhausted = count < target;
            if exhausted {
                tracing::warn!(requested = target, available = count, "dataset exhausted");
                outcome.adjustments.push(CountAdjustment {
                    requested: target,
                    available: count,
                });
            }
            if count <= last {
                break;
            }
            last = count;

            let tasks = Task::batch(catalog.prefix(count), &self.config().output_dir, false);
            if let Some(step) = self.saturation_step(count, &tasks, workers, &mut outcome) {
                tracing::info!(
                    images = count,
                    serial = step.serial_seconds,
                    best_speedup = ?step.best_speedup(),
                    "saturation step"
                );
                outcome.steps.push(step);
            }
            if exhausted {
                break;
            }
        }

        if let Some(point) = outcome.saturation_point() {
            tracing::info!(images = point, "speedup saturates");
        }
        Ok(outcome)
    }

    fn saturation_step(
        &self,
        count: usize,
        tasks: &[Task],
        workers: NonZeroUsize,
        outcome: &mut SaturationOutcome,
    ) -> Option<SaturationStep> {
        let serial_key = CellKey::new(count, 1, SERIAL_BASELINE);
        let serial_seconds = match self.timed_run(SERIAL_BASELINE, tasks, NonZeroUsize::MIN) {
            Ok((seconds, results)) => {
                outcome.runs.push(RunSummary::from_results(serial_key, 1, tasks, &results));
                seconds
            }
            Err(err) => {
                tracing::warn!(images = count, error = %err, "serial reference failed");
                outcome.failures.push(CellFailure {
                    key: serial_key,
                    run_index: 1,
                    error: err.to_string(),
                });
                return None;
            }
        };

        let mut step_stats = Vec::new();
        for &strategy in &self.config().strategies {
            let key = CellKey::new(count, workers.get(), strategy);
            match self.timed_run(strategy, tasks, workers) {
                Ok((seconds, results)) => {
                    outcome.runs.push(RunSummary::from_results(key, 1, tasks, &results));
                    step_stats.push(stats::derive_stat(key, seconds, Some(serial_seconds)));
                }
                Err(err) => {
                    tracing::warn!(images = count, strategy = %strategy, error = %err, "pool failed");
                    outcome.failures.push(CellFailure {
                        key,
                        run_index: 1,
                        error: err.to_string(),
                    });
                }
            }
        }

        Some(SaturationStep {
            image_count: count,
            serial_seconds,
            stats: step_stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(image_count: usize, speedup: f64) -> SaturationStep {
        SaturationStep {
            image_count,
            serial_seconds: speedup,
            stats: vec![
                stats::derive_stat(CellKey::new(image_count, 4, Strategy::ThreadPool), 1.0, Some(1.0)),
                stats::derive_stat(
                    CellKey::new(image_count, 4, Strategy::ProcessPool),
                    1.0,
                    Some(speedup),
                ),
            ],
        }
    }

    #[test]
    fn best_speedup_takes_the_maximum() {
        assert_eq!(step(100, 3.0).best_speedup(), Some(3.0));
    }

    #[test]
    fn saturation_is_the_first_plateau() {
        let steps = [step(100, 1.5), step(500, 2.5), step(1000, 2.6), step(2000, 2.62)];
        assert_eq!(saturation_point(&steps, 0.05), Some(500));
    }

    #[test]
    fn no_plateau_means_no_point() {
        let steps = [step(100, 1.0), step(500, 2.0), step(1000, 3.0)];
        assert_eq!(saturation_point(&steps, 0.05), None);
        assert_eq!(saturation_point(&steps[..1], 0.05), None);
    }
}
