//! Aggregation of raw run records into means, speedup and efficiency.

use std::collections::BTreeMap;

use pixbench_pool::Strategy;

use crate::record::{AggregatedStat, CellKey, RunRecord};

/// Arithmetic mean, or `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    Some(values.iter().sum::<f64>() / n)
}

/// Derive a cell's stat from its mean and its baseline cell's mean.
///
/// A single-worker cell is its own baseline: speedup and efficiency are
/// exactly 1.0 without dividing. Otherwise speedup is
/// `baseline_mean / mean_duration`, absent when the baseline is missing
/// or either mean is not positive.
#[must_use]
pub fn derive_stat(key: CellKey, mean_duration: f64, baseline_mean: Option<f64>) -> AggregatedStat {
    let speedup = if key.worker_count == 1 {
        Some(1.0)
    } else {
        baseline_mean
            .filter(|&base| base > 0.0 && mean_duration > 0.0)
            .map(|base| base / mean_duration)
    };
    #[allow(clippy::cast_precision_loss)]
    let efficiency = speedup.map(|s| s / key.worker_count as f64);

    AggregatedStat {
        strategy: key.strategy,
        worker_count: key.worker_count,
        image_count: key.image_count,
        mean_duration,
        speedup,
        efficiency,
    }
}

/// Group records by cell and derive one stat per cell, ordered by
/// image count, worker count, then strategy.
#[must_use]
pub fn aggregate(records: &[RunRecord]) -> Vec<AggregatedStat> {
    let mut cells: BTreeMap<CellKey, Vec<f64>> = BTreeMap::new();
    for record in records {
        cells
            .entry(record.key())
            .or_default()
            .push(record.duration_seconds);
    }

    let means: BTreeMap<CellKey, f64> = cells
        .iter()
        .filter_map(|(key, durations)| mean(durations).map(|m| (*key, m)))
        .collect();

    means
        .iter()
        .map(|(key, &m)| derive_stat(*key, m, means.get(&key.baseline()).copied()))
        .collect()
}

/// The strategy with the lowest time. Ties go to the earlier entry.
#[must_use]
pub fn fastest(times: impl IntoIterator<Item = (Strategy, f64)>) -> Option<Strategy> {
    times
        .into_iter()
        .fold(None, |best: Option<(Strategy, f64)>, (strategy, time)| match best {
            Some((_, best_time)) if best_time <= time => best,
            _ => Some((strategy, time)),
        })
        .map(|(strategy, _)| strategy)
}
