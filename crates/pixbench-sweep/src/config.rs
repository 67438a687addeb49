//! Benchmark session configuration.

use std::path::PathBuf;
use std::time::Duration;

use pixbench_pool::Strategy;
use serde::{Deserialize, Serialize};

use crate::error::SweepError;

/// Default image counts swept when none are given.
pub const DEFAULT_IMAGE_COUNTS: [usize; 1] = [50];

/// Default worker counts swept when none are given.
pub const DEFAULT_WORKER_COUNTS: [usize; 4] = [1, 2, 4, 8];

/// Default dataset sizes for the saturation search.
pub const DEFAULT_SATURATION_TARGETS: [usize; 8] = [100, 500, 1000, 2000, 4000, 6000, 8000, 10000];

/// Default relative speedup change under which the saturation search
/// considers speedup to have plateaued.
pub const DEFAULT_SATURATION_TOLERANCE: f64 = 0.05;

/// Everything the orchestrator needs besides the sweep dimensions.
///
/// Passed explicitly to [`crate::Orchestrator::new`]; nothing is read from
/// global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Directory scanned for input images.
    pub input_dir: PathBuf,

    /// Output directory recorded in every task. Benchmarks never save, so
    /// nothing is written here.
    pub output_dir: PathBuf,

    /// Strategies compared, in reporting order.
    pub strategies: Vec<Strategy>,

    /// Pause before every timed run to let the machine settle.
    #[serde(with = "duration_millis")]
    pub cooldown: Duration,

    /// Reuse records already in the store instead of re-running their cell.
    pub resume: bool,
}

impl BenchmarkConfig {
    /// All strategies, no cool-down, no resume.
    #[must_use]
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            strategies: Strategy::ALL.to_vec(),
            cooldown: Duration::ZERO,
            resume: false,
        }
    }

    /// Check the configuration before a session starts.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::InvalidConfig`] if no strategy is selected or a
    /// strategy is listed twice.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.strategies.is_empty() {
            return Err(SweepError::InvalidConfig(
                "at least one strategy is required".to_string(),
            ));
        }
        for (i, strategy) in self.strategies.iter().enumerate() {
            if self.strategies[..i].contains(strategy) {
                return Err(SweepError::InvalidConfig(format!(
                    "strategy {strategy} is listed more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Serialize a [`Duration`] as integer milliseconds.
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_selects_every_strategy() {
        let config = BenchmarkConfig::new("in", "out");
        assert_eq!(config.strategies, Strategy::ALL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_strategy_list_is_rejected() {
        let mut config = BenchmarkConfig::new("in", "out");
        config.strategies.clear();
        assert!(matches!(config.validate(), Err(SweepError::InvalidConfig(_))));
    }

    #[test]
    fn duplicate_strategy_is_rejected() {
        let mut config = BenchmarkConfig::new("in", "out");
        config.strategies = vec![Strategy::ThreadPool, Strategy::ThreadPool];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CF_Thread"), "{err}");
    }
}
