//! pixbench-sweep: benchmark sessions over the pools in `pixbench-pool`.
//!
//! An [`Orchestrator`] sweeps every configured [`Strategy`] over image
//! and worker counts, times each run, and derives speedup and efficiency
//! against the single-worker cell. Measured runs go to an injected
//! [`RecordStore`] so an interrupted sweep can resume. Results are
//! rendered as CSV ([`csv`]), terminal tables ([`report`]) and SVG charts
//! ([`chart`]).
//!
//! [`Strategy`]: pixbench_pool::Strategy

pub mod catalog;
pub mod chart;
pub mod config;
pub mod csv;
pub mod error;
pub mod orchestrator;
pub mod record;
pub mod report;
pub mod saturation;
pub mod stats;
pub mod store;

pub use catalog::InputCatalog;
pub use config::{
    BenchmarkConfig, DEFAULT_IMAGE_COUNTS, DEFAULT_SATURATION_TARGETS,
    DEFAULT_SATURATION_TOLERANCE, DEFAULT_WORKER_COUNTS,
};
pub use error::{StoreError, SweepError};
pub use orchestrator::{Orchestrator, SweepOutcome};
pub use record::{AggregatedStat, CellFailure, CellKey, CountAdjustment, RunRecord, RunSummary};
pub use saturation::{SERIAL_BASELINE, SaturationOutcome, SaturationStep, saturation_point};
pub use store::{CsvRecordStore, MemoryRecordStore, RecordStore};
