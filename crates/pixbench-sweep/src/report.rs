//! Plain-text tables for the terminal.

use std::fmt::Write;

use pixbench_pool::Strategy;

use crate::orchestrator::SweepOutcome;
use crate::record::{AggregatedStat, CellFailure, CountAdjustment, RunSummary};
use crate::saturation::SaturationOutcome;

const NA: &str = "N/A";

fn find(
    stats: &[AggregatedStat],
    image_count: usize,
    workers: usize,
    strategy: Strategy,
) -> Option<&AggregatedStat> {
    stats
        .iter()
        .find(|s| s.image_count == image_count && s.worker_count == workers && s.strategy == strategy)
}

fn table(
    out: &mut String,
    heading: &str,
    outcome: &SweepOutcome,
    image_count: usize,
    strategies: &[Strategy],
    cell: impl Fn(&AggregatedStat) -> Option<String>,
) {
    let _ = writeln!(out, "{heading}");
    let _ = write!(out, "{:>8}", "Workers");
    for strategy in strategies {
        let _ = write!(out, " {:>12}", strategy.label());
    }
    let _ = writeln!(out);
    for &workers in &outcome.worker_counts {
        let _ = write!(out, "{workers:>8}");
        for &strategy in strategies {
            let text = find(&outcome.aggregated, image_count, workers, strategy)
                .and_then(&cell)
                .unwrap_or_else(|| NA.to_string());
            let _ = write!(out, " {text:>12}");
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out);
}

fn adjustments(out: &mut String, adjustments: &[CountAdjustment]) {
    for adj in adjustments {
        let _ = writeln!(
            out,
            "note: requested {} images, only {} available",
            adj.requested, adj.available
        );
    }
}

fn failures(out: &mut String, runs: &[RunSummary], cells: &[CellFailure]) {
    let succeeded: usize = runs.iter().map(|r| r.succeeded).sum();
    let failed: usize = runs.iter().map(RunSummary::failed).sum();
    let _ = writeln!(out, "Tasks: {succeeded} succeeded, {failed} failed");

    for run in runs.iter().filter(|r| r.failed() > 0) {
        let _ = writeln!(
            out,
            "  {} images, {} workers, {} run {}: {} failed",
            run.key.image_count,
            run.key.worker_count,
            run.key.strategy,
            run.run_index,
            run.failed()
        );
        for (path, message) in &run.failures {
            let _ = writeln!(out, "    {}: {message}", path.display());
        }
    }

    for cell in cells {
        let _ = writeln!(
            out,
            "  pool failure: {} images, {} workers, {} run {}: {}",
            cell.key.image_count,
            cell.key.worker_count,
            cell.key.strategy,
            cell.run_index,
            cell.error
        );
    }
}

/// Mean time, speedup and efficiency tables for every image count, then
/// the task failure listing.
#[must_use]
pub fn format_sweep(outcome: &SweepOutcome, strategies: &[Strategy]) -> String {
    let mut out = String::new();
    adjustments(&mut out, &outcome.adjustments);
    if !outcome.reused.is_empty() {
        let _ = writeln!(out, "reused {} stored cells", outcome.reused.len());
    }
    if !outcome.adjustments.is_empty() || !outcome.reused.is_empty() {
        let _ = writeln!(out);
    }

    for &n in &outcome.image_counts {
        table(
            &mut out,
            &format!("Mean time (s), {n} images"),
            outcome,
            n,
            strategies,
            |s| Some(format!("{:.4}", s.mean_duration)),
        );
        table(
            &mut out,
            &format!("Speedup, {n} images"),
            outcome,
            n,
            strategies,
            |s| s.speedup.map(|v| format!("{v:.2}x")),
        );
        table(
            &mut out,
            &format!("Efficiency, {n} images"),
            outcome,
            n,
            strategies,
            |s| s.efficiency.map(|v| format!("{:.1}%", v * 100.0)),
        );
    }

    failures(&mut out, &outcome.runs, &outcome.failures);
    out
}

/// Outcome of a single batch.
#[must_use]
pub fn format_run(summary: &RunSummary, seconds: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({}) with {} workers: {} images in {seconds:.4}s",
        summary.key.strategy,
        summary.key.strategy.description(),
        summary.key.worker_count,
        summary.key.image_count
    );
    failures(&mut out, std::slice::from_ref(summary), &[]);
    out
}

/// Per-size speedup table and the saturation point.
#[must_use]
pub fn format_saturation(outcome: &SaturationOutcome, strategies: &[Strategy]) -> String {
    let mut out = String::new();
    adjustments(&mut out, &outcome.adjustments);

    let _ = writeln!(out, "Speedup vs serial, {} workers", outcome.worker_count);
    let _ = write!(out, "{:>8} {:>10}", "Images", "Serial(s)");
    for strategy in strategies {
        let _ = write!(out, " {:>12}", strategy.label());
    }
    let _ = writeln!(out);

    for step in &outcome.steps {
        let _ = write!(out, "{:>8} {:>10.4}", step.image_count, step.serial_seconds);
        for &strategy in strategies {
            let text = step
                .stats
                .iter()
                .find(|s| s.strategy == strategy)
                .and_then(|s| s.speedup)
                .map_or_else(|| NA.to_string(), |v| format!("{v:.2}x"));
            let _ = write!(out, " {text:>12}");
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out);

    match outcome.saturation_point() {
        Some(n) => {
            let _ = writeln!(
                out,
                "Speedup saturates at {n} images (change below {:.1}%)",
                outcome.tolerance * 100.0
            );
        }
        None => {
            let _ = writeln!(out, "No saturation within the measured sizes");
        }
    }
    failures(&mut out, &outcome.runs, &outcome.failures);
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::record::CellKey;
    use crate::stats::derive_stat;

    fn outcome() -> SweepOutcome {
        let key = CellKey::new(20, 2, Strategy::ThreadPool);
        SweepOutcome {
            image_counts: vec![20],
            worker_counts: vec![1, 2],
            aggregated: vec![
                derive_stat(CellKey::new(20, 1, Strategy::ProcessPool), 2.0, None),
                derive_stat(CellKey::new(20, 2, Strategy::ProcessPool), 1.0, Some(2.0)),
            ],
            runs: vec![RunSummary {
                key,
                run_index: 1,
                succeeded: 19,
                failures: vec![(PathBuf::from("bad.png"), "failed to load bad.png".to_string())],
            }],
            failures: vec![CellFailure {
                key,
                run_index: 2,
                error: "worker 0 crashed".to_string(),
            }],
            adjustments: vec![CountAdjustment {
                requested: 100,
                available: 20,
            }],
            ..SweepOutcome::default()
        }
    }

    #[test]
    fn sweep_report_lists_tables_and_failures() {
        let text = format_sweep(&outcome(), &[Strategy::ProcessPool, Strategy::ThreadPool]);
        assert!(text.contains("requested 100 images, only 20 available"));
        assert!(text.contains("Mean time (s), 20 images"));
        assert!(text.contains("2.00x"));
        assert!(text.contains("100.0%"));
        assert!(text.contains("N/A"));
        assert!(text.contains("Tasks: 19 succeeded, 1 failed"));
        assert!(text.contains("bad.png: failed to load bad.png"));
        assert!(text.contains("pool failure: 20 images, 2 workers, CF_Thread run 2"));
    }

    #[test]
    fn run_report_names_the_strategy() {
        let summary = RunSummary {
            key: CellKey::new(4, 2, Strategy::ProcessPool),
            run_index: 1,
            succeeded: 4,
            failures: Vec::new(),
        };
        let text = format_run(&summary, 0.5);
        assert!(text.starts_with("MP (process pool (chunked)) with 2 workers: 4 images in 0.5000s"));
        assert!(text.contains("4 succeeded, 0 failed"));
    }
}
