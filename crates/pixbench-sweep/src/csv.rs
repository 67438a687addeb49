//! Hand-formatted CSV for raw, aggregated, summary and saturation results.
//!
//! Rows are written with fixed column order so files diff cleanly between
//! sessions. Raw times use `f64`'s `Display`, which is the shortest string
//! that parses back to the same value.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use pixbench_pool::Strategy;

use crate::error::StoreError;
use crate::record::{AggregatedStat, CellKey, RunRecord};
use crate::saturation::SaturationStep;
use crate::stats;

/// Header of the raw results file.
pub const RAW_HEADER: &str = "Images,Workers,Method,Time";

/// Header of the per-cell summary file.
pub const SUMMARY_HEADER: &str = "Images,Workers,Method,Mean,Speedup,Efficiency";

/// Header of the saturation results file.
pub const SATURATION_HEADER: &str = "Image_Count,Method,Time,Speedup,Efficiency";

/// Method column used for the serial baseline of a saturation step.
pub const SERIAL_LABEL: &str = "Serial";

const MISSING: &str = "N/A";

/// File name of the aggregated table for one image count.
#[must_use]
pub fn averaged_file_name(image_count: usize) -> String {
    format!("averaged_results_{image_count}.csv")
}

/// One raw row without a trailing newline.
#[must_use]
pub fn raw_row(record: &RunRecord) -> String {
    format!(
        "{},{},{},{}",
        record.image_count,
        record.worker_count,
        record.strategy.label(),
        record.duration_seconds
    )
}

/// Write raw rows, preceded by the header when `header` is set.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_raw(out: &mut impl Write, records: &[RunRecord], header: bool) -> io::Result<()> {
    if header {
        writeln!(out, "{RAW_HEADER}")?;
    }
    for record in records {
        writeln!(out, "{}", raw_row(record))?;
    }
    Ok(())
}

/// Parse a raw results file.
///
/// The header line and blank lines are skipped. Run indices are not
/// stored, so they are rebuilt from the order rows of one cell appear in.
///
/// # Errors
///
/// Returns [`StoreError::Parse`] for a row with the wrong number of
/// columns, an unknown method, or an unparsable number.
pub fn read_raw(text: &str) -> Result<Vec<RunRecord>, StoreError> {
    let mut runs: HashMap<CellKey, usize> = HashMap::new();
    let mut records = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line == RAW_HEADER {
            continue;
        }
        let line_no = i + 1;
        let parse_err = |message: String| StoreError::Parse {
            line: line_no,
            message,
        };

        let fields: Vec<&str> = line.split(',').collect();
        let [images, workers, method, time] = fields.as_slice() else {
            return Err(parse_err(format!("expected 4 columns, found {}", fields.len())));
        };

        let image_count = images
            .parse()
            .map_err(|e| parse_err(format!("image count {images:?}: {e}")))?;
        let worker_count: usize = workers
            .parse()
            .map_err(|e| parse_err(format!("worker count {workers:?}: {e}")))?;
        if worker_count == 0 {
            return Err(parse_err("worker count must be at least 1".to_string()));
        }
        let strategy: Strategy = method.parse().map_err(|e| parse_err(format!("{e}")))?;
        let duration_seconds = time
            .parse()
            .map_err(|e| parse_err(format!("time {time:?}: {e}")))?;

        let key = CellKey::new(image_count, worker_count, strategy);
        let run = runs.entry(key).or_insert(0);
        *run += 1;

        records.push(RunRecord {
            strategy,
            worker_count,
            image_count,
            run_index: *run,
            duration_seconds,
        });
    }
    Ok(records)
}

/// Write the per-run comparison table for one image count.
///
/// One row per worker count and run index, one time column per strategy
/// in `strategies` order, and the fastest strategy of the row. Times use
/// four decimals; a missing run is `N/A`.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_averaged(
    out: &mut impl Write,
    records: &[RunRecord],
    image_count: usize,
    strategies: &[Strategy],
) -> io::Result<()> {
    let mut table: BTreeMap<(usize, usize), HashMap<Strategy, f64>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.image_count == image_count) {
        table
            .entry((record.worker_count, record.run_index))
            .or_default()
            .insert(record.strategy, record.duration_seconds);
    }

    write!(out, "Workers,Run")?;
    for strategy in strategies {
        write!(out, ",{}", strategy.label())?;
    }
    writeln!(out, ",Best_Method")?;

    for ((workers, run), times) in &table {
        write!(out, "{workers},Run{run}")?;
        for strategy in strategies {
            match times.get(strategy) {
                Some(t) => write!(out, ",{t:.4}")?,
                None => write!(out, ",{MISSING}")?,
            }
        }
        let best = stats::fastest(
            strategies
                .iter()
                .filter_map(|s| times.get(s).map(|&t| (*s, t))),
        );
        match best {
            Some(strategy) => writeln!(out, ",{}", strategy.label())?,
            None => writeln!(out, ",{MISSING}")?,
        }
    }
    Ok(())
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.4}"))
}

/// Write one row per aggregated cell.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_summary(out: &mut impl Write, stats: &[AggregatedStat]) -> io::Result<()> {
    writeln!(out, "{SUMMARY_HEADER}")?;
    for stat in stats {
        writeln!(
            out,
            "{},{},{},{:.4},{},{}",
            stat.image_count,
            stat.worker_count,
            stat.strategy.label(),
            stat.mean_duration,
            optional(stat.speedup),
            optional(stat.efficiency),
        )?;
    }
    Ok(())
}

/// Write the saturation search results: a serial row then one row per
/// strategy for every measured dataset size.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_saturation(out: &mut impl Write, steps: &[SaturationStep]) -> io::Result<()> {
    writeln!(out, "{SATURATION_HEADER}")?;
    for step in steps {
        writeln!(
            out,
            "{},{SERIAL_LABEL},{:.4},1.0000,1.0000",
            step.image_count, step.serial_seconds
        )?;
        for stat in &step.stats {
            writeln!(
                out,
                "{},{},{:.4},{},{}",
                step.image_count,
                stat.strategy.label(),
                stat.mean_duration,
                optional(stat.speedup),
                optional(stat.efficiency),
            )?;
        }
    }
    Ok(())
}

/// Create (or truncate) `path` and hand a buffered writer to `write`.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be created, written or
/// flushed.
pub fn write_file(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    write(&mut out).map_err(io_err)?;
    out.flush().map_err(io_err)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(strategy: Strategy, workers: usize, run: usize, secs: f64) -> RunRecord {
        RunRecord {
            strategy,
            worker_count: workers,
            image_count: 8,
            run_index: run,
            duration_seconds: secs,
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn raw_rows_read_back_identically() {
        let records = vec![
            record(Strategy::ProcessPool, 1, 1, 0.1),
            record(Strategy::ProcessPool, 1, 2, 1.0 / 3.0),
            record(Strategy::ThreadPool, 4, 1, 12.345_678_901_234),
            record(Strategy::ProcessExecutor, 2, 1, 7e-9),
        ];
        let text = render(|out| write_raw(out, &records, true));
        assert!(text.starts_with("Images,Workers,Method,Time\n"));
        assert_eq!(read_raw(&text).unwrap(), records);
    }

    #[test]
    fn run_indices_follow_appearance_order() {
        let text = "8,2,MP,1.5\n8,2,CF_Thread,2\n8,2,MP,1.25\n";
        let records = read_raw(text).unwrap();
        let indices: Vec<_> = records.iter().map(|r| r.run_index).collect();
        assert_eq!(indices, [1, 1, 2]);
    }

    #[test]
    fn malformed_rows_report_their_line() {
        let err = read_raw("Images,Workers,Method,Time\n8,2,GPU,1.0\n").unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 2, .. }), "{err}");

        let err = read_raw("8,2,MP\n").unwrap_err();
        assert!(err.to_string().contains("expected 4 columns"), "{err}");

        let err = read_raw("8,0,MP,1.0\n").unwrap_err();
        assert!(matches!(err, StoreError::Parse { line: 1, .. }));
    }

    #[test]
    fn averaged_table_marks_best_and_missing() {
        let records = [
            record(Strategy::ProcessPool, 1, 1, 2.0),
            record(Strategy::ThreadPool, 1, 1, 1.5),
            record(Strategy::ProcessPool, 2, 1, 1.0),
        ];
        let text = render(|out| {
            write_averaged(
                out,
                &records,
                8,
                &[Strategy::ProcessPool, Strategy::ThreadPool],
            )
        });
        assert_eq!(
            text,
            "Workers,Run,MP,CF_Thread,Best_Method\n\
             1,Run1,2.0000,1.5000,CF_Thread\n\
             2,Run1,1.0000,N/A,MP\n"
        );
    }

    #[test]
    fn summary_prints_missing_speedup_as_na() {
        let stats = [
            stats::derive_stat(CellKey::new(8, 1, Strategy::ProcessPool), 2.0, None),
            stats::derive_stat(CellKey::new(8, 2, Strategy::ThreadPool), 1.0, None),
        ];
        let text = render(|out| write_summary(out, &stats));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], SUMMARY_HEADER);
        assert_eq!(lines[1], "8,1,MP,2.0000,1.0000,1.0000");
        assert_eq!(lines[2], "8,2,CF_Thread,1.0000,N/A,N/A");
    }

    #[test]
    fn saturation_rows_start_with_serial() {
        let step = SaturationStep {
            image_count: 100,
            serial_seconds: 4.0,
            stats: vec![stats::derive_stat(
                CellKey::new(100, 4, Strategy::ProcessPool),
                1.0,
                Some(4.0),
            )],
        };
        let text = render(|out| write_saturation(out, &[step]));
        assert_eq!(
            text,
            "Image_Count,Method,Time,Speedup,Efficiency\n\
             100,Serial,4.0000,1.0000,1.0000\n\
             100,MP,1.0000,4.0000,1.0000\n"
        );
    }

    #[test]
    fn write_file_creates_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(averaged_file_name(8));
        write_file(&path, |out| write_raw(out, &[], true)).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Images,Workers,Method,Time\n");
    }
}
