//! Subcommand implementations.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pixbench_pipeline::{PipelineConfig, grayscale};
use pixbench_pool::{Dispatch, Dispatcher, Strategy, Task, list_images, run_worker, save_image};
use pixbench_sweep::{
    BenchmarkConfig, CellKey, CsvRecordStore, DEFAULT_IMAGE_COUNTS, DEFAULT_SATURATION_TARGETS,
    DEFAULT_WORKER_COUNTS, MemoryRecordStore, Orchestrator, RunSummary, chart, csv, report,
    stats,
};
use serde::Serialize;

use crate::cli::{Cli, PlotArgs, RunArgs, SaturationArgs, StepsArgs, SweepArgs, WorkerArgs};
use crate::error::CliError;

/// Raw results file inside the results directory.
pub const RAW_FILE: &str = "benchmark_results.csv";
/// Per-cell summary file inside the results directory.
pub const SUMMARY_FILE: &str = "summary.csv";
/// Saturation results file inside the results directory.
pub const SATURATION_FILE: &str = "saturation_results.csv";
/// Session description inside the results directory.
pub const SESSION_FILE: &str = "session.json";

/// What a sweep was asked to do, saved next to its results.
#[derive(Serialize)]
struct Session<'a> {
    benchmark: &'a BenchmarkConfig,
    pipeline: PipelineConfig,
    free_threads: bool,
    image_counts: &'a [usize],
    worker_counts: &'a [usize],
    runs: usize,
}

fn default_workers() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

fn dispatcher(cli: &Cli) -> Result<Dispatcher, CliError> {
    let program = std::env::current_exe().map_err(CliError::CurrentExe)?;
    Ok(Dispatcher::for_pipeline(
        program,
        cli.pipeline(),
        cli.context_mode(),
    ))
}

fn create_dir(path: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn strategies_or_all(methods: &[Strategy]) -> Vec<Strategy> {
    if methods.is_empty() {
        Strategy::ALL.to_vec()
    } else {
        methods.to_vec()
    }
}

pub fn run(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let paths = list_images(&args.input, args.count)?;
    if paths.is_empty() {
        return Err(CliError::NoImages {
            path: args.input.clone(),
        });
    }
    if let Some(count) = args.count
        && paths.len() < count
    {
        tracing::warn!(requested = count, available = paths.len(), "not enough images");
    }

    let workers = args.workers.unwrap_or_else(default_workers);
    let tasks = Task::batch(&paths, &args.output, args.save);
    let dispatcher = dispatcher(cli)?;

    println!(
        "Processing {} images from {} with {} ({}), {} workers",
        tasks.len(),
        args.input.display(),
        args.method,
        args.method.description(),
        workers
    );
    if args.save {
        println!("Saving to {}", args.output.display());
    }

    let start = Instant::now();
    let results = dispatcher.dispatch(args.method, &tasks, workers)?;
    let seconds = start.elapsed().as_secs_f64();

    let key = CellKey::new(tasks.len(), workers.get(), args.method);
    let summary = RunSummary::from_results(key, 1, &tasks, &results);
    print!("{}", report::format_run(&summary, seconds));
    Ok(())
}

pub fn sweep(cli: &Cli, args: &SweepArgs) -> Result<(), CliError> {
    create_dir(&args.results)?;

    let mut config = BenchmarkConfig::new(&args.input, args.results.join("output"));
    config.strategies = strategies_or_all(&args.methods);
    config.cooldown = Duration::from_millis(args.cooldown_ms);
    config.resume = args.resume;

    let raw_path = args.results.join(RAW_FILE);
    if !args.resume && raw_path.exists() {
        tracing::info!(path = %raw_path.display(), "starting a fresh raw results file");
        std::fs::remove_file(&raw_path).map_err(|source| CliError::Io {
            path: raw_path.clone(),
            source,
        })?;
    }
    let store = CsvRecordStore::open(&raw_path)?;

    let counts = if args.counts.is_empty() {
        DEFAULT_IMAGE_COUNTS.to_vec()
    } else {
        args.counts.clone()
    };
    let workers: Vec<NonZeroUsize> = if args.workers.is_empty() {
        DEFAULT_WORKER_COUNTS
            .iter()
            .filter_map(|&w| NonZeroUsize::new(w))
            .collect()
    } else {
        args.workers.clone()
    };

    let mut orchestrator = Orchestrator::new(config, dispatcher(cli)?, store)?;
    let outcome = orchestrator.run_sweep(&counts, &workers, args.runs)?;
    let strategies = orchestrator.config().strategies.clone();

    let session = Session {
        benchmark: orchestrator.config(),
        pipeline: cli.pipeline(),
        free_threads: cli.free_threads,
        image_counts: &outcome.image_counts,
        worker_counts: &outcome.worker_counts,
        runs: args.runs.get(),
    };
    let session_path = args.results.join(SESSION_FILE);
    let json = serde_json::to_string_pretty(&session).map_err(CliError::Session)?;
    std::fs::write(&session_path, json).map_err(|source| CliError::Io {
        path: session_path,
        source,
    })?;

    for &n in &outcome.image_counts {
        csv::write_file(&args.results.join(csv::averaged_file_name(n)), |out| {
            csv::write_averaged(out, &outcome.raw, n, &strategies)
        })?;
    }
    csv::write_file(&args.results.join(SUMMARY_FILE), |out| {
        csv::write_summary(out, &outcome.aggregated)
    })?;
    if !args.no_plots {
        chart::write_charts(
            &args.results,
            &outcome.aggregated,
            &outcome.image_counts,
            &strategies,
        )?;
    }

    print!("{}", report::format_sweep(&outcome, &strategies));
    println!("Results written to {}", args.results.display());
    Ok(())
}

pub fn saturation(cli: &Cli, args: &SaturationArgs) -> Result<(), CliError> {
    create_dir(&args.results)?;

    let mut config = BenchmarkConfig::new(&args.input, args.results.join("output"));
    config.strategies = strategies_or_all(&args.methods);
    config.cooldown = Duration::from_millis(args.cooldown_ms);

    let targets = if args.targets.is_empty() {
        DEFAULT_SATURATION_TARGETS.to_vec()
    } else {
        args.targets.clone()
    };
    let workers = args.workers.unwrap_or_else(default_workers);

    let orchestrator = Orchestrator::new(config, dispatcher(cli)?, MemoryRecordStore::new())?;
    let outcome = orchestrator.run_saturation(&targets, workers, args.tolerance)?;
    let strategies = &orchestrator.config().strategies;

    csv::write_file(&args.results.join(SATURATION_FILE), |out| {
        csv::write_saturation(out, &outcome.steps)
    })?;
    if !args.no_plots {
        chart::write_saturation_chart(&args.results, &outcome, strategies)?;
    }

    print!("{}", report::format_saturation(&outcome, strategies));
    Ok(())
}

pub fn steps(cli: &Cli, args: &StepsArgs) -> Result<(), CliError> {
    let bytes = std::fs::read(&args.image).map_err(|source| CliError::Io {
        path: args.image.clone(),
        source,
    })?;
    let pipeline_err = |source| CliError::Pipeline {
        path: args.image.clone(),
        source,
    };
    let rgb = grayscale::decode_rgb(&bytes).map_err(pipeline_err)?;
    let staged = pixbench_pipeline::process_staged(rgb, &cli.pipeline()).map_err(pipeline_err)?;

    create_dir(&args.output)?;
    for (i, (name, image)) in staged.stages().iter().enumerate() {
        let path = args.output.join(format!("{i}_{name}.png"));
        save_image(image, &path).map_err(|source| CliError::Save {
            path: path.clone(),
            source,
        })?;
        println!("{}", path.display());
    }
    Ok(())
}

pub fn plot(args: &PlotArgs) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&args.raw).map_err(|source| CliError::Io {
        path: args.raw.clone(),
        source,
    })?;
    let records = csv::read_raw(&text)?;

    let strategies: Vec<Strategy> = if args.methods.is_empty() {
        records
            .iter()
            .map(|r| r.strategy)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        args.methods.clone()
    };
    let image_counts: Vec<usize> = records
        .iter()
        .map(|r| r.image_count)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let aggregated = stats::aggregate(&records);

    let dir: PathBuf = args.output.clone().unwrap_or_else(|| {
        args.raw
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    });
    create_dir(&dir)?;

    for &n in &image_counts {
        csv::write_file(&dir.join(csv::averaged_file_name(n)), |out| {
            csv::write_averaged(out, &records, n, &strategies)
        })?;
    }
    csv::write_file(&dir.join(SUMMARY_FILE), |out| {
        csv::write_summary(out, &aggregated)
    })?;
    let charts = chart::write_charts(&dir, &aggregated, &image_counts, &strategies)?;

    println!(
        "{} records, {} charts written to {}",
        records.len(),
        charts.len(),
        dir.display()
    );
    Ok(())
}

pub fn worker(args: &WorkerArgs) -> Result<(), CliError> {
    let config: PipelineConfig =
        serde_json::from_str(&args.pipeline_json).map_err(CliError::PipelineJson)?;
    let served = run_worker(config)?;
    tracing::debug!(batches = served, pid = std::process::id(), "worker exiting");
    Ok(())
}
