//! Command-line definitions.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use pixbench_pipeline::{DEFAULT_BRIGHTNESS, PipelineConfig, SharpenKernel};
use pixbench_pool::{ContextMode, Strategy};
use pixbench_sweep::DEFAULT_SATURATION_TOLERANCE;

/// Run an image filter pipeline through process and thread pools and
/// measure how each scales.
#[derive(Parser)]
#[command(name = "pixbench", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Amount added to the HSV value channel.
    #[arg(long, global = true, default_value_t = DEFAULT_BRIGHTNESS)]
    pub brightness: u8,

    /// Sharpen kernel.
    #[arg(long, global = true, value_enum, default_value_t = Sharpen::Strong)]
    pub sharpen: Sharpen,

    /// Let thread-pool workers run task bodies in parallel instead of
    /// through one shared execution context.
    #[arg(long, global = true)]
    pub free_threads: bool,

    /// More log output (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Pipeline configuration from the global flags.
    pub const fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            brightness: self.brightness,
            sharpen: match self.sharpen {
                Sharpen::Mild => SharpenKernel::Mild,
                Sharpen::Strong => SharpenKernel::Strong,
            },
        }
    }

    /// Thread-pool context mode from `--free-threads`.
    pub const fn context_mode(&self) -> ContextMode {
        if self.free_threads {
            ContextMode::Isolated
        } else {
            ContextMode::Shared
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process one batch of images with one strategy.
    Run(RunArgs),
    /// Time every strategy over image and worker counts.
    Sweep(SweepArgs),
    /// Grow the dataset until speedup stops improving.
    Saturation(SaturationArgs),
    /// Save every intermediate stage of the pipeline for one image.
    Steps(StepsArgs),
    /// Redraw tables and charts from an existing raw results file.
    Plot(PlotArgs),
    /// Serve pipeline requests on stdin/stdout (used by process pools).
    #[command(hide = true)]
    Worker(WorkerArgs),
}

/// Sharpen kernel selection.
#[derive(Clone, Copy, ValueEnum)]
pub enum Sharpen {
    /// Four-neighbour kernel.
    Mild,
    /// Eight-neighbour kernel.
    Strong,
}

/// Log line format.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human oriented.
    Pretty,
    /// One line per event.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

#[derive(Args)]
pub struct RunArgs {
    /// Directory of input images.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Process at most this many images.
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Number of workers [default: available parallelism].
    #[arg(short, long)]
    pub workers: Option<NonZeroUsize>,

    /// Strategy: mp, cfp or cf.
    #[arg(short, long, default_value = "mp")]
    pub method: Strategy,

    /// Write processed images to the output directory.
    #[arg(long)]
    pub save: bool,

    /// Directory for processed images.
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct SweepArgs {
    /// Directory of input images.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Image counts to sweep [default: 50].
    #[arg(short = 'n', long = "count", num_args = 1.., value_delimiter = ',')]
    pub counts: Vec<usize>,

    /// Worker counts to sweep [default: 1,2,4,8]. 1 is always added.
    #[arg(short, long, num_args = 1.., value_delimiter = ',')]
    pub workers: Vec<NonZeroUsize>,

    /// Repetitions per cell.
    #[arg(short, long, default_value = "3")]
    pub runs: NonZeroUsize,

    /// Strategies to compare [default: all].
    #[arg(short, long = "method", num_args = 1.., value_delimiter = ',')]
    pub methods: Vec<Strategy>,

    /// Directory for CSV files and charts.
    #[arg(long, default_value = "results")]
    pub results: PathBuf,

    /// Skip SVG charts.
    #[arg(long)]
    pub no_plots: bool,

    /// Reuse cells already in the raw results file.
    #[arg(long)]
    pub resume: bool,

    /// Pause before every timed run, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub cooldown_ms: u64,
}

#[derive(Args)]
pub struct SaturationArgs {
    /// Directory of input images.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Dataset sizes to try [default: 100,500,1000,2000,4000,6000,8000,10000].
    #[arg(short, long, num_args = 1.., value_delimiter = ',')]
    pub targets: Vec<usize>,

    /// Number of workers [default: available parallelism].
    #[arg(short, long)]
    pub workers: Option<NonZeroUsize>,

    /// Strategies to compare [default: all].
    #[arg(short, long = "method", num_args = 1.., value_delimiter = ',')]
    pub methods: Vec<Strategy>,

    /// Pause before every timed run, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub cooldown_ms: u64,

    /// Relative speedup change treated as a plateau.
    #[arg(long, default_value_t = DEFAULT_SATURATION_TOLERANCE)]
    pub tolerance: f64,

    /// Directory for CSV files and charts.
    #[arg(long, default_value = "results")]
    pub results: PathBuf,

    /// Skip the SVG chart.
    #[arg(long)]
    pub no_plots: bool,
}

#[derive(Args)]
pub struct StepsArgs {
    /// Image to process.
    #[arg(long)]
    pub image: PathBuf,

    /// Directory for the stage images.
    #[arg(short, long, default_value = "steps")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct PlotArgs {
    /// Raw results CSV written by `sweep`.
    #[arg(long, default_value = "results/benchmark_results.csv")]
    pub raw: PathBuf,

    /// Directory for the regenerated files [default: next to the raw file].
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Strategies to draw [default: those in the file].
    #[arg(short, long = "method", num_args = 1.., value_delimiter = ',')]
    pub methods: Vec<Strategy>,
}

#[derive(Args)]
pub struct WorkerArgs {
    /// Pipeline configuration as JSON.
    #[arg(long)]
    pub pipeline_json: String,
}
