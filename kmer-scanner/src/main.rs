use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tf_disorder_kmers::config::PipelineConfig;
use tf_disorder_kmers::error::KmerError;
use tf_disorder_kmers::pipeline::{self, JobStats, SplitMode};
use tf_disorder_kmers::report::ReportView;
use tf_disorder_kmers::segment::ChainBreakRule;

#[derive(thiserror::Error, Debug)]
pub enum ScannerError {
    #[error(transparent)]
    Kmer(#[from] KmerError),
}

#[derive(Parser, Debug)]
#[command(
    name = "kmer-scanner",
    about = "Segments transcription factor disorder reports and counts k-mer frequencies",
    long_about = "Batch tools for per-residue disorder-prediction reports of transcription \
                  factors. Reports are split into one segment per factor wherever residue \
                  numbering restarts, k-mers are counted over each segment for a sweep of \
                  window sizes, and frequent patterns are aggregated into per-cohort \
                  summary matrices.",
    version,
    after_help = "Example usage:\n    \
                  kmer-scanner windows reports/ output/ --min-window 3 --max-window 11\n    \
                  kmer-scanner split reports/ regions/\n    \
                  kmer-scanner summary output/3 --prefix 1. --prefix 2. --out-dir summaries/",
    color = clap::ColorChoice::Always
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// TOML file with pipeline settings; flags below override it
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Minimum occurrences for a pattern to count as frequent
    #[arg(long, global = true)]
    min_count: Option<u32>,

    /// Smallest window size of the sweep
    #[arg(long, global = true)]
    min_window: Option<usize>,

    /// Largest window size of the sweep
    #[arg(long, global = true)]
    max_window: Option<usize>,

    /// Log per-file details
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ViewArg {
    /// One row per unique pattern, sorted
    Sorted,
    /// One row per sliding step, in sequence order
    Traversal,
}

impl From<ViewArg> for ReportView {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Sorted => ReportView::Sorted,
            ViewArg::Traversal => ReportView::Traversal,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Segment every report and write one k-mer report per factor and window size
    Windows {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, value_enum, default_value = "sorted")]
        view: ViewArg,
        /// Also break segments where the secondary position column decreases
        #[arg(long)]
        paired_positions: bool,
    },
    /// Split each factor into DNA-binding and non-binding residue tables
    Split {
        input: PathBuf,
        output: PathBuf,
        /// Only extract anchored residues, grouped by family directory
        #[arg(long)]
        anchor_only: bool,
    },
    /// Count k-mers over whole split-region files
    RegionWindows {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, value_enum, default_value = "traversal")]
        view: ViewArg,
    },
    /// Build per-cohort summary matrices from window reports
    Summary {
        input: PathBuf,
        /// Cohort identifier prefix, e.g. "1."; repeat for several cohorts
        #[arg(long, required = true)]
        prefix: Vec<String>,
        /// Base name of the CSV files, e.g. "DBD" gives superclass_1_DBD_summary.csv
        #[arg(long, default_value = "kmer")]
        label: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Weighted amino-acid distribution of frequent patterns per report
    Distribution { input: PathBuf, output: PathBuf },
    /// List split-region files whose disorder percentage reaches a threshold
    Disorder {
        input: PathBuf,
        /// Threshold percentage between 0 and 100
        #[arg(long)]
        threshold: f64,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Normalised disorder preference score per amino acid for each cohort
    Preference {
        input: PathBuf,
        #[arg(long, required = true)]
        prefix: Vec<String>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Export every segment as a FASTA record
    Fasta { input: PathBuf, output: PathBuf },
}

fn load_config(args: &CommonArgs) -> Result<PipelineConfig, ScannerError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(min_count) = args.min_count {
        config.min_occurrence_count = min_count;
    }
    if args.min_window.is_some() || args.max_window.is_some() {
        let sizes = config.sorted_window_sizes();
        let min = args
            .min_window
            .or_else(|| sizes.first().copied())
            .unwrap_or(tf_disorder_kmers::config::DEFAULT_MIN_WINDOW);
        let max = args
            .max_window
            .or_else(|| sizes.last().copied())
            .unwrap_or(tf_disorder_kmers::config::DEFAULT_MAX_WINDOW);
        config = config.with_window_range(min, max)?;
    }
    config.validate()?;
    Ok(config)
}

fn cohort_label(prefix: &str) -> &str {
    prefix.trim_end_matches('.')
}

fn report(job: &str, stats: JobStats) {
    log::info!(
        "{job}: {} files seen, {} processed, {} skipped, {} failed, {} outputs written",
        stats.files_seen,
        stats.files_processed,
        stats.files_skipped,
        stats.files_failed,
        stats.outputs_written
    );
}

fn main() -> Result<(), ScannerError> {
    let start_time = std::time::Instant::now();

    let cli = Cli::parse();

    let level = if cli.common.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = load_config(&cli.common)?;

    match cli.command {
        Command::Windows {
            input,
            output,
            view,
            paired_positions,
        } => {
            if paired_positions {
                config.chain_break = ChainBreakRule::PrimaryAndSecondary;
                config.validate()?;
            }
            let stats = pipeline::run_window_sweep(&input, &output, &config, view.into())?;
            report("windows", stats);
        }
        Command::Split {
            input,
            output,
            anchor_only,
        } => {
            let mode = if anchor_only {
                SplitMode::AnchorOnly
            } else {
                SplitMode::BindingAndNonBinding
            };
            let stats = pipeline::run_region_split(&input, &output, &config, mode)?;
            report("split", stats);
        }
        Command::RegionWindows {
            input,
            output,
            view,
        } => {
            let stats = pipeline::run_region_windows(&input, &output, &config, view.into())?;
            report("region-windows", stats);
        }
        Command::Summary {
            input,
            prefix,
            label,
            out_dir,
        } => {
            for p in &prefix {
                let name = format!("superclass_{}_{label}_summary.csv", cohort_label(p));
                let csv = out_dir.join(name);
                pipeline::run_cohort_summary(&input, p, &csv, &config)?;
            }
        }
        Command::Distribution { input, output } => {
            let stats = pipeline::run_residue_distribution(&input, &output, &config)?;
            report("distribution", stats);
        }
        Command::Disorder {
            input,
            threshold,
            output,
        } => {
            let csv = output.unwrap_or_else(|| {
                PathBuf::from(format!("DBD_disorder_above_{}.csv", threshold as i64))
            });
            pipeline::run_disorder_threshold(&input, &csv, threshold, &config)?;
        }
        Command::Preference {
            input,
            prefix,
            out_dir,
        } => {
            for p in &prefix {
                let csv = out_dir.join(format!(
                    "superclass_{}_normalized_scores.csv",
                    cohort_label(p)
                ));
                pipeline::run_disorder_preference(&input, p, &csv, &config)?;
            }
        }
        Command::Fasta { input, output } => {
            let n = pipeline::export_segments_fasta(&input, &output, &config)?;
            log::info!("{n} segments written to {}", output.display());
        }
    }

    let elapsed = start_time.elapsed();
    log::info!(
        "Total execution time: {:.4} minutes",
        elapsed.as_secs_f64() / 60.0
    );

    Ok(())
}
