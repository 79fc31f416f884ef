//! Batch jobs composed from the parsing, segmentation, counting and aggregation
//! components.
//!
//! Failures are confined to the unit they occur in: a bad line is skipped by the
//! parser, an unreadable file is logged and counted, and a job always returns
//! whatever it managed to produce. Every output file is rendered in memory and
//! written with a single call.

use crate::aggregate::{residue_tally_frame, write_frame_csv, CohortAggregator, SummaryMatrix};
use crate::config::{ColumnLayout, PipelineConfig};
use crate::disorder::{
    summarize, threshold_frame, validate_threshold, DisorderComposition, DisorderSummary,
};
use crate::error::Result;
use crate::fasta::{segments_frame, write_fasta};
use crate::kmer::{count_patterns, weigh_residues};
use crate::records::RecordParser;
use crate::report::{read_report_counts, render_segment_report, render_sequence_report, ReportView};
use crate::segment::{render_region_table, segment_records, ChainBreakRule};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Output directory for DNA-binding (anchored) regions
pub const BINDING_REGION_DIR: &str = "DBD-Region";
/// Output directory for the remaining residues of each factor
pub const NON_BINDING_REGION_DIR: &str = "Non-DBD-Region";

/// Per-job tallies of processed input files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    pub files_seen: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub outputs_written: usize,
}

impl JobStats {
    fn tally(outcomes: Vec<(PathBuf, Result<FileOutcome>)>) -> Self {
        let mut stats = JobStats {
            files_seen: outcomes.len(),
            ..Default::default()
        };
        for (path, outcome) in outcomes {
            match outcome {
                Ok(FileOutcome::Written(n)) => {
                    stats.files_processed += 1;
                    stats.outputs_written += n;
                }
                Ok(FileOutcome::Skipped(reason)) => {
                    log::warn!("{}: skipped, {reason}", path.display());
                    stats.files_skipped += 1;
                }
                Err(e) => {
                    log::error!("{}: could not be processed: {e}", path.display());
                    stats.files_failed += 1;
                }
            }
        }
        stats
    }
}

enum FileOutcome {
    Written(usize),
    Skipped(&'static str),
}

fn is_report(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "txt")
}

/// Sorted `.txt` files under `root`. A `.txt` file given as `root` is returned
/// on its own; a missing directory yields no files.
pub fn discover_reports(root: &Path, recursive: bool) -> Vec<PathBuf> {
    if root.is_file() && is_report(root) {
        return vec![root.to_path_buf()];
    }
    if !root.is_dir() {
        log::warn!("input directory {} not found, skipping", root.display());
        return Vec::new();
    }
    let walker = if recursive {
        WalkDir::new(root)
    } else {
        WalkDir::new(root).max_depth(1)
    };
    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_report(p))
        .collect();
    files.sort();
    files
}

/// Keeps the first file per output key. Files are discovered in sorted order,
/// so the winner is stable; the rest come back as skipped outcomes instead of
/// overwriting the kept file's outputs.
fn claim_output_keys<F>(
    files: Vec<PathBuf>,
    key: F,
) -> (Vec<PathBuf>, Vec<(PathBuf, Result<FileOutcome>)>)
where
    F: Fn(&Path) -> String,
{
    let mut claimed = HashSet::new();
    let mut kept = Vec::with_capacity(files.len());
    let mut collisions = Vec::new();
    for path in files {
        if claimed.insert(key(&path)) {
            kept.push(path);
        } else {
            collisions.push((path, Ok(FileOutcome::Skipped("output name already taken"))));
        }
    }
    (kept, collisions)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Name of the directory holding `path`, used to group factor families.
fn family_name(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_output(path: &Path, content: String) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn cohort_files(input_dir: &Path, prefix: &str) -> Vec<PathBuf> {
    discover_reports(input_dir, false)
        .into_iter()
        .filter(|p| file_name(p).starts_with(prefix))
        .collect()
}

/// Segments every report under `input_root` and writes one k-mer report per
/// segment and window size to `<output_root>/<k>/<stem>/<stem>_TF_<n>_WS<k>.txt`.
///
/// Reports sharing a stem in different directories would write the same paths;
/// only the first in sorted order is processed, the others count as skipped.
pub fn run_window_sweep(
    input_root: &Path,
    output_root: &Path,
    config: &PipelineConfig,
    view: ReportView,
) -> Result<JobStats> {
    let preset = match config.chain_break {
        ChainBreakRule::Primary => ColumnLayout::residues(),
        ChainBreakRule::PrimaryAndSecondary => ColumnLayout::paired_positions(),
    };
    let parser = RecordParser::for_job(config, preset);
    let window_sizes = config.sorted_window_sizes();
    let files = discover_reports(input_root, true);
    log::info!(
        "window sweep over {} files, window sizes {:?}",
        files.len(),
        window_sizes
    );
    let (files, collisions) = claim_output_keys(files, file_stem);

    let mut outcomes: Vec<_> = files
        .into_par_iter()
        .map(|path| {
            let outcome = sweep_file(&path, output_root, &parser, config, &window_sizes, view);
            (path, outcome)
        })
        .collect();
    outcomes.extend(collisions);
    Ok(JobStats::tally(outcomes))
}

fn sweep_file(
    path: &Path,
    output_root: &Path,
    parser: &RecordParser,
    config: &PipelineConfig,
    window_sizes: &[usize],
    view: ReportView,
) -> Result<FileOutcome> {
    let table = parser.read_file(path)?;
    if table.records.is_empty() {
        return Ok(FileOutcome::Skipped("no residue records"));
    }

    let stem = file_stem(path);
    let segments = segment_records(table.records, config.chain_break);
    log::debug!("{}: {} segments", path.display(), segments.len());

    let mut written = 0;
    for &k in window_sizes {
        let dir = output_root.join(k.to_string()).join(&stem);
        for segment in &segments {
            let sequence = segment.sequence();
            let counts = count_patterns(&sequence, k);
            let report = render_segment_report(path, segment.number(), &sequence, k, &counts, view);
            let out = dir.join(format!("{stem}_TF_{}_WS{k}.txt", segment.number()));
            write_output(&out, report)?;
            written += 1;
        }
    }
    Ok(FileOutcome::Written(written))
}

/// What the region splitter writes for each segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SplitMode {
    /// Anchored residues to `DBD-Region/`, the rest to `Non-DBD-Region/`
    #[default]
    BindingAndNonBinding,
    /// Anchored residues only, grouped by the input file's parent directory
    AnchorOnly,
}

/// Splits each segment of every raw report into DNA-binding and non-binding tables.
pub fn run_region_split(
    input_root: &Path,
    output_root: &Path,
    config: &PipelineConfig,
    mode: SplitMode,
) -> Result<JobStats> {
    let parser = RecordParser::for_job(config, ColumnLayout::iu_report());
    let files = discover_reports(input_root, true);
    log::info!("region split ({mode:?}) over {} files", files.len());
    let (files, collisions) = match mode {
        SplitMode::BindingAndNonBinding => claim_output_keys(files, file_stem),
        SplitMode::AnchorOnly => {
            claim_output_keys(files, |p| format!("{}/{}", family_name(p), file_stem(p)))
        }
    };

    let mut outcomes: Vec<_> = files
        .into_par_iter()
        .map(|path| {
            let outcome = split_file(&path, output_root, &parser, config.chain_break, mode);
            (path, outcome)
        })
        .collect();
    outcomes.extend(collisions);
    Ok(JobStats::tally(outcomes))
}

fn split_file(
    path: &Path,
    output_root: &Path,
    parser: &RecordParser,
    rule: ChainBreakRule,
    mode: SplitMode,
) -> Result<FileOutcome> {
    let table = parser.read_file(path)?;
    if table.records.is_empty() {
        return Ok(FileOutcome::Skipped("no residue records"));
    }

    let stem = file_stem(path);
    let family = family_name(path);

    let mut written = 0;
    for segment in segment_records(table.records, rule) {
        let split = segment.split_regions();
        let n = segment.number();
        match mode {
            SplitMode::BindingAndNonBinding => {
                let name = format!("{stem}_TF_{n}.txt");
                for (dir, records) in [
                    (BINDING_REGION_DIR, &split.anchored),
                    (NON_BINDING_REGION_DIR, &split.unanchored),
                ] {
                    if records.is_empty() {
                        continue;
                    }
                    write_output(&output_root.join(dir).join(&name), render_region_table(records))?;
                    written += 1;
                }
            }
            SplitMode::AnchorOnly => {
                if split.anchored.is_empty() {
                    continue;
                }
                let out = output_root
                    .join(&family)
                    .join(format!("{stem}_TF_{n}_ANCHOR.txt"));
                write_output(&out, render_region_table(&split.anchored))?;
                written += 1;
            }
        }
    }
    Ok(FileOutcome::Written(written))
}

/// Counts k-mers over each split-region file taken as one sequence, writing
/// `<output_root>/<k>/<stem>_WS<k>.txt`.
pub fn run_region_windows(
    input_dir: &Path,
    output_root: &Path,
    config: &PipelineConfig,
    view: ReportView,
) -> Result<JobStats> {
    let parser = RecordParser::for_job(config, ColumnLayout::residues());
    let window_sizes = config.sorted_window_sizes();
    let files = discover_reports(input_dir, false);
    log::info!("region windows over {} files in {}", files.len(), input_dir.display());

    let outcomes: Vec<_> = files
        .into_par_iter()
        .map(|path| {
            let outcome = region_windows_file(&path, output_root, &parser, &window_sizes, view);
            (path, outcome)
        })
        .collect();
    Ok(JobStats::tally(outcomes))
}

fn region_windows_file(
    path: &Path,
    output_root: &Path,
    parser: &RecordParser,
    window_sizes: &[usize],
    view: ReportView,
) -> Result<FileOutcome> {
    let table = parser.read_file(path)?;
    let sequence: String = table.records.iter().map(|r| r.residue).collect();
    if sequence.is_empty() {
        return Ok(FileOutcome::Skipped("empty sequence"));
    }

    let name = file_name(path);
    let stem = file_stem(path);
    for &k in window_sizes {
        let counts = count_patterns(&sequence, k);
        let report = render_sequence_report(&name, &sequence, k, &counts, view);
        let out = output_root.join(k.to_string()).join(format!("{stem}_WS{k}.txt"));
        write_output(&out, report)?;
    }
    Ok(FileOutcome::Written(window_sizes.len()))
}

/// Builds the summary matrix for the cohort of reports in `input_dir` whose
/// name starts with `prefix`, and writes it to `output_csv`.
///
/// Every table is read before the header is formed. Returns `None` (and writes
/// nothing) when no file has a frequent pattern.
pub fn run_cohort_summary(
    input_dir: &Path,
    prefix: &str,
    output_csv: &Path,
    config: &PipelineConfig,
) -> Result<Option<SummaryMatrix>> {
    let files = cohort_files(input_dir, prefix);
    if files.is_empty() {
        log::warn!("no files matching '{prefix}*.txt' in {}", input_dir.display());
        return Ok(None);
    }
    log::info!("pass 1: reading {} reports for cohort '{prefix}'", files.len());

    let tables: Vec<_> = files
        .par_iter()
        .map(|path| (file_name(path), read_report_counts(path)))
        .collect();

    let mut cohort = CohortAggregator::new(config.min_occurrence_count);
    for (name, table) in tables {
        match table {
            Ok(table) => {
                cohort.add(name, table);
            }
            Err(e) => log::warn!("{name}: could not be read: {e}"),
        }
    }

    let n_columns = cohort.header().len();
    let Some(matrix) = cohort.finish() else {
        log::info!(
            "cohort '{prefix}': no pattern occurs at least {} times, no CSV written",
            config.min_occurrence_count
        );
        return Ok(None);
    };

    log::info!(
        "pass 2: writing {} rows x {n_columns} patterns to {}",
        matrix.row_ids().len(),
        output_csv.display()
    );
    matrix.write_csv(output_csv)?;
    Ok(Some(matrix))
}

/// Writes `<stem>_distribution.csv` per report: residues weighted by the counts
/// of the frequent patterns containing them.
pub fn run_residue_distribution(
    input_root: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<JobStats> {
    let files = discover_reports(input_root, true);
    log::info!("residue distribution over {} reports", files.len());
    let (files, collisions) = claim_output_keys(files, file_stem);

    let mut outcomes: Vec<_> = files
        .into_par_iter()
        .map(|path| {
            let outcome = distribution_file(&path, output_dir, config.min_occurrence_count);
            (path, outcome)
        })
        .collect();
    outcomes.extend(collisions);
    Ok(JobStats::tally(outcomes))
}

fn distribution_file(path: &Path, output_dir: &Path, min_count: u32) -> Result<FileOutcome> {
    let table = read_report_counts(path)?;
    if table.is_empty() {
        return Ok(FileOutcome::Skipped("no valid data rows"));
    }
    let tally = weigh_residues(table.frequent_counts(min_count));
    if tally.is_empty() {
        return Ok(FileOutcome::Skipped("no frequent patterns"));
    }

    let mut df = residue_tally_frame(&tally)?;
    let out = output_dir.join(format!("{}_distribution.csv", file_stem(path)));
    write_frame_csv(&mut df, &out, None)?;
    Ok(FileOutcome::Written(1))
}

/// Writes `filename,disorder_percentage` for split-region files whose disorder
/// percentage is at least `threshold_percentage`. Returns the number of rows.
pub fn run_disorder_threshold(
    input_root: &Path,
    output_csv: &Path,
    threshold_percentage: f64,
    config: &PipelineConfig,
) -> Result<usize> {
    validate_threshold(threshold_percentage)?;

    let parser = RecordParser::for_job(config, ColumnLayout::split_region());
    let mut entries: Vec<(String, DisorderSummary)> = Vec::new();
    for path in discover_reports(input_root, true) {
        let table = match parser.read_file(&path) {
            Ok(table) => table,
            Err(e) => {
                log::error!("{}: could not be read: {e}", path.display());
                continue;
            }
        };
        match summarize(&table.records, config.disorder_cutoff) {
            Some(summary) => {
                log::debug!(
                    "{}: {:.2}% disordered, mean score {:.3}",
                    path.display(),
                    summary.percentage(),
                    summary.mean_score
                );
                entries.push((path.to_string_lossy().into_owned(), summary));
            }
            None => log::warn!("{}: skipped, no scored residues", path.display()),
        }
    }

    let Some(mut df) = threshold_frame(&entries, threshold_percentage)? else {
        log::info!("no file reaches {threshold_percentage}% disorder, no CSV written");
        return Ok(0);
    };
    write_frame_csv(&mut df, output_csv, Some(2))?;
    log::info!("{} files written to {}", df.height(), output_csv.display());
    Ok(df.height())
}

/// Writes normalised disorder preference scores for the cohort of split-region
/// files in `input_dir` starting with `prefix`.
///
/// Returns `None` (and writes nothing) when no file carries a scored residue.
pub fn run_disorder_preference(
    input_dir: &Path,
    prefix: &str,
    output_csv: &Path,
    config: &PipelineConfig,
) -> Result<Option<DisorderComposition>> {
    let files = cohort_files(input_dir, prefix);
    if files.is_empty() {
        log::warn!("no files matching '{prefix}*.txt' in {}", input_dir.display());
        return Ok(None);
    }

    let parser = RecordParser::for_job(config, ColumnLayout::split_region());
    let mut composition = DisorderComposition::new();
    for path in &files {
        match parser.read_file(path) {
            Ok(table) => composition.add_records(&table.records, config.disorder_cutoff),
            Err(e) => log::warn!("{}: could not be read: {e}", path.display()),
        }
    }

    if composition.is_empty() {
        log::info!("cohort '{prefix}': no scored residues, no CSV written");
        return Ok(None);
    }

    let mut df = composition.to_frame()?;
    write_frame_csv(&mut df, output_csv, None)?;
    log::info!(
        "cohort '{prefix}': {} ordered / {} disordered residues, scores written to {}",
        composition.total_ordered(),
        composition.total_disordered(),
        output_csv.display()
    );
    Ok(Some(composition))
}

/// Writes every segment of every report under `input_root` to one FASTA file.
/// Returns the number of records written.
pub fn export_segments_fasta(
    input_root: &Path,
    output_fasta: &Path,
    config: &PipelineConfig,
) -> Result<usize> {
    let parser = RecordParser::for_job(config, ColumnLayout::residues());
    let mut combined: Option<polars::prelude::DataFrame> = None;

    for path in discover_reports(input_root, true) {
        let table = match parser.read_file(&path) {
            Ok(table) => table,
            Err(e) => {
                log::error!("{}: could not be read: {e}", path.display());
                continue;
            }
        };
        let segments = segment_records(table.records, config.chain_break);
        if segments.is_empty() {
            log::warn!("{}: skipped, no residue records", path.display());
            continue;
        }
        let df = segments_frame(&file_stem(&path), &segments)?;
        if let Some(all) = combined.as_mut() {
            all.vstack_mut(&df)?;
        } else {
            combined = Some(df);
        }
    }

    let Some(df) = combined else {
        log::info!("no segments found under {}", input_root.display());
        return Ok(0);
    };
    if let Some(parent) = output_fasta.parent() {
        fs::create_dir_all(parent)?;
    }
    write_fasta(&df, output_fasta)?;
    Ok(df.height())
}
