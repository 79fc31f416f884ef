use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tf_disorder_kmers::config::PipelineConfig;
use tf_disorder_kmers::pipeline::{self, SplitMode};
use tf_disorder_kmers::report::{read_report_counts, ReportView};

const REPORT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/multi_factor_report.txt");

/// Copies the fixture report into `<tmp>/in/NR/` and returns the input root.
fn stage_report(tmp: &TempDir) -> PathBuf {
    let family = tmp.path().join("in").join("NR");
    fs::create_dir_all(&family).unwrap();
    fs::copy(REPORT, family.join("multi_factor_report.txt")).unwrap();
    tmp.path().join("in")
}

fn config_with_windows(sizes: &[usize], min_count: u32) -> PipelineConfig {
    PipelineConfig {
        window_sizes: sizes.to_vec(),
        min_occurrence_count: min_count,
        ..Default::default()
    }
}

fn counts(path: &Path) -> Vec<(String, u32)> {
    let table = read_report_counts(path).unwrap();
    table
        .sorted()
        .into_iter()
        .map(|(p, c)| (p.to_string(), c))
        .collect()
}

fn pairs(entries: &[(&str, u32)]) -> Vec<(String, u32)> {
    entries.iter().map(|&(p, c)| (p.to_string(), c)).collect()
}

#[rstest]
#[case(ReportView::Sorted)]
#[case(ReportView::Traversal)]
fn window_sweep_writes_one_report_per_segment_and_size(#[case] view: ReportView) {
    let tmp = TempDir::new().unwrap();
    let input = stage_report(&tmp);
    let output = tmp.path().join("out");

    let stats =
        pipeline::run_window_sweep(&input, &output, &PipelineConfig::default(), view).unwrap();
    assert_eq!(stats.files_seen, 1);
    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.outputs_written, 2 * 9);

    let dir = output.join("3").join("multi_factor_report");
    assert_eq!(
        counts(&dir.join("multi_factor_report_TF_1_WS3.txt")),
        pairs(&[("AKA", 3), ("KAK", 3)])
    );
    assert_eq!(
        counts(&dir.join("multi_factor_report_TF_2_WS3.txt")),
        pairs(&[("MPP", 1), ("PPG", 1), ("PPP", 2)])
    );

    let short = fs::read_to_string(
        output
            .join("7")
            .join("multi_factor_report")
            .join("multi_factor_report_TF_2_WS7.txt"),
    )
    .unwrap();
    assert!(short.contains("Transcription factor: MPPPPG"));
    assert!(short.contains("(Sequence too short for window size 7)"));
}

#[test]
fn missing_input_directory_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let stats = pipeline::run_window_sweep(
        &tmp.path().join("absent"),
        &tmp.path().join("out"),
        &PipelineConfig::default(),
        ReportView::Sorted,
    )
    .unwrap();
    assert_eq!(stats.files_seen, 0);
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn single_report_file_is_swept() {
    let tmp = TempDir::new().unwrap();
    let report = tmp.path().join("1.1.1.1.txt");
    fs::copy(REPORT, &report).unwrap();
    let output = tmp.path().join("out");

    let stats = pipeline::run_window_sweep(
        &report,
        &output,
        &config_with_windows(&[3], 1),
        ReportView::Sorted,
    )
    .unwrap();
    assert_eq!(stats.files_seen, 1);
    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.outputs_written, 2);
    assert!(output.join("3").join("1.1.1.1").join("1.1.1.1_TF_2_WS3.txt").exists());

    assert!(pipeline::discover_reports(&tmp.path().join("notes.csv"), true).is_empty());
}

#[test]
fn same_stem_in_two_families_is_not_overwritten() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    for family in ["a", "b"] {
        fs::create_dir_all(input.join(family)).unwrap();
    }
    fs::copy(REPORT, input.join("a").join("x.txt")).unwrap();
    fs::write(input.join("b").join("x.txt"), "POS RES\n1 W\n2 W\n3 W\n").unwrap();
    let output = tmp.path().join("out");

    let stats = pipeline::run_window_sweep(
        &input,
        &output,
        &config_with_windows(&[3], 1),
        ReportView::Sorted,
    )
    .unwrap();
    assert_eq!(stats.files_seen, 2);
    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.files_skipped, 1);
    assert_eq!(stats.outputs_written, 2);
    assert_eq!(
        counts(&output.join("3").join("x").join("x_TF_1_WS3.txt")),
        pairs(&[("AKA", 3), ("KAK", 3)])
    );
}

#[test]
fn unreadable_file_does_not_abort_batch() {
    let tmp = TempDir::new().unwrap();
    let input = stage_report(&tmp);
    fs::write(input.join("NR").join("broken.txt"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();
    fs::write(input.join("NR").join("header_only.txt"), "POS RES\n").unwrap();

    let stats = pipeline::run_window_sweep(
        &input,
        &tmp.path().join("out"),
        &config_with_windows(&[3], 3),
        ReportView::Sorted,
    )
    .unwrap();
    assert_eq!(stats.files_seen, 3);
    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.files_skipped, 1);
    assert_eq!(stats.files_failed, 1);
}

#[test]
fn region_split_separates_binding_residues() {
    let tmp = TempDir::new().unwrap();
    let input = stage_report(&tmp);
    let output = tmp.path().join("regions");

    let stats = pipeline::run_region_split(
        &input,
        &output,
        &PipelineConfig::default(),
        SplitMode::BindingAndNonBinding,
    )
    .unwrap();
    assert_eq!(stats.outputs_written, 3);

    let dbd = fs::read_to_string(output.join("DBD-Region").join("multi_factor_report_TF_1.txt"))
        .unwrap();
    assert_eq!(
        dbd,
        "POS_IU\tRES_IU\tIU\tANCHOR\n\
         1\tA\t0.9\tYes\n2\tK\t0.9\tYes\n3\tA\t0.9\tYes\n4\tK\t0.9\tYes\n"
    );
    assert!(!output.join("DBD-Region").join("multi_factor_report_TF_2.txt").exists());

    let non_dbd = fs::read_to_string(
        output
            .join("Non-DBD-Region")
            .join("multi_factor_report_TF_2.txt"),
    )
    .unwrap();
    assert_eq!(non_dbd.lines().count(), 7);
}

#[test]
fn anchor_only_split_groups_by_family() {
    let tmp = TempDir::new().unwrap();
    let input = stage_report(&tmp);
    let output = tmp.path().join("anchors");

    pipeline::run_region_split(&input, &output, &PipelineConfig::default(), SplitMode::AnchorOnly)
        .unwrap();
    assert!(output.join("NR").join("multi_factor_report_TF_1_ANCHOR.txt").exists());
    assert!(!output.join("NR").join("multi_factor_report_TF_2_ANCHOR.txt").exists());
}

#[test]
fn split_then_window_then_summarise() {
    let tmp = TempDir::new().unwrap();
    let input = stage_report(&tmp);
    let regions = tmp.path().join("regions");
    let windows = tmp.path().join("windows");
    let config = config_with_windows(&[3], 1);

    pipeline::run_region_split(&input, &regions, &config, SplitMode::BindingAndNonBinding).unwrap();
    let stats = pipeline::run_region_windows(
        &regions.join("Non-DBD-Region"),
        &windows,
        &config,
        ReportView::Traversal,
    )
    .unwrap();
    assert_eq!(stats.outputs_written, 2);

    let csv = tmp.path().join("summary.csv");
    let matrix = pipeline::run_cohort_summary(&windows.join("3"), "multi", &csv, &config)
        .unwrap()
        .unwrap();
    assert_eq!(matrix.columns(), ["AKA", "KAK", "MPP", "PPG", "PPP"]);
    assert_eq!(
        fs::read_to_string(&csv).unwrap(),
        "transcription_factor,AKA,KAK,MPP,PPG,PPP\n\
         multi_factor_report_TF_1_WS3.txt,1,1,0,0,0\n\
         multi_factor_report_TF_2_WS3.txt,0,0,1,1,2\n"
    );
}

#[test]
fn cohort_summary_keeps_raw_counts_outside_threshold() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("3");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("1.a.txt"), "Window Size: 3\n  ABC - 5\n  XYZ - 1\n").unwrap();
    fs::write(dir.join("1.b.txt"), "Window Size: 3\n  ABC - 0\n  XYZ - 4\n").unwrap();
    fs::write(dir.join("2.c.txt"), "  QQQ - 9\n").unwrap();

    let csv = tmp.path().join("superclass_1.csv");
    pipeline::run_cohort_summary(&dir, "1.", &csv, &PipelineConfig::default())
        .unwrap()
        .unwrap();
    assert_eq!(
        fs::read_to_string(&csv).unwrap(),
        "transcription_factor,ABC,XYZ\n1.a.txt,5,1\n1.b.txt,0,4\n"
    );
}

#[test]
fn empty_cohort_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("1.a.txt"), "  ABC - 2\n").unwrap();
    let csv = tmp.path().join("out.csv");

    let matrix =
        pipeline::run_cohort_summary(tmp.path(), "1.", &csv, &PipelineConfig::default()).unwrap();
    assert!(matrix.is_none());
    assert!(!csv.exists());

    let none = pipeline::run_cohort_summary(tmp.path(), "9.", &csv, &PipelineConfig::default())
        .unwrap();
    assert!(none.is_none());
}

#[test]
fn residue_distribution_weights_frequent_patterns() {
    let tmp = TempDir::new().unwrap();
    let reports = tmp.path().join("reports");
    fs::create_dir_all(&reports).unwrap();
    fs::write(reports.join("x_WS3.txt"), "  AAB - 4\n  BCD - 2\n  XYZ - 1\n").unwrap();
    fs::write(reports.join("rare_WS3.txt"), "  AAB - 1\n").unwrap();

    let out = tmp.path().join("dist");
    let stats =
        pipeline::run_residue_distribution(&reports, &out, &config_with_windows(&[3], 2)).unwrap();
    assert_eq!(stats.outputs_written, 1);
    assert_eq!(stats.files_skipped, 1);

    let csv = fs::read_to_string(out.join("x_WS3_distribution.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "amino_acid,weighted_count");
    assert_eq!(lines[1], "A,8");
    assert_eq!(lines[2], "C,2");
    assert_eq!(lines[3], "D,2");
    assert_eq!(lines[4], "E,0");
    assert_eq!(*lines.last().unwrap(), "B,6");
    assert_eq!(lines.len(), 22);
}

fn stage_split_tables(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("a.txt"),
        "POS_IU\tRES_IU\tIU\tANCHOR\n\
         1\tP\t0.9\tYes\n2\tE\t0.9\tYes\n3\tC\t0.2\tYes\n4\tW\t0.2\tYes\n",
    )
    .unwrap();
    fs::write(
        dir.join("b.txt"),
        "POS_IU\tRES_IU\tIU\tANCHOR\n1\tC\t0.1\tYes\n2\tC\t0.1\tYes\n",
    )
    .unwrap();
}

#[test]
fn disorder_threshold_lists_qualifying_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("DBD_Split");
    stage_split_tables(&dir);

    let csv = tmp.path().join("above_50.csv");
    let rows =
        pipeline::run_disorder_threshold(&dir, &csv, 50.0, &PipelineConfig::default()).unwrap();
    assert_eq!(rows, 1);
    assert_eq!(
        fs::read_to_string(&csv).unwrap(),
        "filename,disorder_percentage\na.txt,50.00\n"
    );

    assert!(
        pipeline::run_disorder_threshold(&dir, &csv, 150.0, &PipelineConfig::default()).is_err()
    );
}

#[test]
fn disorder_preference_scores_cohort() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("DBD-Region");
    stage_split_tables(&dir);

    let csv = tmp.path().join("scores.csv");
    let composition =
        pipeline::run_disorder_preference(&dir, "a", &csv, &PipelineConfig::default())
            .unwrap()
            .unwrap();
    assert_eq!(composition.total_disordered(), 2);
    assert_eq!(composition.total_ordered(), 2);

    let text = fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "amino_acid,preference_score");
    assert!(lines[1].starts_with("P,1"));
    assert!(lines[20].starts_with("C,-1"));
    assert_eq!(lines.len(), 21);
}

#[test]
fn disorder_preference_without_scores_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("DBD-Region");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("a.txt"), "POS_IU\tRES_IU\tIU\tANCHOR\n").unwrap();
    fs::write(dir.join("a2.txt"), "1\tP\tn/a\tYes\n").unwrap();

    let csv = tmp.path().join("scores.csv");
    let composition =
        pipeline::run_disorder_preference(&dir, "a", &csv, &PipelineConfig::default()).unwrap();
    assert!(composition.is_none());
    assert!(!csv.exists());
}
