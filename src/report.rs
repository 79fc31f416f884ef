//! Plain-text window reports.
//!
//! Data rows have the form `  <pattern> - <count>`. Downstream jobs read these
//! files back, so [`parse_report_counts`] accepts exactly what the renderers write.

use crate::error::Result;
use crate::kmer::PatternCountTable;
use std::fs;
use std::path::Path;

const SEPARATOR_WIDTH: usize = 50;
const ROW_DELIMITER: &str = " - ";
/// Labelled preamble lines; their values (paths, sequences) may contain the delimiter.
const PREAMBLE_LABELS: [&str; 4] = [
    "Source File:",
    "Window Size:",
    "Transcription factor:",
    "Sequence:",
];

/// Which listing a report carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportView {
    /// One row per sliding step, in sequence order
    Traversal,
    /// One row per unique pattern, sorted by pattern
    #[default]
    Sorted,
}

impl ReportView {
    fn label(&self) -> &'static str {
        match self {
            ReportView::Traversal => "Output (Sliding Window Step - Total Count of that Pattern):",
            ReportView::Sorted => "Output (Unique Patterns and their Total Counts):",
        }
    }
}

/// Report for one segment of a multi-factor input file.
pub fn render_segment_report(
    source: &Path,
    segment_number: usize,
    sequence: &str,
    window_size: usize,
    table: &PatternCountTable,
    view: ReportView,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "--- Analysis for Transcription Factor #{segment_number} ---\n"
    ));
    out.push_str(&format!("Source File: {}\n", source.display()));
    out.push_str(&format!("Window Size: {window_size}\n"));
    out.push_str(&"=".repeat(SEPARATOR_WIDTH));
    out.push_str("\n\n");
    out.push_str(&format!("Transcription factor: {sequence}\n\n"));
    push_rows(&mut out, sequence, window_size, table, view);
    out
}

/// Report for a whole file treated as a single sequence.
pub fn render_sequence_report(
    file_name: &str,
    sequence: &str,
    window_size: usize,
    table: &PatternCountTable,
    view: ReportView,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("--- Analysis for: {file_name} ---\n"));
    out.push_str(&format!("Window Size: {window_size}\n"));
    out.push_str(&"=".repeat(SEPARATOR_WIDTH));
    out.push_str("\n\n");
    out.push_str(&format!("Sequence: {sequence}\n\n"));
    push_rows(&mut out, sequence, window_size, table, view);
    out
}

fn push_rows(
    out: &mut String,
    sequence: &str,
    window_size: usize,
    table: &PatternCountTable,
    view: ReportView,
) {
    out.push_str(view.label());
    out.push('\n');

    if sequence.chars().count() < window_size {
        out.push_str(&format!(
            "  (Sequence too short for window size {window_size})\n"
        ));
        return;
    }

    let rows: Vec<(&str, u32)> = match view {
        ReportView::Traversal => table.traversal(sequence, window_size).collect(),
        ReportView::Sorted => table.sorted(),
    };
    for (pattern, count) in rows {
        out.push_str(&format!("  {pattern}{ROW_DELIMITER}{count}\n"));
    }
}

/// Parses one report line into `(pattern, count)`.
///
/// A data row contains `" - "`, does not start with `#`, `-`, `=` or a preamble
/// label once trimmed, and carries an integer after the first delimiter.
pub fn parse_report_row(line: &str) -> Option<(&str, u32)> {
    let line = line.trim();
    if !line.contains(ROW_DELIMITER)
        || line.starts_with(['#', '-', '='])
        || PREAMBLE_LABELS.iter().any(|label| line.starts_with(label))
    {
        return None;
    }
    let mut parts = line.split(ROW_DELIMITER);
    let pattern = parts.next()?.trim();
    let count = parts.next()?.trim().parse::<u32>().ok()?;
    Some((pattern, count))
}

/// Rebuilds a [`PatternCountTable`] from report text; non-data lines are ignored.
pub fn parse_report_counts(text: &str) -> PatternCountTable {
    let mut table = PatternCountTable::new();
    for (pattern, count) in text.lines().filter_map(parse_report_row) {
        table.insert(pattern, count);
    }
    table
}

pub fn read_report_counts<P: AsRef<Path>>(path: P) -> Result<PatternCountTable> {
    let text = fs::read_to_string(path)?;
    Ok(parse_report_counts(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::count_patterns;

    #[test]
    fn sorted_report_layout() {
        let table = count_patterns("ABCAB", 2);
        let report = render_segment_report(
            Path::new("in/1.1.txt"),
            2,
            "ABCAB",
            2,
            &table,
            ReportView::Sorted,
        );
        let expected = format!(
            "--- Analysis for Transcription Factor #2 ---\n\
             Source File: in/1.1.txt\n\
             Window Size: 2\n\
             {}\n\n\
             Transcription factor: ABCAB\n\n\
             Output (Unique Patterns and their Total Counts):\n  \
             AB - 2\n  BC - 1\n  CA - 1\n",
            "=".repeat(50)
        );
        assert_eq!(report, expected);
    }

    #[test]
    fn traversal_report_repeats_patterns() {
        let table = count_patterns("ABCAB", 2);
        let report = render_sequence_report("x.txt", "ABCAB", 2, &table, ReportView::Traversal);
        let rows: Vec<_> = report.lines().filter_map(parse_report_row).collect();
        assert_eq!(rows, vec![("AB", 2), ("BC", 1), ("CA", 1), ("AB", 2)]);
    }

    #[test]
    fn short_sequence_has_no_rows() {
        let table = count_patterns("AB", 3);
        let report = render_sequence_report("x.txt", "AB", 3, &table, ReportView::Sorted);
        assert!(report.contains("(Sequence too short for window size 3)"));
        assert!(parse_report_counts(&report).is_empty());
    }

    #[test]
    fn rendered_counts_parse_back() {
        for view in [ReportView::Sorted, ReportView::Traversal] {
            let table = count_patterns("MKVLAAGMKVLAAG", 3);
            let report =
                render_segment_report(Path::new("f"), 1, "MKVLAAGMKVLAAG", 3, &table, view);
            assert_eq!(parse_report_counts(&report), table);
        }
    }

    #[test]
    fn rejects_non_data_lines() {
        assert_eq!(parse_report_row("  ABC - 4"), Some(("ABC", 4)));
        assert_eq!(parse_report_row("# ABC - 4"), None);
        assert_eq!(parse_report_row("--- Analysis for: x ---"), None);
        assert_eq!(parse_report_row("== - 3"), None);
        assert_eq!(parse_report_row("ABC - four"), None);
        assert_eq!(parse_report_row("ABC-4"), None);
        assert_eq!(parse_report_row("Source File: a - b/c.txt"), None);
    }

    #[test]
    fn preamble_with_delimiter_is_not_a_row() {
        assert_eq!(parse_report_row("Source File: dir - 12"), None);
        assert_eq!(parse_report_row("Sequence: AB - 3"), None);

        let source = Path::new("runs/batch - 12");
        let table = count_patterns("ABCAB", 2);
        let report = render_segment_report(source, 1, "ABCAB", 2, &table, ReportView::Sorted);
        assert_eq!(parse_report_counts(&report), table);
    }
}
