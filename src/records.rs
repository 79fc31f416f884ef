use crate::config::{ColumnLayout, PipelineConfig};
use crate::error::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One residue row of a disorder-prediction report.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueRecord {
    pub position_primary: i64,
    pub position_secondary: Option<i64>,
    pub residue: char,
    pub disorder_score: Option<f64>,
    pub is_anchor: Option<bool>,
}

impl ResidueRecord {
    pub fn new(position_primary: i64, residue: char) -> Self {
        ResidueRecord {
            position_primary,
            position_secondary: None,
            residue,
            disorder_score: None,
            is_anchor: None,
        }
    }
}

/// Why a line did not yield a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    Header,
    ShortRow,
    BadNumber,
    BadResidue,
}

/// Line tallies for one parsed table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub parsed: usize,
    pub blank: usize,
    pub header: usize,
    pub short: usize,
    pub malformed: usize,
}

impl ParseStats {
    fn record(&mut self, outcome: &std::result::Result<ResidueRecord, SkipReason>) {
        match outcome {
            Ok(_) => self.parsed += 1,
            Err(SkipReason::Blank) => self.blank += 1,
            Err(SkipReason::Header) => self.header += 1,
            Err(SkipReason::ShortRow) => self.short += 1,
            Err(SkipReason::BadNumber | SkipReason::BadResidue) => self.malformed += 1,
        }
    }

    /// Lines dropped for reasons other than being blank or a header.
    pub fn rejected(&self) -> usize {
        self.short + self.malformed
    }
}

/// Records of one table together with the tally of skipped lines.
#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    pub records: Vec<ResidueRecord>,
    pub stats: ParseStats,
}

/// Turns whitespace-delimited lines into [`ResidueRecord`]s using fixed column indices.
///
/// Lines that cannot be parsed are skipped, never fatal: a header, a row with
/// fewer fields than the layout requires, an unparsable number or a residue
/// token that is not exactly one character.
#[derive(Debug, Clone)]
pub struct RecordParser {
    layout: ColumnLayout,
    header_marker: String,
}

impl RecordParser {
    pub fn new(layout: ColumnLayout, header_marker: &str) -> Self {
        RecordParser {
            layout,
            header_marker: header_marker.trim().to_lowercase(),
        }
    }

    /// Parser for a job whose default layout is `preset`.
    pub fn for_job(config: &PipelineConfig, preset: ColumnLayout) -> Self {
        Self::new(config.layout_or(preset), &config.header_marker)
    }

    pub fn parse_line(&self, line: &str) -> std::result::Result<ResidueRecord, SkipReason> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(SkipReason::Blank);
        }
        if trimmed.to_lowercase().starts_with(&self.header_marker) {
            return Err(SkipReason::Header);
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < self.layout.required_columns() {
            return Err(SkipReason::ShortRow);
        }

        let position = |idx: usize| {
            fields[idx]
                .parse::<i64>()
                .map_err(|_| SkipReason::BadNumber)
        };

        let position_primary = position(self.layout.primary_position)?;
        let position_secondary = self.layout.secondary_position.map(position).transpose()?;
        let disorder_score = self
            .layout
            .disorder_score
            .map(|idx| {
                fields[idx]
                    .parse::<f64>()
                    .map_err(|_| SkipReason::BadNumber)
            })
            .transpose()?;

        let mut chars = fields[self.layout.residue].chars();
        let residue = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => return Err(SkipReason::BadResidue),
        };

        let is_anchor = self.layout.anchor_flag.map(|idx| fields[idx] == "Yes");

        Ok(ResidueRecord {
            position_primary,
            position_secondary,
            residue,
            disorder_score,
            is_anchor,
        })
    }

    /// Parses every line, keeping records in input order.
    pub fn parse_lines<'a, I>(&self, lines: I) -> ParsedTable
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut table = ParsedTable::default();
        for line in lines {
            let outcome = self.parse_line(line);
            table.stats.record(&outcome);
            if let Ok(record) = outcome {
                table.records.push(record);
            }
        }
        table
    }

    /// Reads a residue table from disk.
    ///
    /// # Errors
    /// * Returns `KmerError::Io` if the file cannot be opened or read; bad lines are
    ///   only counted in the returned [`ParseStats`]
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsedTable> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);

        let mut table = ParsedTable::default();
        for line in reader.lines() {
            let line = line?;
            let outcome = self.parse_line(&line);
            table.stats.record(&outcome);
            if let Ok(record) = outcome {
                table.records.push(record);
            }
        }

        if table.stats.rejected() > 0 {
            log::debug!(
                "{}: skipped {} short and {} malformed lines",
                path.as_ref().display(),
                table.stats.short,
                table.stats.malformed
            );
        }
        Ok(table)
    }
}
