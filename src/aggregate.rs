//! Cross-file summary matrices.
//!
//! Aggregation runs in two phases. [`CohortAggregator::add`] collects every
//! file's table and grows the union of frequent patterns; [`CohortAggregator::finish`]
//! consumes the aggregator, so the header is only built once every table is in.

use crate::error::{KmerError, Result};
use crate::disorder::{DISORDER_PROPENSITY_ORDER, DISORDER_RANK};
use crate::kmer::{filter_frequent, PatternCountTable};
use crate::types::{FrequentPatternSet, ResidueTally};
use ndarray::{Array2, ArrayView1};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Name of the identifier column in summary CSVs
pub const ROW_ID_COLUMN: &str = "transcription_factor";

/// Outcome of adding one file's table to a cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    /// The table had this many frequent patterns and was retained
    Added(usize),
    /// No pattern met the threshold; the file gets no row
    NoFrequentPatterns,
    /// A table with the same identifier was already added
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct CohortAggregator {
    min_count: u32,
    header: FrequentPatternSet,
    tables: BTreeMap<String, PatternCountTable>,
}

impl CohortAggregator {
    pub fn new(min_count: u32) -> Self {
        CohortAggregator {
            min_count,
            header: FrequentPatternSet::new(),
            tables: BTreeMap::new(),
        }
    }

    /// Pass 1: filter `table`, extend the header union and retain the full table.
    pub fn add(&mut self, id: impl Into<String>, table: PatternCountTable) -> Contribution {
        let id = id.into();
        if self.tables.contains_key(&id) {
            log::warn!("{id}: already aggregated, ignoring repeated table");
            return Contribution::Duplicate;
        }

        let frequent = filter_frequent(&table, self.min_count);
        if frequent.is_empty() {
            log::debug!(
                "{id}: no pattern occurs at least {} times, no row emitted",
                self.min_count
            );
            return Contribution::NoFrequentPatterns;
        }

        let n_frequent = frequent.len();
        self.header.extend(frequent);
        self.tables.insert(id, table);
        Contribution::Added(n_frequent)
    }

    /// Number of retained rows
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn header(&self) -> &FrequentPatternSet {
        &self.header
    }

    /// Pass 2: emit the dense, zero-filled matrix.
    ///
    /// Columns are the sorted union of frequent patterns and rows are sorted by
    /// identifier. Cells hold raw counts, even for patterns a row did not judge
    /// frequent. Returns `None` when no table contributed a frequent pattern.
    pub fn finish(self) -> Option<SummaryMatrix> {
        if self.header.is_empty() {
            return None;
        }

        let columns: Vec<String> = self.header.into_iter().collect();
        let mut counts = Array2::<u32>::zeros((self.tables.len(), columns.len()));
        let mut row_ids = Vec::with_capacity(self.tables.len());

        for (r, (id, table)) in self.tables.into_iter().enumerate() {
            for (c, pattern) in columns.iter().enumerate() {
                counts[[r, c]] = table.get(pattern);
            }
            row_ids.push(id);
        }

        Some(SummaryMatrix {
            row_ids,
            columns,
            counts,
        })
    }
}

/// Rows keyed by file identifier, one column per frequent pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryMatrix {
    row_ids: Vec<String>,
    columns: Vec<String>,
    counts: Array2<u32>,
}

impl SummaryMatrix {
    pub fn row_ids(&self) -> &[String] {
        &self.row_ids
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn counts(&self) -> &Array2<u32> {
        &self.counts
    }

    pub fn row(&self, id: &str) -> Option<ArrayView1<'_, u32>> {
        let idx = self.row_ids.iter().position(|r| r == id)?;
        Some(self.counts.row(idx))
    }

    pub fn get(&self, id: &str, pattern: &str) -> Option<u32> {
        let c = self.columns.iter().position(|p| p == pattern)?;
        self.row(id).map(|row| row[c])
    }

    /// Converts the matrix into a DataFrame with a leading `transcription_factor` column.
    ///
    /// # Errors
    /// * Returns `KmerError::DataError` if DataFrame creation fails
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Column::new(ROW_ID_COLUMN.into(), self.row_ids.clone()));
        for (c, pattern) in self.columns.iter().enumerate() {
            columns.push(Column::new(
                pattern.as_str().into(),
                self.counts.column(c).to_vec(),
            ));
        }
        DataFrame::new(columns).map_err(|e| KmerError::DataError(e.to_string()))
    }

    /// Writes the matrix as CSV in one full-content write.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut df = self.to_dataframe()?;
        write_frame_csv(&mut df, path, None)
    }
}

/// Weighted residue tally as columns `amino_acid`, `weighted_count`.
///
/// The twenty canonical amino acids are always listed alphabetically (zero when
/// unseen); any other residue in the tally follows.
pub fn residue_tally_frame(tally: &ResidueTally) -> Result<DataFrame> {
    let mut residues: Vec<char> = DISORDER_PROPENSITY_ORDER.to_vec();
    residues.sort_unstable();
    residues.extend(tally.keys().filter(|c| !DISORDER_RANK.contains_key(*c)));

    let counts: Vec<u64> = residues
        .iter()
        .map(|c| tally.get(c).copied().unwrap_or(0))
        .collect();
    let names: Vec<String> = residues.iter().map(char::to_string).collect();

    let df = DataFrame::new(vec![
        Column::new("amino_acid".into(), names),
        Column::new("weighted_count".into(), counts),
    ])?;
    Ok(df)
}

/// Serialises `df` to CSV in memory, then writes the file in a single call.
pub(crate) fn write_frame_csv<P: AsRef<Path>>(
    df: &mut DataFrame,
    path: P,
    float_precision: Option<usize>,
) -> Result<()> {
    let mut buffer: Vec<u8> = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_float_precision(float_precision)
        .finish(df)
        .map_err(|e| KmerError::DataError(e.to_string()))?;
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, buffer)?;
    Ok(())
}
