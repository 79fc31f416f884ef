//! Per-file disorder ratios and per-cohort residue preference scores.

use crate::error::{KmerError, Result};
use crate::records::ResidueRecord;
use phf::phf_map;
use polars::prelude::*;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Canonical amino acids, most disorder-promoting first
pub const DISORDER_PROPENSITY_ORDER: [char; 20] = [
    'P', 'E', 'S', 'Q', 'K', 'A', 'G', 'D', 'T', 'R', 'M', 'N', 'V', 'H', 'L', 'F', 'Y', 'I',
    'W', 'C',
];

/// Rank of each canonical amino acid in [`DISORDER_PROPENSITY_ORDER`]
pub static DISORDER_RANK: phf::Map<char, usize> = phf_map! {
    'P' => 0, 'E' => 1, 'S' => 2, 'Q' => 3, 'K' => 4,
    'A' => 5, 'G' => 6, 'D' => 7, 'T' => 8, 'R' => 9,
    'M' => 10, 'N' => 11, 'V' => 12, 'H' => 13, 'L' => 14,
    'F' => 15, 'Y' => 16, 'I' => 17, 'W' => 18, 'C' => 19,
};

/// Disorder figures for one residue table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisorderSummary {
    /// Residues carrying a score
    pub scored: usize,
    /// Residues scoring strictly above the cutoff
    pub disordered: usize,
    pub mean_score: f64,
}

impl DisorderSummary {
    pub fn ratio(&self) -> f64 {
        self.disordered as f64 / self.scored as f64
    }

    pub fn percentage(&self) -> f64 {
        self.ratio() * 100.0
    }
}

/// Summarises the scored records; `None` when no record has a score.
pub fn summarize(records: &[ResidueRecord], cutoff: f64) -> Option<DisorderSummary> {
    let scores: Vec<f64> = records.iter().filter_map(|r| r.disorder_score).collect();
    if scores.is_empty() {
        return None;
    }
    let disordered = scores.iter().filter(|&&s| s > cutoff).count();
    Some(DisorderSummary {
        scored: scores.len(),
        disordered,
        mean_score: scores.iter().mean(),
    })
}

/// Rejects disorder thresholds outside `0..=100` percent.
pub fn validate_threshold(threshold_percentage: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&threshold_percentage) {
        return Err(KmerError::invalid_parameter(
            "threshold_percentage",
            threshold_percentage,
            "must lie between 0 and 100",
        ));
    }
    Ok(())
}

/// Keeps files whose disorder percentage is at least `threshold_percentage`.
///
/// # Arguments
/// * `entries` - `(path, summary)` pairs, one per file
/// * `threshold_percentage` - Inclusive lower bound within `0..=100`
///
/// # Returns
/// * `Result<Option<DataFrame>>` - Columns `filename` (base name) and
///   `disorder_percentage`, sorted by full path; `None` if no file qualifies
///
/// # Errors
/// * Returns `KmerError::InvalidParameter` if the threshold is outside `0..=100`
/// * Returns `KmerError::DataError` if the DataFrame operations fail
pub fn threshold_frame(
    entries: &[(String, DisorderSummary)],
    threshold_percentage: f64,
) -> Result<Option<DataFrame>> {
    validate_threshold(threshold_percentage)?;

    let paths: Vec<&str> = entries.iter().map(|(p, _)| p.as_str()).collect();
    let names: Vec<String> = paths
        .iter()
        .map(|p| {
            std::path::Path::new(p)
                .file_name()
                .map_or_else(|| p.to_string(), |n| n.to_string_lossy().into_owned())
        })
        .collect();
    let ratios: Vec<f64> = entries.iter().map(|(_, s)| s.ratio()).collect();

    let df = DataFrame::new(vec![
        Column::new("path".into(), paths),
        Column::new("filename".into(), names),
        Column::new("ratio".into(), ratios),
    ])?;

    let selected = df
        .lazy()
        .filter(col("ratio").gt_eq(lit(threshold_percentage / 100.0)))
        .sort(["path"], SortMultipleOptions::default())
        .select([
            col("filename"),
            (col("ratio") * lit(100.0)).alias("disorder_percentage"),
        ])
        .collect()?;

    Ok((selected.height() > 0).then_some(selected))
}

/// Ordered/disordered residue counts accumulated over a cohort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisorderComposition {
    ordered: BTreeMap<char, u64>,
    disordered: BTreeMap<char, u64>,
}

impl DisorderComposition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scores below `cutoff` count as ordered, everything else as disordered.
    pub fn add_records(&mut self, records: &[ResidueRecord], cutoff: f64) {
        for record in records {
            let Some(score) = record.disorder_score else {
                continue;
            };
            let bucket = if score < cutoff {
                &mut self.ordered
            } else {
                &mut self.disordered
            };
            *bucket.entry(record.residue).or_insert(0) += 1;
        }
    }

    pub fn total_ordered(&self) -> u64 {
        self.ordered.values().sum()
    }

    pub fn total_disordered(&self) -> u64 {
        self.disordered.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty() && self.disordered.is_empty()
    }

    /// `(fD - fO) / (fD + fO)` per residue, in disorder-propensity order.
    ///
    /// All twenty canonical residues are listed; other observed symbols follow in
    /// character order. A residue absent from both classes scores 0.
    pub fn preference_scores(&self) -> Vec<(char, f64)> {
        let total_o = self.total_ordered();
        let total_d = self.total_disordered();
        let freq = |counts: &BTreeMap<char, u64>, total: u64, residue: char| {
            if total == 0 {
                0.0
            } else {
                counts.get(&residue).copied().unwrap_or(0) as f64 / total as f64
            }
        };

        let mut residues: Vec<char> = DISORDER_PROPENSITY_ORDER.to_vec();
        residues.extend(
            self.ordered
                .keys()
                .chain(self.disordered.keys())
                .filter(|c| !DISORDER_RANK.contains_key(*c)),
        );
        residues.sort_by_key(|c| (DISORDER_RANK.get(c).copied().unwrap_or(usize::MAX), *c));
        residues.dedup();

        residues
            .into_iter()
            .map(|residue| {
                let f_d = freq(&self.disordered, total_d, residue);
                let f_o = freq(&self.ordered, total_o, residue);
                let denominator = f_d + f_o;
                let score = if denominator > 0.0 {
                    (f_d - f_o) / denominator
                } else {
                    0.0
                };
                (residue, score)
            })
            .collect()
    }

    /// Columns `amino_acid` and `preference_score`.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let (residues, scores): (Vec<String>, Vec<f64>) = self
            .preference_scores()
            .into_iter()
            .map(|(c, s)| (c.to_string(), s))
            .unzip();
        let df = DataFrame::new(vec![
            Column::new("amino_acid".into(), residues),
            Column::new("preference_score".into(), scores),
        ])?;
        Ok(df)
    }
}
