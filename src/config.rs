//! Pipeline configuration shared by every batch job.
//!
//! Thresholds, window sizes and column indices are passed explicitly to each
//! component; nothing here is process-wide state.

use crate::error::{KmerError, Result};
use crate::segment::ChainBreakRule;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Minimum number of occurrences for a pattern to count as frequent
pub const DEFAULT_MIN_OCCURRENCE_COUNT: u32 = 3;

/// Window sizes swept by the batch jobs (3 through 11 inclusive)
pub const DEFAULT_MIN_WINDOW: usize = 3;
pub const DEFAULT_MAX_WINDOW: usize = 11;

/// Scores strictly above this value mark a residue as disordered
pub const DEFAULT_DISORDER_CUTOFF: f64 = 0.5;

/// Leading token (case-insensitive) identifying a header line
pub const DEFAULT_HEADER_MARKER: &str = "pos";

/// 0-based column indices consumed from a whitespace-delimited residue table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnLayout {
    pub primary_position: usize,
    pub residue: usize,
    #[serde(default)]
    pub disorder_score: Option<usize>,
    #[serde(default)]
    pub secondary_position: Option<usize>,
    #[serde(default)]
    pub anchor_flag: Option<usize>,
}

impl ColumnLayout {
    /// Position and residue only, as read by the multi-file window sweep.
    pub const fn residues() -> Self {
        ColumnLayout {
            primary_position: 0,
            residue: 1,
            disorder_score: None,
            secondary_position: None,
            anchor_flag: None,
        }
    }

    /// Residue table where a second position column also signals chain breaks.
    pub const fn paired_positions() -> Self {
        ColumnLayout {
            primary_position: 0,
            residue: 1,
            disorder_score: None,
            secondary_position: Some(4),
            anchor_flag: None,
        }
    }

    /// IU columns of a raw disorder report (`POS_IU RES_IU IU ANCHOR` at 4..=7).
    pub const fn iu_report() -> Self {
        ColumnLayout {
            primary_position: 4,
            residue: 5,
            disorder_score: Some(6),
            secondary_position: None,
            anchor_flag: Some(7),
        }
    }

    /// The 4-column tables written by the region splitter.
    pub const fn split_region() -> Self {
        ColumnLayout {
            primary_position: 0,
            residue: 1,
            disorder_score: Some(2),
            secondary_position: None,
            anchor_flag: Some(3),
        }
    }

    /// Minimum number of fields a line needs to be considered a residue row.
    pub fn required_columns(&self) -> usize {
        [
            Some(self.primary_position),
            Some(self.residue),
            self.disorder_score,
            self.secondary_position,
            self.anchor_flag,
        ]
        .into_iter()
        .flatten()
        .max()
        .map_or(0, |idx| idx + 1)
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout::residues()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub min_occurrence_count: u32,
    pub window_sizes: Vec<usize>,
    /// Overrides the layout preset a job would otherwise pick
    pub column_layout: Option<ColumnLayout>,
    pub chain_break: ChainBreakRule,
    pub disorder_cutoff: f64,
    pub header_marker: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            min_occurrence_count: DEFAULT_MIN_OCCURRENCE_COUNT,
            window_sizes: (DEFAULT_MIN_WINDOW..=DEFAULT_MAX_WINDOW).collect(),
            column_layout: None,
            chain_break: ChainBreakRule::Primary,
            disorder_cutoff: DEFAULT_DISORDER_CUTOFF,
            header_marker: DEFAULT_HEADER_MARKER.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Parses a TOML document; missing keys fall back to the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(content).map_err(|e| KmerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Replaces the window sizes with the inclusive range `min..=max`.
    pub fn with_window_range(mut self, min: usize, max: usize) -> Result<Self> {
        if min > max {
            return Err(KmerError::invalid_parameter(
                "window_sizes",
                format!("{min}..={max}"),
                "minimum window size exceeds maximum",
            ));
        }
        self.window_sizes = (min..=max).collect();
        self.validate()?;
        Ok(self)
    }

    /// Layout for a job: the configured override, or the job's own preset.
    pub fn layout_or(&self, preset: ColumnLayout) -> ColumnLayout {
        self.column_layout.unwrap_or(preset)
    }

    /// Window sizes in ascending order without duplicates.
    pub fn sorted_window_sizes(&self) -> Vec<usize> {
        let mut sizes = self.window_sizes.clone();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_sizes.is_empty() {
            return Err(KmerError::invalid_parameter(
                "window_sizes",
                "[]",
                "at least one window size is required",
            ));
        }
        if let Some(zero) = self.window_sizes.iter().find(|&&k| k == 0) {
            return Err(KmerError::invalid_parameter(
                "window_sizes",
                zero,
                "window size must be positive",
            ));
        }
        if self.min_occurrence_count == 0 {
            return Err(KmerError::invalid_parameter(
                "min_occurrence_count",
                0,
                "threshold must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.disorder_cutoff) {
            return Err(KmerError::invalid_parameter(
                "disorder_cutoff",
                self.disorder_cutoff,
                "cutoff must lie within [0, 1]",
            ));
        }
        if self.header_marker.trim().is_empty() {
            return Err(KmerError::InvalidConfig(
                "header_marker must not be blank".into(),
            ));
        }
        if let Some(layout) = self.column_layout {
            if self.chain_break == ChainBreakRule::PrimaryAndSecondary
                && layout.secondary_position.is_none()
            {
                return Err(KmerError::InvalidConfig(
                    "chain_break = \"primary_and_secondary\" needs a secondary_position column"
                        .into(),
                ));
            }
        }
        Ok(())
    }
}
