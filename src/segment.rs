//! Chain-break segmentation of residue tables.
//!
//! A report file concatenates several transcription factors; each one restarts
//! its residue numbering, so a strict decrease in position marks a new segment.

use crate::records::ResidueRecord;
use serde::Deserialize;
use std::ops::Range;

/// Header written above split-region tables
pub const REGION_TABLE_HEADER: &str = "POS_IU\tRES_IU\tIU\tANCHOR";

/// Which position fields are inspected for chain breaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainBreakRule {
    #[default]
    Primary,
    /// Break when either the primary or the secondary position decreases
    PrimaryAndSecondary,
}

impl ChainBreakRule {
    pub fn is_break(&self, previous: &ResidueRecord, current: &ResidueRecord) -> bool {
        if current.position_primary < previous.position_primary {
            return true;
        }
        match (self, previous.position_secondary, current.position_secondary) {
            (ChainBreakRule::PrimaryAndSecondary, Some(prev), Some(cur)) => cur < prev,
            _ => false,
        }
    }
}

/// Contiguous run of records belonging to one transcription factor.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    number: usize,
    start: usize,
    records: Vec<ResidueRecord>,
}

impl Segment {
    /// 1-based ordinal of the segment within its file
    pub fn number(&self) -> usize {
        self.number
    }

    /// Record indices covered in the unsegmented input
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.records.len()
    }

    pub fn records(&self) -> &[ResidueRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn sequence(&self) -> String {
        self.records.iter().map(|r| r.residue).collect()
    }

    /// Splits the segment into DNA-binding (anchored) and remaining residues.
    /// Records without an anchor flag fall into the unanchored part.
    pub fn split_regions(&self) -> RegionSplit {
        let (anchored, unanchored) = self
            .records
            .iter()
            .cloned()
            .partition(|r| r.is_anchor == Some(true));
        RegionSplit {
            anchored,
            unanchored,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSplit {
    pub anchored: Vec<ResidueRecord>,
    pub unanchored: Vec<ResidueRecord>,
}

/// Indices at which a new segment starts; empty for empty input.
pub fn chain_breaks(records: &[ResidueRecord], rule: ChainBreakRule) -> Vec<usize> {
    if records.is_empty() {
        return Vec::new();
    }
    std::iter::once(0)
        .chain(
            records
                .windows(2)
                .enumerate()
                .filter(|(_, pair)| rule.is_break(&pair[0], &pair[1]))
                .map(|(i, _)| i + 1),
        )
        .collect()
}

/// Partitions records into segments in a single left-to-right pass.
///
/// Equal adjacent positions stay in the same segment; only a strict decrease
/// on a tracked field starts a new one.
pub fn segment_records(records: Vec<ResidueRecord>, rule: ChainBreakRule) -> Vec<Segment> {
    let starts = chain_breaks(&records, rule);
    let mut remaining = records;
    let mut segments: Vec<Segment> = starts
        .iter()
        .enumerate()
        .rev()
        .map(|(i, &start)| Segment {
            number: i + 1,
            start,
            records: remaining.split_off(start),
        })
        .collect();
    segments.reverse();
    segments.retain(|s| !s.is_empty());
    segments
}

/// Renders records as a tab-separated `POS_IU RES_IU IU ANCHOR` table.
pub fn render_region_table(records: &[ResidueRecord]) -> String {
    let mut out = String::with_capacity(REGION_TABLE_HEADER.len() + records.len() * 16);
    out.push_str(REGION_TABLE_HEADER);
    out.push('\n');
    for record in records {
        let score = record
            .disorder_score
            .map_or_else(|| "NA".to_string(), |s| s.to_string());
        let anchor = if record.is_anchor == Some(true) { "Yes" } else { "No" };
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            record.position_primary, record.residue, score, anchor
        ));
    }
    out
}
