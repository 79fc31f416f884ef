use crate::error::{KmerError, Result};
use crate::segment::Segment;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads protein sequences from a FASTA file into a DataFrame.
///
/// # Arguments
/// * `filename` - Path to the FASTA file to read
///
/// # Returns
/// * `Result<DataFrame>` - A DataFrame with two columns:
///   - "label": The sequence identifiers (without '>' prefix)
///   - "sequence": The corresponding residue sequences in uppercase
///
/// # Errors
/// * Returns `KmerError::InvalidFileFormat` if no sequences are found
/// * Returns `KmerError::Io` for file reading issues
pub fn read_fasta<P: AsRef<Path>>(filename: P) -> Result<DataFrame> {
    let mut records: Vec<(String, String)> = Vec::new();
    let reader = BufReader::new(File::open(filename)?);

    let mut current_label: Option<String> = None;
    let mut current_sequence = String::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();

        if let Some(label) = line.strip_prefix('>') {
            if let Some(previous) = current_label.replace(label.trim().to_string()) {
                records.push((previous, current_sequence.to_uppercase()));
                current_sequence.clear();
            }
        } else if !line.is_empty() && current_label.is_some() {
            current_sequence.push_str(line);
        }
    }

    if let Some(label) = current_label {
        records.push((label, current_sequence.to_uppercase()));
    }

    if records.is_empty() {
        return Err(KmerError::invalid_format("No sequences found"));
    }

    let (labels, sequences): (Vec<String>, Vec<String>) = records.into_iter().unzip();
    let df = DataFrame::new(vec![
        Column::new("label".into(), labels),
        Column::new("sequence".into(), sequences),
    ])?;

    Ok(df)
}

/// Writes the "label"/"sequence" columns of a DataFrame as FASTA records.
///
/// # Errors
/// * Returns `KmerError::DataError` if required columns are missing or contain nulls
/// * Returns `KmerError::Io` for file writing issues
pub fn write_fasta<P: AsRef<Path>>(df: &DataFrame, filename: P) -> Result<()> {
    let labels = df.column("label")?.str()?;
    let sequences = df.column("sequence")?.str()?;

    let mut content = String::new();
    for (label, sequence) in labels.into_iter().zip(sequences) {
        match (label, sequence) {
            (Some(label), Some(sequence)) => {
                content.push('>');
                content.push_str(label);
                content.push('\n');
                content.push_str(sequence);
                content.push('\n');
            }
            _ => return Err(KmerError::DataError("null label or sequence".into())),
        }
    }

    fs::write(filename, content)?;
    Ok(())
}

/// Collects segments into a FASTA-ready DataFrame labelled `<base_name>_TF_<n>`.
pub fn segments_frame(base_name: &str, segments: &[Segment]) -> Result<DataFrame> {
    let labels: Vec<String> = segments
        .iter()
        .map(|s| format!("{base_name}_TF_{}", s.number()))
        .collect();
    let sequences: Vec<String> = segments.iter().map(Segment::sequence).collect();

    let df = DataFrame::new(vec![
        Column::new("label".into(), labels),
        Column::new("sequence".into(), sequences),
    ])?;
    Ok(df)
}
