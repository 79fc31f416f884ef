//! Chain-break segmentation and k-mer frequency statistics for transcription factor
//! disorder-prediction reports

pub mod aggregate;
pub mod config;
pub mod disorder;
pub mod error;
pub mod fasta;
pub mod kmer;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod segment;
pub mod types;
