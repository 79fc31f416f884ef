use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KmerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid parameter: {name} = {value}, {message}")]
    InvalidParameter {
        name: String,
        value: String,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Type alias for Result with KmerError
pub type Result<T> = std::result::Result<T, KmerError>;

impl KmerError {
    /// Create a new InvalidFileFormat error
    pub fn invalid_format(message: impl Into<String>) -> Self {
        KmerError::InvalidFileFormat(message.into())
    }

    /// Create a new InvalidParameter error
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        KmerError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}

impl From<polars::error::PolarsError> for KmerError {
    fn from(e: polars::error::PolarsError) -> Self {
        KmerError::DataError(e.to_string())
    }
}
