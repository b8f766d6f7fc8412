//! Error types for ingestion and read-back

use crate::types::SortOrder;
use thiserror::Error;

/// Main error type for rss operations
#[derive(Error, Debug)]
pub enum RssError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Truncated file: expected at least {expected} bytes, found {actual}")]
    TruncatedFile { expected: u64, actual: u64 },

    #[error("binary format {0} not supported")]
    UnsupportedFormat(String),

    #[error("Variable trace length not supported: {data_bytes} data bytes is not a multiple of trace size {trace_size}")]
    VariableTraceLength { data_bytes: u64, trace_size: u64 },

    #[error("{0} not supported, sort order should be one of inline or crossline")]
    InvalidSortOrder(String),

    #[error("{axis} {requested} out of bounds [{min}, {max}]")]
    Bounds {
        axis: SortOrder,
        requested: i32,
        min: i32,
        max: i32,
    },

    #[error("Invalid field layout: {0}")]
    InvalidFieldLayout(String),

    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Storage backend error: {0}")]
    StorageBackend(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Specialized Result type for rss operations
pub type Result<T> = std::result::Result<T, RssError>;

impl From<bincode::Error> for RssError {
    fn from(err: bincode::Error) -> Self {
        RssError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for RssError {
    fn from(err: serde_json::Error) -> Self {
        RssError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RssError {
    fn from(err: tokio::task::JoinError) -> Self {
        RssError::Task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_message() {
        let err = RssError::Bounds {
            axis: SortOrder::Inline,
            requested: 12,
            min: 1,
            max: 10,
        };
        assert_eq!(err.to_string(), "inline 12 out of bounds [1, 10]");
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = RssError::UnsupportedFormat("2-byte, twos complement integer".to_string());
        assert_eq!(
            err.to_string(),
            "binary format 2-byte, twos complement integer not supported"
        );
    }
}
