//! Error types for GTFS-FP common helpers

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors raised while deriving feed identity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Malformed feed filename '{0}': expected at least three '_'-separated fields")]
    MalformedFeedFilename(String),

    #[error("Invalid feed version: {0:?}")]
    InvalidVersion(String),
}
