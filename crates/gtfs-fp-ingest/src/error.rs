//! Error types for the ingestion pipeline
//!
//! Each stage has its own error enum; [`IngestError`] aggregates them so the
//! binary has a single place that logs the failure and picks the exit code.
//! No stage recovers locally: the first error ends the run.

use gtfs_fp_common::FeedError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Top-level pipeline failure, one variant per stage
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Redirect resolution failed: {0}")]
    RedirectResolution(#[from] ResolveError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl IngestError {
    /// Short stage name used as a structured log field
    pub fn stage(&self) -> &'static str {
        match self {
            IngestError::RedirectResolution(_) => "resolve",
            IngestError::Storage(_) => "storage",
            IngestError::Archive(_) => "archive",
            IngestError::Load(_) => "load",
            IngestError::Publish(_) => "publish",
            IngestError::Filesystem(_) => "filesystem",
            IngestError::Config(_) => "config",
        }
    }
}

/// Landing URL could not be turned into a feed version
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Could not fetch {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("Redirect response ({0}) carried no usable Location header")]
    MissingLocation(u16),

    #[error("Invalid redirect location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Object storage failure other than "object not found" on an existence check
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to check existence of '{key}': {message}")]
    Exists { key: String, message: String },

    #[error("Failed to upload '{key}': {message}")]
    Put { key: String, message: String },

    #[error("Failed to download '{key}': {message}")]
    Get { key: String, message: String },

    #[error("Object '{key}' does not exist")]
    NotFound { key: String },
}

/// Archive acquisition or extraction failure
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Could not download timetable from {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Timetable download from {url} returned status {status}")]
    DownloadStatus { url: String, status: u16 },

    #[error("Could not open zip archive: {0}")]
    Malformed(#[source] zip::result::ZipError),

    #[error("Could not open '{name}' inside zip: {source}")]
    Entry {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Could not read '{name}' inside zip: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive is missing required members: {}", .0.join(", "))]
    MissingMembers(Vec<String>),
}

/// DuckDB load failure
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not open DuckDB database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: duckdb::Error,
    },

    #[error("Statement for {target} failed: {source}")]
    Statement {
        target: String,
        #[source]
        source: duckdb::Error,
    },

    #[error("Could not close DuckDB database {}: {source}", path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: duckdb::Error,
    },
}

/// Final database upload failure
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Could not read DuckDB file {}: {source}", path.display())]
    ReadDatabase {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not upload DuckDB file: {0}")]
    Upload(#[source] StorageError),
}

/// Local filesystem failure outside the archive and database writers
#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("Could not create scratch directory {}: {source}", path.display())]
    CreateScratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not remove scratch directory {}: {source}", path.display())]
    RemoveScratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not remove stale database {}: {source}", path.display())]
    RemoveStaleDatabase {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid startup configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
