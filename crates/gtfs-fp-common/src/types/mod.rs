//! Common types used across GTFS-FP

use serde::{Deserialize, Serialize};

use crate::error::{FeedError, Result};

/// Extension carried by published feed archives
pub const FEED_ARCHIVE_SUFFIX: &str = ".zip";

/// Position of the version token in the '_'-separated archive file name
const VERSION_FIELD_INDEX: usize = 2;

/// Identifying token of one published feed snapshot.
///
/// Parsed from the file name the landing URL redirects to
/// (`<prefix>_<publisher>_<version>...` style names, third field wins), and
/// the single source of every object key the pipeline reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedVersion(String);

impl FeedVersion {
    /// Wrap an already-extracted version token
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() || token.contains('/') {
            return Err(FeedError::InvalidVersion(token));
        }
        Ok(Self(token))
    }

    /// Derive the version from an archive file name such as `gtfs_fp_2025.zip`.
    ///
    /// The third field wins even when later fields follow: `xyz_2025_v7.zip`
    /// is version `v7`.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let stem = file_name
            .strip_suffix(FEED_ARCHIVE_SUFFIX)
            .unwrap_or(file_name);

        match stem.split('_').nth(VERSION_FIELD_INDEX) {
            Some(token) if !token.is_empty() => Self::new(token),
            _ => Err(FeedError::MalformedFeedFilename(file_name.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Object keys for both artifacts of this version
    pub fn keys(&self) -> FeedKeys {
        FeedKeys {
            archive: ArtifactKind::Archive.key_for(self),
            database: ArtifactKind::Database.key_for(self),
        }
    }
}

impl std::fmt::Display for FeedVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two artifacts published for every feed version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Raw archive exactly as downloaded
    Archive,
    /// DuckDB file built from the archive
    Database,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Archive => "zip",
            ArtifactKind::Database => "db",
        }
    }

    pub fn key_for(self, version: &FeedVersion) -> String {
        format!("{}_feed.{}", version, self.extension())
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Archive => write!(f, "archive"),
            ArtifactKind::Database => write!(f, "database"),
        }
    }
}

/// Object keys of a feed version's published artifacts.
///
/// The database key doubles as the local database file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedKeys {
    pub archive: String,
    pub database: String,
}
