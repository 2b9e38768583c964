//! GTFS-FP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the GTFS-FP ingestion workspace.
//!
//! # Overview
//!
//! - **Types**: feed versions and the object keys derived from them
//! - **Checksums**: SHA-256 digests for logged artifact provenance
//! - **Logging**: one-shot `tracing` subscriber setup
//! - **Error Handling**: error type for the pure helpers in this crate
//!
//! # Example
//!
//! ```
//! use gtfs_fp_common::types::FeedVersion;
//!
//! let version = FeedVersion::from_file_name("gtfs_fp_2025.zip").unwrap();
//! assert_eq!(version.as_str(), "2025");
//! assert_eq!(version.keys().archive, "2025_feed.zip");
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{FeedError, Result};
