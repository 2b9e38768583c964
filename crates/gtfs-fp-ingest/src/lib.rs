//! GTFS-FP Ingest Library
//!
//! Publishes the current GTFS-FP timetable as two immutable objects: the raw
//! feed archive (`<version>_feed.zip`) and a DuckDB database built from it
//! (`<version>_feed.db`). The database doubles as the marker that a version
//! is done, so repeated runs against an unchanged feed do nothing.
//!
//! # Stages
//!
//! - **Resolver**: one non-following request to the landing URL; the redirect
//!   target's file name carries the version
//! - **Gate**: database already published? stop. Archive published? resume
//! - **Archive**: download, publish raw bytes, extract the allow-listed members
//! - **Loader**: `read_csv` into DuckDB tables plus join-key indexes
//! - **Publisher**: upload the closed database file
//!
//! # Example
//!
//! ```no_run
//! use gtfs_fp_ingest::pipeline::{IngestPipeline, PipelineConfig};
//! use gtfs_fp_ingest::storage::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig {
//!         landing_url: "https://data.example.org/permalink/timetable".parse()?,
//!         scratch_dir: "tmp".into(),
//!         output_dir: ".".into(),
//!     };
//!     let pipeline = IngestPipeline::new(config, Arc::new(MemoryStore::new("gtfs-fp")))?;
//!     let outcome = pipeline.run().await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod gate;
pub mod loader;
pub mod pipeline;
pub mod publisher;
pub mod resolver;
pub mod storage;
pub mod workspace;

pub use error::{IngestError, Result};
pub use pipeline::{IngestOutcome, IngestPipeline, PipelineConfig};
