//! Version-gated ingestion pipeline
//!
//! One run resolves the current feed version, skips it if its database is
//! already published, and otherwise publishes the raw archive and a DuckDB
//! file built from four of its members. Stages run strictly in order and the
//! first failure ends the run.

use gtfs_fp_common::checksum::sha256_hex;
use gtfs_fp_common::types::{FeedKeys, FeedVersion};
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::archive::{self, ALLOWED_MEMBERS};
use crate::error::{ConfigError, ResolveError, Result};
use crate::gate::{self, GateDecision};
use crate::loader::{self, AnalyticalLoader, TableLoad};
use crate::publisher;
use crate::resolver::{ResolvedFeed, VersionResolver};
use crate::storage::{ObjectStore, UploadResult};
use crate::workspace::ScratchWorkspace;

/// Local paths and the landing URL for one run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub landing_url: Url,
    /// Extracted members live here while loading; removed afterwards
    pub scratch_dir: PathBuf,
    /// Where `<version>_feed.db` is written before upload
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    /// The scratch directory is wiped on every run, so it must not be the
    /// output directory or one of its ancestors. Nesting it inside the output
    /// directory is fine.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let scratch = absolute_dir("scratch directory", &self.scratch_dir)?;
        let output = absolute_dir("output directory", &self.output_dir)?;

        if output.starts_with(&scratch) {
            return Err(ConfigError::invalid(
                "scratch directory",
                format!(
                    "{} would remove the output directory {}",
                    self.scratch_dir.display(),
                    self.output_dir.display()
                ),
            ));
        }
        Ok(())
    }
}

fn absolute_dir(field: &'static str, path: &Path) -> std::result::Result<PathBuf, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::invalid(field, "must not be empty"));
    }
    std::path::absolute(path).map_err(|err| ConfigError::invalid(field, err.to_string()))
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The version's database was already published
    AlreadyProcessed { version: FeedVersion },
    Published {
        version: FeedVersion,
        keys: FeedKeys,
        /// Archive came from storage rather than the network
        resumed: bool,
        tables: Vec<TableLoad>,
        database: UploadResult,
    },
}

impl IngestOutcome {
    pub fn version(&self) -> &FeedVersion {
        match self {
            IngestOutcome::AlreadyProcessed { version } => version,
            IngestOutcome::Published { version, .. } => version,
        }
    }
}

pub struct IngestPipeline {
    config: PipelineConfig,
    store: Arc<dyn ObjectStore>,
    resolver: VersionResolver,
    http: reqwest::Client,
}

impl IngestPipeline {
    pub fn new(config: PipelineConfig, store: Arc<dyn ObjectStore>) -> Result<Self> {
        config.validate()?;

        let resolver = VersionResolver::new()?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(ResolveError::Client)?;

        Ok(Self {
            config,
            store,
            resolver,
            http,
        })
    }

    #[instrument(name = "ingest", skip_all, fields(run_id = %Uuid::new_v4(), bucket = self.store.bucket()))]
    pub async fn run(&self) -> Result<IngestOutcome> {
        // 1. Resolve the current version from the landing redirect
        let feed = self.resolver.resolve(&self.config.landing_url).await?;
        let version = feed.version.clone();
        let keys = version.keys();

        info!(
            %version,
            file_name = %feed.file_name,
            url = %feed.url,
            "Resolved feed version"
        );

        // 2. Gate on the published database
        let decision = gate::check(self.store.as_ref(), &keys).await?;
        if decision == GateDecision::AlreadyPublished {
            info!(%version, key = %keys.database, "Feed version already processed");
            return Ok(IngestOutcome::AlreadyProcessed { version });
        }

        // 3. Get the archive bytes, publishing them if they are new
        let resumed = decision == GateDecision::ResumeFromArchive;
        let data = self.acquire_archive(&feed, &keys, resumed).await?;

        // 4. Extract the allow-listed members
        let scratch = ScratchWorkspace::create(&self.config.scratch_dir)?;
        let extracted = archive::extract_members(&data, scratch.path(), &ALLOWED_MEMBERS)?;
        drop(data);
        info!(members = extracted.len(), "Extracted feed members");

        // 5. Build the database from the extracted files
        let database_path = self.config.output_dir.join(&keys.database);
        loader::remove_stale_database(&database_path)?;
        let report = AnalyticalLoader::new(&database_path).load(scratch.path())?;
        scratch.remove()?;

        // 6. Publish the database, which marks the version as processed
        let database =
            publisher::publish_database(self.store.as_ref(), &database_path, &keys.database)
                .await?;

        info!(%version, resumed, "Feed version published");

        Ok(IngestOutcome::Published {
            version,
            keys,
            resumed,
            tables: report.tables,
            database,
        })
    }

    async fn acquire_archive(
        &self,
        feed: &ResolvedFeed,
        keys: &FeedKeys,
        resumed: bool,
    ) -> Result<Vec<u8>> {
        if resumed {
            info!(key = %keys.archive, "Resuming from previously published archive");
            let data = self.store.get(&keys.archive).await?;
            info!(bytes = data.len(), sha256 = %sha256_hex(&data), "Fetched stored archive");
            return Ok(data);
        }

        let data = archive::download(&self.http, &feed.url).await?;
        let upload = self.store.put(&keys.archive, data.clone()).await?;
        info!(
            key = %upload.key,
            size = upload.size,
            sha256 = %upload.checksum,
            "Published feed archive"
        );
        Ok(data)
    }
}
