//! Command-line and environment configuration
//!
//! Every setting can come from a flag or its environment variable; `main`
//! loads an optional `.env` file first.

use clap::Parser;
use reqwest::Url;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::pipeline::PipelineConfig;
use crate::storage::config::{StorageConfig, DEFAULT_BUCKET, DEFAULT_REGION};

#[derive(Parser, Debug, Clone)]
#[command(name = "gtfs-fp-ingest")]
#[command(author, version, about = "Publish the current GTFS-FP timetable as a DuckDB file")]
pub struct IngestArgs {
    /// Landing URL that redirects to the current feed archive
    #[arg(long, env = "GTFS_FP_ENDPOINT")]
    pub landing_url: String,

    /// S3-compatible endpoint (https:// is assumed without a scheme)
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: String,

    #[arg(long, env = "S3_ACCESS_KEY")]
    pub s3_access_key: String,

    #[arg(long, env = "S3_SECRET_KEY", hide_env_values = true)]
    pub s3_secret_key: String,

    #[arg(long, env = "S3_BUCKET", default_value = DEFAULT_BUCKET)]
    pub s3_bucket: String,

    #[arg(long, env = "S3_REGION", default_value = DEFAULT_REGION)]
    pub s3_region: String,

    /// Address buckets by path instead of virtual host (MinIO)
    #[arg(long, env = "S3_PATH_STYLE", default_value_t = false)]
    pub s3_path_style: bool,

    /// Temporary directory for extracted feed files
    #[arg(long, env = "GTFS_FP_SCRATCH_DIR", default_value = "tmp")]
    pub scratch_dir: PathBuf,

    /// Directory the DuckDB file is written to before upload
    #[arg(long, env = "GTFS_FP_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated configuration for one run
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.pipeline.landing_url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "landing URL",
                format!("unsupported scheme '{}'", self.pipeline.landing_url.scheme()),
            ));
        }
        self.pipeline.validate()?;
        self.storage.validate()
    }
}

impl TryFrom<IngestArgs> for IngestConfig {
    type Error = ConfigError;

    fn try_from(args: IngestArgs) -> Result<Self, Self::Error> {
        let landing_url = Url::parse(args.landing_url.trim())
            .map_err(|err| ConfigError::invalid("landing URL", err.to_string()))?;

        let config = Self {
            pipeline: PipelineConfig {
                landing_url,
                scratch_dir: args.scratch_dir,
                output_dir: args.output_dir,
            },
            storage: StorageConfig {
                endpoint: args.s3_endpoint,
                region: args.s3_region,
                bucket: args.s3_bucket,
                access_key: args.s3_access_key,
                secret_key: args.s3_secret_key,
                path_style: args.s3_path_style,
            },
        };

        config.validate()?;
        Ok(config)
    }
}
