//! GTFS-FP Ingest - publish the current timetable feed

use clap::Parser;
use gtfs_fp_common::logging::{init_logging, LogConfig, LogLevel};
use gtfs_fp_ingest::config::{IngestArgs, IngestConfig};
use gtfs_fp_ingest::storage::S3Storage;
use gtfs_fp_ingest::{IngestError, IngestOutcome, IngestPipeline};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing .env file is normal in production
    dotenvy::dotenv().ok();

    let args = IngestArgs::parse();

    let log_level = if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("gtfs-fp-ingest")
        .build();

    // Environment variables take precedence
    let log_config = match log_config.with_env_overrides() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid logging configuration: {:#}", e);
            return ExitCode::FAILURE;
        },
    };

    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        },
    };

    match run(args).await {
        Ok(IngestOutcome::AlreadyProcessed { version }) => {
            info!(%version, "Nothing to do");
            ExitCode::SUCCESS
        },
        Ok(IngestOutcome::Published {
            version,
            keys,
            resumed,
            tables,
            ..
        }) => {
            let rows: u64 = tables.iter().map(|t| t.rows).sum();
            info!(
                %version,
                archive = %keys.archive,
                database = %keys.database,
                resumed,
                rows,
                "Ingestion complete"
            );
            ExitCode::SUCCESS
        },
        Err(e) => {
            error!(error = %e, stage = e.stage(), "Ingestion failed");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: IngestArgs) -> Result<IngestOutcome, IngestError> {
    let config = IngestConfig::try_from(args)?;

    let storage = S3Storage::new(&config.storage);
    let pipeline = IngestPipeline::new(config.pipeline, Arc::new(storage))?;

    pipeline.run().await
}
