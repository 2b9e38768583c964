//! Upload of the finished DuckDB file

use std::path::Path;
use tracing::{info, instrument};

use crate::error::PublishError;
use crate::storage::{ObjectStore, UploadResult};

/// Read the closed database file and store it under `key`
#[instrument(skip(store), fields(path = %database_path.display()))]
pub async fn publish_database(
    store: &dyn ObjectStore,
    database_path: &Path,
    key: &str,
) -> Result<UploadResult, PublishError> {
    let data = tokio::fs::read(database_path)
        .await
        .map_err(|source| PublishError::ReadDatabase {
            path: database_path.to_path_buf(),
            source,
        })?;

    let upload = store.put(key, data).await.map_err(PublishError::Upload)?;

    info!(
        key = %upload.key,
        size = upload.size,
        sha256 = %upload.checksum,
        "Published feed database"
    );
    Ok(upload)
}
