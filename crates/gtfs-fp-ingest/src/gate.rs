//! Version gate
//!
//! The published database is the witness that a version was fully processed.
//! The archive alone only proves an earlier run got past its first upload.

use gtfs_fp_common::types::FeedKeys;
use tracing::{debug, instrument};

use crate::error::StorageError;
use crate::storage::ObjectStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Database already published; nothing to do
    AlreadyPublished,
    /// Archive published by an interrupted run; reuse it instead of downloading
    ResumeFromArchive,
    /// Nothing published for this version yet
    Fresh,
}

/// Decide what a run has to do for `keys`.
///
/// The database key is checked first, so an already processed version costs
/// exactly one storage call. Any check failure aborts the run; it is never
/// read as "absent".
#[instrument(skip(store), fields(bucket = store.bucket()))]
pub async fn check(store: &dyn ObjectStore, keys: &FeedKeys) -> Result<GateDecision, StorageError> {
    if store.exists(&keys.database).await? {
        return Ok(GateDecision::AlreadyPublished);
    }

    let decision = if store.exists(&keys.archive).await? {
        GateDecision::ResumeFromArchive
    } else {
        GateDecision::Fresh
    };

    debug!(?decision, "Version gate evaluated");
    Ok(decision)
}
