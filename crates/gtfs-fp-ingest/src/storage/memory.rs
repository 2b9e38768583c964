//! In-process object store
//!
//! Backs tests and dry runs. Every call is recorded so callers can assert on
//! exactly which storage operations a pipeline run performed.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{ObjectStore, UploadResult};
use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Exists,
    Put,
    Get,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub key: String,
}

#[derive(Default)]
struct State {
    objects: HashMap<String, Vec<u8>>,
    calls: Vec<StoreCall>,
    failures: HashSet<(StoreOp, String)>,
}

pub struct MemoryStore {
    bucket: String,
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Seed an object without recording a call
    pub fn with_object(self, key: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.lock().objects.insert(key.into(), data.into());
        self
    }

    /// Make every `op` on `key` fail until cleared
    pub fn fail_on(&self, op: StoreOp, key: impl Into<String>) {
        self.lock().failures.insert((op, key.into()));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(key).cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn calls_of(&self, op: StoreOp) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.op == op)
            .map(|call| call.key.clone())
            .collect()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, op: StoreOp, key: &str) -> MutexGuard<'_, State> {
        let mut state = self.lock();
        state.calls.push(StoreCall {
            op,
            key: key.to_string(),
        });
        state
    }
}

fn injected(key: &str) -> String {
    format!("injected failure for '{}'", key)
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let state = self.record(StoreOp::Exists, key);
        if state.failures.contains(&(StoreOp::Exists, key.to_string())) {
            return Err(StorageError::Exists {
                key: key.to_string(),
                message: injected(key),
            });
        }
        Ok(state.objects.contains_key(key))
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<UploadResult, StorageError> {
        let mut state = self.record(StoreOp::Put, key);
        if state.failures.contains(&(StoreOp::Put, key.to_string())) {
            return Err(StorageError::Put {
                key: key.to_string(),
                message: injected(key),
            });
        }
        let result = UploadResult::for_data(key, &data);
        state.objects.insert(key.to_string(), data);
        Ok(result)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let state = self.record(StoreOp::Get, key);
        if state.failures.contains(&(StoreOp::Get, key.to_string())) {
            return Err(StorageError::Get {
                key: key.to_string(),
                message: injected(key),
            });
        }
        state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get_is_byte_identical() {
        let store = MemoryStore::new("gtfs-fp");
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        let upload = store.put("2025_feed.zip", payload.clone()).await.unwrap();
        assert_eq!(upload.size, 4096);

        let fetched = store.get("2025_feed.zip").await.unwrap();
        assert_eq!(fetched, payload);
        assert_eq!(UploadResult::for_data("x", &fetched).checksum, upload.checksum);
    }

    #[tokio::test]
    async fn test_exists_distinguishes_absent_from_failure() {
        let store = MemoryStore::new("gtfs-fp").with_object("2025_feed.db", b"db".to_vec());

        assert!(store.exists("2025_feed.db").await.unwrap());
        assert!(!store.exists("2025_feed.zip").await.unwrap());

        store.fail_on(StoreOp::Exists, "2025_feed.zip");
        assert!(matches!(
            store.exists("2025_feed.zip").await,
            Err(StorageError::Exists { .. })
        ));

        store.clear_failures();
        assert!(!store.exists("2025_feed.zip").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryStore::new("gtfs-fp");
        assert!(matches!(
            store.get("nope").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_calls_are_recorded_in_order() {
        let store = MemoryStore::new("gtfs-fp").with_object("a", b"1".to_vec());
        assert!(store.calls().is_empty());

        store.exists("a").await.unwrap();
        store.put("b", b"2".to_vec()).await.unwrap();
        store.get("a").await.unwrap();

        let ops: Vec<StoreOp> = store.calls().into_iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![StoreOp::Exists, StoreOp::Put, StoreOp::Get]);
        assert_eq!(store.calls_of(StoreOp::Put), vec!["b".to_string()]);

        store.reset_calls();
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_put_stores_nothing() {
        let store = MemoryStore::new("gtfs-fp");
        store.fail_on(StoreOp::Put, "2025_feed.db");

        assert!(store.put("2025_feed.db", b"db".to_vec()).await.is_err());
        assert!(store.object("2025_feed.db").is_none());
    }
}
