//! In-memory object storage for tests

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;
use axum::body::Bytes;

use super::{BucketError, BucketResult, ObjectMetadata, ObjectStorage};

/// An object as it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object content
    pub body: Bytes,
    /// Metadata passed on write
    pub metadata: ObjectMetadata,
}

/// Object storage keeping objects in a map, with switchable write failures
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    put_attempts: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryObjectStorage {
    /// Creates an empty bucket
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes fail with an upstream error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of write attempts, failed ones included
    #[must_use]
    pub fn put_attempts(&self) -> usize {
        self.put_attempts.load(Ordering::SeqCst)
    }

    /// Object currently stored under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects().get(key).cloned()
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<String, StoredObject>> {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        metadata: &ObjectMetadata,
    ) -> BucketResult<()> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BucketError::UpstreamError(
                "simulated write failure".to_string(),
            ));
        }

        self.objects().insert(
            key.to_string(),
            StoredObject {
                body,
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }
}
