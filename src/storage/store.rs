// file: src/storage/store.rs
// description: object storage trait with bucket/key addressing
// reference: list/get/put/delete semantics of cloud object stores

use crate::error::Result;
use async_trait::async_trait;

/// Metadata describing a single stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub content_type: String,
}

/// Abstraction over an object storage backend.
///
/// Keys are flat names within a bucket; listing returns objects in
/// lexicographic key order so callers see a stable view.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object in `bucket`, sorted by key.
    async fn list(&self, bucket: &str) -> Result<Vec<ObjectMeta>>;

    /// Fetch the full contents of `bucket/key`. Missing objects are a
    /// `PipelineError::Storage`.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Write `bytes` to `bucket/key`, overwriting any prior object and
    /// recording `content_type` as advisory metadata.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str)
    -> Result<()>;

    /// Remove `bucket/key`. Deleting a missing object is an error.
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// Existence probe; absence is not an error.
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool>;
}
