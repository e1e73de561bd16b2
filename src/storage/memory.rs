// file: src/storage/memory.rs
// description: in-memory object store for tests and dry runs
// reference: storage trait implementation over a locked map

use crate::error::{PipelineError, Result};
use crate::storage::store::{ObjectMeta, ObjectStore};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Object store backed by an in-process map. Buckets spring into existence
/// on first write; listing an unknown bucket yields an empty result rather
/// than an error, matching how the filesystem backend treats absent
/// directories.
#[derive(Default)]
pub struct MemoryStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advisory content type recorded for `bucket/key`, if present.
    pub fn content_type_of(&self, bucket: &str, key: &str) -> Option<String> {
        let buckets = self.buckets.read().expect("memory store lock poisoned");
        buckets
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, bucket: &str) -> Result<Vec<ObjectMeta>> {
        let buckets = self.buckets.read().expect("memory store lock poisoned");
        let Some(objects) = buckets.get(bucket) else {
            return Ok(Vec::new());
        };

        Ok(objects
            .iter()
            .map(|(key, obj)| ObjectMeta {
                key: key.clone(),
                size: obj.bytes.len() as u64,
                content_type: obj.content_type.clone(),
            })
            .collect())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let buckets = self.buckets.read().expect("memory store lock poisoned");
        buckets
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| PipelineError::storage(bucket, format!("object not found: {}", key)))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let mut buckets = self.buckets.write().expect("memory store lock poisoned");
        buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let mut buckets = self.buckets.write().expect("memory store lock poisoned");
        let removed = buckets.get_mut(bucket).and_then(|b| b.remove(key));
        if removed.is_none() {
            return Err(PipelineError::storage(
                bucket,
                format!("cannot delete missing object: {}", key),
            ));
        }
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let buckets = self.buckets.read().expect("memory store lock poisoned");
        Ok(buckets.get(bucket).is_some_and(|b| b.contains_key(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_put_then_exists_and_get() {
        let store = MemoryStore::new();
        store
            .put("bucket", "a.pdf", b"pdf bytes".to_vec(), "application/pdf")
            .await
            .unwrap();

        assert!(store.exists("bucket", "a.pdf").await.unwrap());
        assert_eq!(store.get("bucket", "a.pdf").await.unwrap(), b"pdf bytes");
        assert_eq!(
            store.content_type_of("bucket", "a.pdf").unwrap(),
            "application/pdf"
        );
    }

    #[tokio::test]
    async fn test_get_missing_object_is_storage_error() {
        let store = MemoryStore::new();
        let err = store.get("bucket", "nope").await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_key() {
        let store = MemoryStore::new();
        store.put("b", "z.pdf", vec![1], "x").await.unwrap();
        store.put("b", "a.pdf", vec![2], "x").await.unwrap();

        let keys: Vec<String> = store
            .list("b")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["a.pdf", "z.pdf"]);
    }

    #[tokio::test]
    async fn test_list_unknown_bucket_is_empty() {
        let store = MemoryStore::new();
        assert!(store.list("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_error() {
        let store = MemoryStore::new();
        assert!(store.delete("bucket", "nope").await.is_err());
    }
}
