// file: src/storage/local.rs
// description: filesystem-backed object store, one directory per bucket
// reference: tokio::fs async file operations

use crate::error::{PipelineError, Result};
use crate::storage::store::{ObjectMeta, ObjectStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tokio::fs;
use tracing::debug;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Object store rooted at a local directory. Each bucket is a subdirectory
/// and each key a file inside it. Content types are advisory and kept in
/// process memory only; bytes on disk are the source of truth.
pub struct LocalBucketStore {
    root: PathBuf,
    content_types: RwLock<HashMap<(String, String), String>>,
}

impl LocalBucketStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            content_types: RwLock::new(HashMap::new()),
        }
    }

    fn bucket_path(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        // Keys are flat object names; reject anything that could escape the
        // bucket directory.
        if key.is_empty() || key.contains('/') || key.contains("..") {
            return Err(PipelineError::storage(
                bucket,
                format!("invalid object key: {}", key),
            ));
        }
        Ok(self.bucket_path(bucket).join(key))
    }

    fn recorded_content_type(&self, bucket: &str, key: &str) -> String {
        let types = self.content_types.read().expect("content type lock poisoned");
        types
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
    }
}

#[async_trait]
impl ObjectStore for LocalBucketStore {
    async fn list(&self, bucket: &str) -> Result<Vec<ObjectMeta>> {
        let dir = self.bucket_path(bucket);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            PipelineError::storage(bucket, format!("cannot list bucket: {}", e))
        })?;

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let key = entry.file_name().to_string_lossy().to_string();
            let content_type = self.recorded_content_type(bucket, &key);
            objects.push(ObjectMeta {
                key,
                size: metadata.len(),
                content_type,
            });
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::storage(bucket, format!("object not found: {}", key))
            } else {
                PipelineError::storage(bucket, format!("cannot read {}: {}", key, e))
            }
        })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        fs::create_dir_all(self.bucket_path(bucket)).await?;
        fs::write(&path, &bytes).await.map_err(|e| {
            PipelineError::storage(bucket, format!("cannot write {}: {}", key, e))
        })?;

        let mut types = self
            .content_types
            .write()
            .expect("content type lock poisoned");
        types.insert(
            (bucket.to_string(), key.to_string()),
            content_type.to_string(),
        );

        debug!("Stored {} bytes at {}/{}", bytes.len(), bucket, key);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::storage(bucket, format!("cannot delete missing object: {}", key))
            } else {
                PipelineError::storage(bucket, format!("cannot delete {}: {}", key, e))
            }
        })?;

        let mut types = self
            .content_types
            .write()
            .expect("content type lock poisoned");
        types.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let path = self.object_path(bucket, key)?;
        Ok(path.is_file())
    }
}
