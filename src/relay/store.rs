use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No such object: {bucket}/{name}")]
    NotFound { bucket: String, name: String },

    #[error("{0}")]
    Backend(String),
}

/// The subset of a blob store the relay needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError>;

    /// Names of every object in the bucket.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-process store for local runs and tests.
pub struct MemoryStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub async fn get(&self, name: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(name).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        self.objects.lock().await.insert(
            name.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.objects.lock().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        match self.objects.lock().await.remove(name) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                bucket: self.bucket.clone(),
                name: name.to_string(),
            }),
        }
    }
}
