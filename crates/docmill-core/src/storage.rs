//! Object storage: a small put-only trait with an S3 implementation and an
//! in-memory one for tests and storage-less runs.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),
}

/// Object keys written for one processed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageRefs {
    /// Key of the markdown document itself.
    pub markdown: String,
    /// Key of the metadata.json side file.
    pub metadata: String,
    /// Placeholder (`image_1`, ...) to image object key.
    pub images: BTreeMap<String, String>,
}

/// A write-only view of an object store. Every object carries a content
/// type and a flat set of metadata tags.
pub trait ObjectStore: Send + Sync {
    fn put<'a>(
        &'a self,
        key: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
        metadata: &'a BTreeMap<String, String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>;
}

/// S3 (or S3-compatible) object store via the official SDK. Credentials
/// come from the SDK's default provider chain, same environment variables
/// the original deployment used.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub async fn connect(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        // Custom endpoints are S3-compatible stores that want path-style keys
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint_url.is_some())
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

impl ObjectStore for S3Store {
    fn put<'a>(
        &'a self,
        key: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
        metadata: &'a BTreeMap<String, String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            let tags: HashMap<String, String> = metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .content_type(content_type)
                .set_metadata(Some(tags))
                .body(ByteStream::from(bytes))
                .send()
                .await
                .map_err(|e| StorageError::Upload(format!("{}", DisplayErrorContext(e))))?;
            tracing::debug!(key, "stored object");
            Ok(())
        })
    }
}

/// An object as the in-memory store recorded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
}

/// In-memory store for tests and local runs without bucket credentials.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<Vec<StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored objects in insertion order.
    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.key == key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryStore {
    fn put<'a>(
        &'a self,
        key: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
        metadata: &'a BTreeMap<String, String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            self.objects.lock().unwrap().push(StoredObject {
                key: key.to_string(),
                bytes,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn memory_store_records_objects_in_order() {
        let store = MemoryStore::new();
        let mut tags = BTreeMap::new();
        tags.insert("tool".to_string(), "mupdf".to_string());

        store
            .put("a/doc.md", b"# hi\n".to_vec(), "text/markdown", &tags)
            .await
            .unwrap();
        store
            .put("a/meta.json", b"{}".to_vec(), "application/json", &tags)
            .await
            .unwrap();

        let objects = store.objects();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key, "a/doc.md");
        assert_eq!(objects[1].key, "a/meta.json");
        assert_eq!(objects[0].content_type, "text/markdown");
        assert_eq!(objects[0].metadata.get("tool").map(String::as_str), Some("mupdf"));
    }

    #[tokio::test]
    async fn memory_store_lookup_by_key() {
        let store = MemoryStore::new();
        let tags = BTreeMap::new();
        store
            .put("x/y.bin", vec![1, 2, 3], "application/octet-stream", &tags)
            .await
            .unwrap();

        let found = store.get("x/y.bin").unwrap();
        assert_eq!(found.bytes, vec![1, 2, 3]);
        assert!(store.get("x/missing").is_none());
    }

    #[tokio::test]
    async fn works_through_a_trait_object() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let tags = BTreeMap::new();
        store.put("k", vec![0], "text/plain", &tags).await.unwrap();
    }
}
