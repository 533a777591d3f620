//! Object storage for generated PDFs
//!
//! Documents are written under `pdf/<uuid>/<name>` and addressed by a public
//! URL formed from the configured base URL and the object key.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Content type of every stored document
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Storage backend for finished documents
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing object
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
}

/// S3-compatible storage client
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Create a new S3 client from configuration
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "pdf-form-server",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .endpoint_url(endpoint)
                .force_path_style(true); // Required for MinIO and other S3-compatible services
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| Error::Storage {
                reason: format!("Failed to put object {}: {}", key, e),
            })?;
        Ok(())
    }
}

/// In-process store, used by tests and benchmarks
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored bytes for a key
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key).map(|(bytes, _)| bytes.clone())
    }

    /// Content type recorded for a key
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().get(key).map(|(_, ct)| ct.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects
            .lock()
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }
}

/// Object key for a document: `pdf/<uuid-v4>/<name>`
pub fn object_key(name: &str) -> String {
    format!("pdf/{}/{}", uuid::Uuid::new_v4(), name)
}

/// Public URL of a stored object; the key is appended verbatim
pub fn public_url(base_url: &str, key: &str) -> String {
    format!("{}{}", base_url, key)
}

/// Store a document under a fresh key and return its public URL
pub async fn persist(
    store: &dyn ObjectStore,
    base_url: &str,
    bytes: Vec<u8>,
    name: &str,
) -> Result<String> {
    let key = object_key(name);
    let size = bytes.len();

    store
        .put(&key, bytes, PDF_CONTENT_TYPE)
        .await
        .map_err(|e| match e {
            Error::Storage { .. } => e,
            other => Error::Storage {
                reason: other.to_string(),
            },
        })?;

    tracing::info!(key = %key, bytes = size, "Document stored");
    Ok(public_url(base_url, &key))
}
