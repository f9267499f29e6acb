// Blob Store: object storage for uploaded artifacts and extraction
// results, following the conventions of `storage::minio`.

pub mod minio;

pub use minio::MinioClient;

use crate::errors::BlobError;
use async_trait::async_trait;

/// Abstract Blob Store interface: `put`, `get`, `delete`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), BlobError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;
    async fn delete(&self, key: &str) -> Result<(), BlobError>;
}

#[async_trait]
impl BlobStore for MinioClient {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), BlobError> {
        self.put_object(key, data).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        self.get_object(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        self.delete_object(key).await
    }
}
