// MinIO client, following the conventions of `storage::minio::MinioClient`
// (rust-s3 Bucket with path-style addressing).

use crate::config::MinioConfig;
use crate::errors::BlobError;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct MinioClient {
    bucket: Arc<Bucket>,
}

impl MinioClient {
    #[instrument(skip(config), fields(endpoint = %config.endpoint, bucket = %config.bucket))]
    pub fn new(config: &MinioConfig) -> Result<Self, BlobError> {
        let endpoint = config
            .endpoint
            .trim_start_matches("http://")
            .trim_start_matches("https://");

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| BlobError::Put {
            key: String::new(),
            reason: format!("failed to create credentials: {e}"),
        })?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: endpoint.to_string(),
        };

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| BlobError::Put {
                key: String::new(),
                reason: format!("failed to construct bucket handle: {e}"),
            })?
            .with_path_style();

        Ok(Self {
            bucket: Arc::new(bucket),
        })
    }

    #[instrument(skip(self, data), fields(key = %key, size = data.len()))]
    pub async fn put_object(&self, key: &str, data: &[u8]) -> Result<(), BlobError> {
        self.bucket
            .put_object(key, data)
            .await
            .map_err(|e| BlobError::Put {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        debug!(key = %key, "object stored");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn get_object(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| BlobError::Get {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(response.bytes().to_vec())
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn delete_object(&self, key: &str) -> Result<(), BlobError> {
        self.bucket
            .delete_object(key)
            .await
            .map_err(|e| BlobError::Delete {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn object_exists(&self, key: &str) -> Result<bool, BlobError> {
        match self.bucket.head_object(key).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("404") || msg.contains("Not Found") {
                    Ok(false)
                } else {
                    Err(BlobError::Get {
                        key: key.to_string(),
                        reason: msg,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MinioConfig {
        MinioConfig {
            endpoint: "http://localhost:9000".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket: "test-bucket".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn client_construction_succeeds_offline() {
        let config = test_config();
        assert!(MinioClient::new(&config).is_ok());
    }
}
