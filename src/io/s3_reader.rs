use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use super::range_reader::{check_length, check_range};
use super::RangeReader;
use crate::error::IoError;

/// S3-backed implementation of RangeReader.
///
/// Reads byte ranges from COGs in S3 or S3-compatible storage (MinIO, etc.)
/// using ranged GetObject requests. The object size is fetched once on
/// creation via HEAD.
#[derive(Clone)]
pub struct S3RangeReader {
    client: Client,
    bucket: String,
    key: String,
    size: u64,
    identifier: String,
}

impl S3RangeReader {
    /// Create a new S3RangeReader for the given bucket and key.
    ///
    /// Returns an error if the object does not exist or is inaccessible.
    pub async fn new(client: Client, bucket: String, key: String) -> Result<Self, IoError> {
        let identifier = format!("s3://{}/{}", bucket, key);

        let head = client
            .head_object()
            .bucket(&bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                let is_not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                let status_is_404 = e
                    .raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false);

                if is_not_found || status_is_404 {
                    IoError::NotFound(identifier.clone())
                } else {
                    IoError::S3(e.to_string())
                }
            })?;

        let size = head.content_length().unwrap_or(0).max(0) as u64;

        Ok(Self {
            client,
            bucket,
            key,
            size,
            identifier,
        })
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the object key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl RangeReader for S3RangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.size)?;

        if len == 0 {
            return Ok(Bytes::new());
        }

        // "bytes=start-end" is inclusive on both ends
        let range = format!("bytes={}-{}", offset, offset + len as u64 - 1);
        debug!(source = %self.identifier, %range, "S3 range request");

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .range(range)
            .send()
            .await
            .map_err(|e| IoError::S3(e.to_string()))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?
            .into_bytes();

        check_length(offset, len, data)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services usually need path-style addressing
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
