use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, RANGE};
use reqwest::Client;
use tracing::debug;

use super::range_reader::{check_length, check_range};
use super::RangeReader;
use crate::error::IoError;

/// Default timeout applied to every HTTP request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP(S) implementation of RangeReader.
///
/// The resource size is discovered with a HEAD request on creation. Each read
/// is a single GET with a `Range` header; servers that ignore the header and
/// return the whole body are rejected by the length check.
#[derive(Clone)]
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
}

impl HttpRangeReader {
    /// Open a URL with the default timeout.
    pub async fn new(url: &str) -> Result<Self, IoError> {
        Self::with_timeout(url, DEFAULT_HTTP_TIMEOUT).await
    }

    /// Open a URL, applying `timeout` to every request.
    pub async fn with_timeout(url: &str, timeout: Duration) -> Result<Self, IoError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IoError::Http(e.to_string()))?;

        Self::with_client(client, url).await
    }

    /// Open a URL using an existing client.
    pub async fn with_client(client: Client, url: &str) -> Result<Self, IoError> {
        let response = client
            .head(url)
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(IoError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(IoError::Http(format!(
                "HEAD {} failed with status {}",
                url, status
            )));
        }

        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| IoError::Http(format!("HEAD {} returned no Content-Length", url)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            size,
        })
    }

    /// The URL being read.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RangeReader for HttpRangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.size)?;

        if len == 0 {
            return Ok(Bytes::new());
        }

        let range = format!("bytes={}-{}", offset, offset + len as u64 - 1);
        debug!(url = %self.url, %range, "HTTP range request");

        let response = self
            .client
            .get(&self.url)
            .header(RANGE, range)
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IoError::Http(format!(
                "GET {} failed with status {}",
                self.url, status
            )));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        check_length(offset, len, data)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.url
    }
}
