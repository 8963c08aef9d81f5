//! HTTP fetching of remote image references.

use crate::config::GenerationConfig;
use crate::error::{Result, TryOnError};
use crate::models::ImageData;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Downloads images that are referenced by URL rather than inlined.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
}

impl ImageFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(GenerationConfig::FETCH_TIMEOUT)
    }

    /// Create a fetcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(GenerationConfig::USER_AGENT)
            .build()
            .map_err(|e| TryOnError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// GET an image and determine its MIME type.
    ///
    /// The `Content-Type` header wins when it names an image type; otherwise
    /// the type is sniffed from the bytes.
    pub async fn fetch(&self, url: &Url) -> Result<ImageData> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| TryOnError::Transport {
                message: format!("Could not load image from {}: {}", url, e),
                status: e.status().map(|s| s.as_u16()),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(url, status));
        }

        let declared = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(content_type_essence)
            .filter(|mime| mime.starts_with("image/"));

        let bytes = response.bytes().await?.to_vec();
        debug!("Fetched {} bytes from {}", bytes.len(), url);

        match declared {
            Some(mime_type) => Ok(ImageData::new(mime_type, bytes)),
            None => ImageData::sniff(bytes),
        }
    }

    fn status_error(url: &Url, status: StatusCode) -> TryOnError {
        TryOnError::Transport {
            message: format!("Could not load image from {}: HTTP {}", url, status),
            status: Some(status.as_u16()),
        }
    }
}

/// `image/png; charset=binary` -> `image/png`
fn content_type_essence(value: &str) -> Option<String> {
    let essence = value.split(';').next()?.trim().to_ascii_lowercase();
    (!essence.is_empty()).then_some(essence)
}
