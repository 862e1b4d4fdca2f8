//! Remote interval lists.
//!
//! Interval files are usually the result artifact of an earlier operation and
//! are served over HTTP. Fetching is capped by the same byte limit as local
//! reads.

use crate::{Error, Result};
use url::Url;

#[cfg(feature = "http")]
pub async fn fetch_text(url: Url, max_bytes: Option<u64>) -> Result<String> {
    use reqwest::Client;

    let client = Client::builder()
        .build()
        .map_err(|e| Error::Internal(format!("failed to create HTTP client: {}", e)))?;

    tracing::debug!(%url, "fetching interval list");
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::Internal(format!("HTTP GET request failed: {}", e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::NotFound(url.to_string()));
    }
    if !status.is_success() {
        return Err(Error::Internal(format!(
            "fetching {} returned HTTP {}",
            url, status
        )));
    }

    if let (Some(limit), Some(len)) = (max_bytes, response.content_length()) {
        if len > limit {
            return Err(Error::FileTooLarge { limit });
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Internal(format!("failed to read HTTP response: {}", e)))?;

    if let Some(limit) = max_bytes {
        if bytes.len() as u64 > limit {
            return Err(Error::FileTooLarge { limit });
        }
    }

    String::from_utf8(bytes.to_vec())
        .map_err(|_| Error::InvalidInput(format!("interval list at {} is not UTF-8", url)))
}

#[cfg(not(feature = "http"))]
pub async fn fetch_text(url: Url, _max_bytes: Option<u64>) -> Result<String> {
    Err(Error::InvalidInput(format!(
        "cannot fetch {}: built without the `http` feature",
        url
    )))
}
