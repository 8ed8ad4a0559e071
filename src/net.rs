//! HTTP access to the remote photo catalog.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::state::data::{ImageDetail, ImageSummary};

/// Errors from talking to the remote service.
///
/// Kept as plain strings so results can travel inside UI messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("Error: {reason} ({status})")]
    Status { status: u16, reason: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for NetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            NetError::Parse(err.to_string())
        } else {
            NetError::Transport(err.to_string())
        }
    }
}

fn status_error(status: StatusCode) -> NetError {
    NetError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}

fn check_status(response: Response) -> Result<Response, NetError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(status_error(status))
    }
}

/// Client for the catalog list, image detail and binary downloads
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl CatalogClient {
    pub fn new(base_url: &str, page_size: usize, user_agent: &str) -> Result<Self, NetError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| NetError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn list_url(&self, page: u32) -> String {
        format!("{}/v2/list?page={}&limit={}", self.base_url, page, self.page_size)
    }

    pub fn detail_url(&self, image_id: &str) -> String {
        format!("{}/id/{}/info", self.base_url, image_id)
    }

    /// Fetch one page of image summaries (1-based)
    pub async fn list_images(&self, page: u32) -> Result<Vec<ImageSummary>, NetError> {
        self.get_json(&self.list_url(page)).await
    }

    /// Fetch metadata for one image
    pub async fn image_detail(&self, image_id: &str) -> Result<ImageDetail, NetError> {
        self.get_json(&self.detail_url(image_id)).await
    }

    /// Download the raw bytes behind `url`
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, NetError> {
        let response = check_status(self.http.get(url).send().await?)?;
        let bytes = response.bytes().await?;
        tracing::debug!(url, len = bytes.len(), "downloaded resource");
        Ok(bytes.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, NetError> {
        tracing::debug!(url, "GET");
        let response = check_status(self.http.get(url).send().await?)?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| NetError::Parse(e.to_string()))
    }
}
