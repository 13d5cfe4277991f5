//! Object Storage Client - Player Photo Uploads
//!
//! Uploads blobs through the Firebase Storage REST API and resolves them
//! to a tokenised download URL that any client can fetch.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::UploadError;
use crate::ports::assets::AssetStorage;

/// Configuration for the object storage client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
  /// API base URL.
  pub base_url: String,
  /// Bucket name, e.g. `team.firebasestorage.app`.
  pub bucket: String,
  /// Optional Firebase ID token for authenticated uploads.
  pub auth_token: Option<String>,
  /// Request timeout.
  pub timeout: Duration,
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self {
      base_url: "https://firebasestorage.googleapis.com/v0".to_string(),
      bucket: String::new(),
      auth_token: None,
      timeout: Duration::from_secs(60),
    }
  }
}

/// Subset of the object metadata returned after an upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
  name: String,
  /// Comma-separated download tokens.
  #[serde(default)]
  download_tokens: Option<String>,
}

/// Firebase Storage client.
pub struct FirebaseStorage {
  http: Client,
  config: StorageConfig,
  base: Url,
}

impl FirebaseStorage {
  /// Create a new storage client.
  pub fn new(config: StorageConfig) -> Result<Self> {
    anyhow::ensure!(!config.bucket.is_empty(), "Storage bucket must not be empty");
    let base = Url::parse(&config.base_url)
      .with_context(|| format!("Invalid storage URL: {}", config.base_url))?;

    let http = Client::builder()
      .timeout(config.timeout)
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self { http, config, base })
  }

  /// `{base}/b/{bucket}/o`, plus `/{object}` when given.
  fn object_url(&self, object_name: Option<&str>) -> Result<Url, UploadError> {
    let mut url = self.base.clone();
    {
      let mut segments = url
        .path_segments_mut()
        .map_err(|()| UploadError::InvalidUrl(self.config.base_url.clone()))?;
      segments.pop_if_empty().extend(["b", self.config.bucket.as_str(), "o"]);
      if let Some(name) = object_name {
        // One segment: slashes in the object name are percent-encoded
        segments.push(name);
      }
    }
    Ok(url)
  }

  /// Public download URL for an uploaded object.
  fn download_url(&self, object_name: &str, token: &str) -> Result<Url, UploadError> {
    let mut url = self.object_url(Some(object_name))?;
    url
      .query_pairs_mut()
      .append_pair("alt", "media")
      .append_pair("token", token);
    Ok(url)
  }
}

#[async_trait]
impl AssetStorage for FirebaseStorage {
  #[instrument(skip(self, bytes), fields(object = %object_name, size = bytes.len()))]
  async fn put(
    &self,
    object_name: &str,
    bytes: Vec<u8>,
    content_type: &str,
  ) -> Result<String, UploadError> {
    let mut url = self.object_url(None)?;
    url
      .query_pairs_mut()
      .append_pair("uploadType", "media")
      .append_pair("name", object_name);

    let mut request = self
      .http
      .post(url)
      .header(CONTENT_TYPE, content_type)
      .body(bytes);
    if let Some(token) = &self.config.auth_token {
      request = request.header(AUTHORIZATION, format!("Firebase {token}"));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!(status = %status, "Upload rejected by object storage");
      return Err(UploadError::Status {
        status: status.as_u16(),
        body,
      });
    }

    let metadata: ObjectMetadata = response.json().await?;
    let token = metadata
      .download_tokens
      .as_deref()
      .and_then(|tokens| tokens.split(',').next())
      .filter(|token| !token.is_empty())
      .ok_or(UploadError::MissingToken)?;

    let url = self.download_url(&metadata.name, token)?;
    info!(object = %metadata.name, "Asset uploaded");
    Ok(url.to_string())
  }
}
