//! Image Uploader - Player Photos
//!
//! Stores a player photo under a unique object name and returns the URL
//! to save as the player's `photoURL`.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::error::{Error, Result, ValidationError};
use crate::ports::assets::AssetStorage;

/// Folder photos are stored under.
pub const PHOTO_PREFIX: &str = "players";

/// Uploads player photos to object storage.
#[derive(Clone)]
pub struct ImageUploader {
  storage: Arc<dyn AssetStorage>,
}

impl ImageUploader {
  pub fn new(storage: Arc<dyn AssetStorage>) -> Self {
    Self { storage }
  }

  /// Upload `bytes` as `file_name` and return its download URL.
  ///
  /// The object is named `players/{unix_millis}_{file_name}`; only the
  /// last path component of `file_name` is kept.
  #[instrument(skip(self, bytes), fields(size = bytes.len()))]
  pub async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> Result<String> {
    if bytes.is_empty() {
      return Err(ValidationError::EmptyUpload.into());
    }
    let object_name = object_name(Utc::now().timestamp_millis(), file_name)?;
    let content_type = content_type_for(&object_name);

    let url = self
      .storage
      .put(&object_name, bytes, content_type)
      .await
      .map_err(|e| Error::upload("Failed to upload image", e))?;
    info!(object = %object_name, "Photo uploaded");
    Ok(url)
  }
}

/// Object name for a photo uploaded at `timestamp_ms`.
pub fn object_name(timestamp_ms: i64, file_name: &str) -> Result<String, ValidationError> {
  let base = file_name
    .rsplit(['/', '\\'])
    .next()
    .unwrap_or_default()
    .trim();
  if base.is_empty() {
    return Err(ValidationError::MissingFileName);
  }
  Ok(format!("{PHOTO_PREFIX}/{timestamp_ms}_{base}"))
}

/// Content type guessed from the file extension.
pub fn content_type_for(name: &str) -> &'static str {
  let ext = Path::new(name)
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase);
  match ext.as_deref() {
    Some("jpg" | "jpeg") => "image/jpeg",
    Some("png") => "image/png",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    Some("heic") => "image/heic",
    Some("svg") => "image/svg+xml",
    _ => "application/octet-stream",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::assets::MemoryAssets;

  #[test]
  fn test_object_name_strips_directories() {
    assert_eq!(
      object_name(1_700_000_000_000, "C:\\photos\\alex.PNG").unwrap(),
      "players/1700000000000_alex.PNG"
    );
    assert_eq!(
      object_name(5, "../../etc/a.jpg").unwrap(),
      "players/5_a.jpg"
    );
    assert_eq!(
      object_name(5, "dir/").unwrap_err(),
      ValidationError::MissingFileName
    );
  }

  #[test]
  fn test_content_type() {
    assert_eq!(content_type_for("players/1_a.JPG"), "image/jpeg");
    assert_eq!(content_type_for("players/1_a.webp"), "image/webp");
    assert_eq!(content_type_for("players/1_a"), "application/octet-stream");
  }

  #[tokio::test]
  async fn test_upload_stores_object() {
    let assets = MemoryAssets::new();
    let uploader = ImageUploader::new(Arc::new(assets.clone()));

    let url = uploader.upload(vec![1, 2, 3], "alex.png").await.unwrap();
    assert!(url.starts_with("memory://players/"));
    assert_eq!(assets.len(), 1);

    let name = url.trim_start_matches("memory://");
    let stored = assets.get(name).unwrap();
    assert_eq!(stored.content_type, "image/png");
    assert_eq!(stored.bytes, vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn test_empty_upload_rejected() {
    let uploader = ImageUploader::new(Arc::new(MemoryAssets::new()));
    let err = uploader.upload(Vec::new(), "a.png").await.unwrap_err();
    assert!(err.is_validation());
  }
}
