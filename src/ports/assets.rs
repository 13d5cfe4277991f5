//! Asset Storage Port - Object Storage Interface
//!
//! Defines the trait for storing binary blobs (player photos) in a
//! hosted object store and resolving them to a public URL.

use async_trait::async_trait;

use crate::error::UploadError;

/// Trait for object storage providers.
#[async_trait]
pub trait AssetStorage: Send + Sync + 'static {
  /// Store `bytes` under `object_name` and return a URL anyone can fetch.
  ///
  /// An existing object with the same name is overwritten.
  async fn put(
    &self,
    object_name: &str,
    bytes: Vec<u8>,
    content_type: &str,
  ) -> Result<String, UploadError>;
}
