//! In-memory Asset Storage - Offline Uploads
//!
//! Keeps uploaded blobs in a map and hands out `memory://` URLs. Used in
//! offline mode and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::error::UploadError;
use crate::ports::assets::AssetStorage;

/// A stored blob with its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
  pub bytes: Vec<u8>,
  pub content_type: String,
}

/// Object storage kept in process memory. Clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
  objects: Arc<Mutex<HashMap<String, StoredAsset>>>,
}

impl MemoryAssets {
  pub fn new() -> Self {
    Self::default()
  }

  /// Object stored under `name`, if any.
  pub fn get(&self, name: &str) -> Option<StoredAsset> {
    self
      .objects
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get(name)
      .cloned()
  }

  pub fn len(&self) -> usize {
    self.objects.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl AssetStorage for MemoryAssets {
  async fn put(
    &self,
    object_name: &str,
    bytes: Vec<u8>,
    content_type: &str,
  ) -> Result<String, UploadError> {
    debug!(object = %object_name, size = bytes.len(), "Storing asset in memory");
    self
      .objects
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(
        object_name.to_string(),
        StoredAsset {
          bytes,
          content_type: content_type.to_string(),
        },
      );
    Ok(format!("memory://{object_name}"))
  }
}
