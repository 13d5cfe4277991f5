//! Remote Store Port - Realtime Document Store Interface
//!
//! Defines the trait the repositories use to read, write and watch a
//! hierarchical JSON document store addressed by slash-separated paths
//! (`players`, `players/{id}`, `attendance/{date}`).
//!
//! Key design decisions:
//! - Writes replace the addressed value entirely; `merge` is the only
//!   partial write and it is atomic across the given children
//! - Writing `null` (or an empty object) removes the value
//! - Live subscriptions are owned handles; dropping one detaches it

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::{StoreError, ValidationError};

/// Validated location in the store.
///
/// Segments are non-empty and never contain `.`, `$`, `#`, `[`, `]`
/// or `/`. The empty path addresses the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath(String);

impl StorePath {
  /// Parse a path, ignoring leading and trailing slashes.
  pub fn new(path: &str) -> Result<Self, ValidationError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
      return Ok(Self::root());
    }
    if !trimmed.split('/').all(is_valid_key) {
      return Err(ValidationError::InvalidPath(path.to_string()));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub const fn root() -> Self {
    Self(String::new())
  }

  /// Wrap a path built from known-good keys without checking it.
  pub(crate) fn trusted(path: impl Into<String>) -> Self {
    Self(path.into())
  }

  /// Path of a direct child whose key is known to be valid, such as a
  /// generated push id.
  pub(crate) fn trusted_child(&self, key: &str) -> Self {
    debug_assert!(is_valid_key(key), "invalid key {key:?}");
    if self.is_root() {
      Self::trusted(key)
    } else {
      Self::trusted(format!("{}/{key}", self.0))
    }
  }

  /// Path of a direct child named `key`.
  pub fn child(&self, key: &str) -> Result<Self, ValidationError> {
    if !is_valid_key(key) {
      return Err(ValidationError::InvalidPath(format!("{}/{key}", self.0)));
    }
    if self.is_root() {
      return Ok(Self(key.to_string()));
    }
    Ok(Self(format!("{}/{key}", self.0)))
  }

  pub fn is_root(&self) -> bool {
    self.0.is_empty()
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn segments(&self) -> Vec<&str> {
    if self.is_root() {
      Vec::new()
    } else {
      self.0.split('/').collect()
    }
  }

  /// Last segment, or `None` for the root.
  pub fn key(&self) -> Option<&str> {
    self.0.rsplit('/').next().filter(|k| !k.is_empty())
  }

  /// True if `self` is `other` or one of its ancestors.
  pub fn contains(&self, other: &Self) -> bool {
    self.is_root()
      || self.0 == other.0
      || (other.0.starts_with(&self.0) && other.0.as_bytes().get(self.0.len()) == Some(&b'/'))
  }

  /// True if a write at one path can change the value at the other.
  pub fn overlaps(&self, other: &Self) -> bool {
    self.contains(other) || other.contains(self)
  }
}

impl fmt::Display for StorePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_root() {
      f.write_str("/")
    } else {
      f.write_str(&self.0)
    }
  }
}

fn is_valid_key(key: &str) -> bool {
  !key.is_empty()
    && !key
      .chars()
      .any(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_control())
}

/// Opaque version token of a stored value.
///
/// Two reads return the same revision only if the value did not change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
  pub fn new(token: impl Into<String>) -> Self {
    Self(token.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// A value read together with its revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
  /// `None` if nothing is stored at the path.
  pub value: Option<Value>,
  pub revision: Revision,
}

/// Live listener on one path.
///
/// Holds the latest snapshot of the path. The snapshot present when
/// [`RemoteStore::subscribe`] returns is reported by the first call to
/// [`Subscription::changed`], so a consumer looping on `changed` sees the
/// current value immediately and every later change after it.
pub struct Subscription {
  path: StorePath,
  rx: watch::Receiver<Option<Value>>,
  detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
  /// Wrap a snapshot receiver. `detach` runs exactly once, on
  /// [`Subscription::unsubscribe`] or drop.
  pub fn new(
    path: StorePath,
    mut rx: watch::Receiver<Option<Value>>,
    detach: impl FnOnce() + Send + Sync + 'static,
  ) -> Self {
    rx.mark_changed();
    Self {
      path,
      rx,
      detach: Some(Box::new(detach)),
    }
  }

  pub const fn path(&self) -> &StorePath {
    &self.path
  }

  /// Latest snapshot without waiting.
  pub fn current(&self) -> Option<Value> {
    self.rx.borrow().clone()
  }

  /// Wait for the next snapshot.
  ///
  /// # Errors
  /// `StoreError::Closed` once the store stops delivering updates.
  pub async fn changed(&mut self) -> Result<Option<Value>, StoreError> {
    self.rx.changed().await.map_err(|_| StoreError::Closed)?;
    Ok(self.rx.borrow_and_update().clone())
  }

  /// Detach the listener.
  pub fn unsubscribe(mut self) {
    self.detach_now();
  }

  fn detach_now(&mut self) {
    if let Some(detach) = self.detach.take() {
      detach();
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.detach_now();
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("path", &self.path)
      .field("attached", &self.detach.is_some())
      .finish()
  }
}

/// Trait for realtime document store backends.
///
/// Implementors talk to the hosted database (or keep an in-process tree)
/// and push changes to subscribers. The store is the single source of
/// truth; callers never patch their caches locally after a write.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
  /// One-shot read. `None` if nothing is stored at `path`.
  async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

  /// One-shot read that also returns the value's revision.
  async fn read_versioned(&self, path: &StorePath) -> Result<Versioned, StoreError>;

  /// Register a live listener. Returns once the current value is known.
  async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError>;

  /// Replace the value at `path`. Returns after the store acknowledged it.
  async fn write(&self, path: &StorePath, value: &Value) -> Result<(), StoreError>;

  /// Replace the value at `path` only if it still has revision `expected`.
  ///
  /// # Errors
  /// `StoreError::PreconditionFailed` if the value changed since `expected`
  /// was read.
  async fn write_if(
    &self,
    path: &StorePath,
    value: &Value,
    expected: &Revision,
  ) -> Result<Revision, StoreError>;

  /// Atomically replace the listed children of `path`, leaving other
  /// children untouched. A `null` child is removed.
  async fn merge(&self, path: &StorePath, fields: &Map<String, Value>) -> Result<(), StoreError>;

  /// Allocate a new, uniquely named child of `path` without writing it.
  fn append(&self, path: &StorePath) -> StorePath;

  /// Remove the value at `path`. Removing nothing is not an error.
  async fn delete(&self, path: &StorePath) -> Result<(), StoreError>;

  /// Check if the store is reachable.
  async fn is_healthy(&self) -> bool;
}
