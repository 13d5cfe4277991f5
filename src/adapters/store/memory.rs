//! In-memory Store - Process-local Realtime Store
//!
//! Implements the `RemoteStore` port over a JSON tree held in memory.
//! Used for offline mode and tests. Behaves like the hosted store:
//! whole-value writes, atomic merges, content-hash revisions, and
//! listeners notified only when the value at their path actually changes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, instrument};

use super::push_id::PushIdGenerator;
use super::tree;
use crate::error::{StoreError, ValidationError};
use crate::ports::store::{RemoteStore, Revision, StorePath, Subscription, Versioned};

/// Revision reported for a path holding nothing.
const ABSENT_REVISION: &str = "null_etag";

struct Listener {
    id: u64,
    path: StorePath,
    tx: watch::Sender<Option<Value>>,
}

#[derive(Default)]
struct Tree {
    root: Value,
    listeners: Vec<Listener>,
    next_listener: u64,
}

impl Tree {
    fn value_at(&self, path: &StorePath) -> Option<Value> {
        tree::get(&self.root, &path.segments()).cloned()
    }

    fn revision_at(&self, path: &StorePath) -> Revision {
        revision_of(self.value_at(path).as_ref())
    }

    fn set(&mut self, path: &StorePath, value: Value) {
        tree::set(&mut self.root, &path.segments(), value);
    }

    /// Push fresh snapshots to listeners affected by a write at `path`.
    fn notify(&mut self, path: &StorePath) {
        self.listeners.retain(|listener| !listener.tx.is_closed());
        for listener in &self.listeners {
            if !listener.path.overlaps(path) {
                continue;
            }
            let fresh = tree::get(&self.root, &listener.path.segments()).cloned();
            listener.tx.send_if_modified(|current| {
                if *current == fresh {
                    false
                } else {
                    *current = fresh;
                    true
                }
            });
        }
    }
}

fn revision_of(value: Option<&Value>) -> Revision {
    value.map_or_else(
        || Revision::new(ABSENT_REVISION),
        |value| {
            // Map keys are sorted, so equal values serialize identically
            let mut hasher = DefaultHasher::new();
            value.to_string().hash(&mut hasher);
            Revision::new(format!("{:016x}", hasher.finish()))
        },
    )
}

/// Realtime store kept entirely in process memory.
///
/// Cloning shares the same tree, so several repositories (or a test
/// and the code under test) observe each other's writes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tree: Arc<Mutex<Tree>>,
    ids: Arc<PushIdGenerator>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `root` as the whole tree.
    pub fn with_data(root: Value) -> Self {
        let store = Self::new();
        store.lock().root = tree::normalize(root);
        store
    }

    /// Copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.lock().root.clone()
    }

    /// Number of attached live listeners.
    pub fn listener_count(&self) -> usize {
        let mut tree = self.lock();
        tree.listeners.retain(|listener| !listener.tx.is_closed());
        tree.listeners.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn detach(tree: &Weak<Mutex<Tree>>, id: u64) {
    if let Some(tree) = tree.upgrade() {
        let mut tree = tree.lock().unwrap_or_else(PoisonError::into_inner);
        tree.listeners.retain(|listener| listener.id != id);
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn read_once(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        Ok(self.lock().value_at(path))
    }

    async fn read_versioned(&self, path: &StorePath) -> Result<Versioned, StoreError> {
        let tree = self.lock();
        let value = tree.value_at(path);
        let revision = revision_of(value.as_ref());
        Ok(Versioned { value, revision })
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        let mut tree = self.lock();
        let (tx, rx) = watch::channel(tree.value_at(path));
        let id = tree.next_listener;
        tree.next_listener += 1;
        tree.listeners.push(Listener {
            id,
            path: path.clone(),
            tx,
        });
        debug!(listener = id, "Listener attached");

        let weak = Arc::downgrade(&self.tree);
        Ok(Subscription::new(path.clone(), rx, move || detach(&weak, id)))
    }

    #[instrument(skip(self, value), fields(path = %path))]
    async fn write(&self, path: &StorePath, value: &Value) -> Result<(), StoreError> {
        let mut tree = self.lock();
        tree.set(path, value.clone());
        tree.notify(path);
        Ok(())
    }

    #[instrument(skip(self, value, expected), fields(path = %path))]
    async fn write_if(
        &self,
        path: &StorePath,
        value: &Value,
        expected: &Revision,
    ) -> Result<Revision, StoreError> {
        let mut tree = self.lock();
        if tree.revision_at(path) != *expected {
            return Err(StoreError::PreconditionFailed(path.to_string()));
        }
        tree.set(path, value.clone());
        tree.notify(path);
        Ok(tree.revision_at(path))
    }

    #[instrument(skip(self, fields), fields(path = %path, children = fields.len()))]
    async fn merge(&self, path: &StorePath, fields: &Map<String, Value>) -> Result<(), StoreError> {
        let children = fields
            .iter()
            .map(|(key, value)| Ok((path.child(key)?, value)))
            .collect::<Result<Vec<_>, ValidationError>>()
            .map_err(|e| StoreError::InvalidPath(e.to_string()))?;

        let mut tree = self.lock();
        for (child, value) in children {
            tree.set(&child, value.clone());
        }
        tree.notify(path);
        Ok(())
    }

    fn append(&self, path: &StorePath) -> StorePath {
        // Push ids only use characters valid in a key
        path.trusted_child(&self.ids.next_id())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        let mut tree = self.lock();
        tree.set(path, Value::Null);
        tree.notify(path);
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
