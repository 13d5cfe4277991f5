//! Asset Storage Adapters - Player Photo Uploads
//!
//! Implements the `AssetStorage` port with Firebase Storage (hosted) and
//! an in-memory variant for offline mode.

pub mod firebase_storage;
pub mod memory;

pub use firebase_storage::{FirebaseStorage, StorageConfig};
pub use memory::MemoryAssets;
