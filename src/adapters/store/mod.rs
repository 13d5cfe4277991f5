//! Store Adapters - Realtime Document Store Backends
//!
//! Implements the `RemoteStore` port twice:
//! - `RestStore`: hosted realtime database over HTTPS + Server-Sent Events
//! - `MemoryStore`: process-local tree for offline mode and tests

pub mod memory;
pub mod push_id;
pub mod rest;
pub mod sse;
pub mod tree;

pub use memory::MemoryStore;
pub use push_id::PushIdGenerator;
pub use rest::{RestStore, RestStoreConfig};
