//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the repositories and use cases
//! require from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `RemoteStore`: realtime document store (reads, writes, live updates)
//! - `AssetStorage`: object storage for uploaded player photos

pub mod assets;
pub mod store;

pub use assets::AssetStorage;
pub use store::{RemoteStore, Revision, StorePath, Subscription, Versioned};
