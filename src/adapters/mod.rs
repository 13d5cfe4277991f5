//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, Server-Sent Event streams,
//! in-process state). Each sub-module groups adapters by infrastructure
//! concern.
//!
//! Adapter categories:
//! - `store`: realtime database over REST + SSE, and an in-memory tree
//! - `assets`: object storage for player photos
//! - `metrics`: Prometheus metrics export and health checks

pub mod assets;
pub mod metrics;
pub mod store;
