//! Hoops Lab Roster - Library Root
//!
//! Roster and practice attendance sync for a basketball team on top of a
//! realtime document store. Re-exports all modules for the daemon,
//! integration tests and benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod usecases;

pub use error::{Error, Result};
