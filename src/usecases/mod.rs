//! Use Cases Layer - Roster and Attendance Workflows
//!
//! Orchestrates domain rules with the store and asset ports to implement
//! the screens' behaviour. Each use case owns the listeners it opens.
//!
//! Use cases:
//! - `RosterRepository`: live player list plus add / edit / delete
//! - `AttendanceRepository`: per-day marks, history, conflict-checked saves
//! - `PracticeSession`: local draft of one day's marks
//! - `HistoryReport`: past days joined with the roster
//! - `ImageUploader`: player photo uploads

pub mod attendance;
pub mod history;
pub mod paths;
pub mod roster;
pub mod session;
pub mod uploader;

pub use attendance::{AttendanceRepository, DayWatch, LoadedDay};
pub use history::{DayReport, HistoryReport, PlayerRow, RosterSizeSource};
pub use roster::RosterRepository;
pub use session::PracticeSession;
pub use uploader::ImageUploader;
