//! Domain layer - roster and attendance models.
//!
//! Pure types and rules: validation of player input, attendance marks,
//! date keys and statistics. Nothing here performs I/O.

pub mod attendance;
pub mod player;
pub mod stats;

// Re-export core types for convenience
pub use attendance::{
    AttendanceHistory, AttendanceStatus, DateKey, DayAttendance, status_label,
};
pub use player::{Player, PlayerDraft, PlayerId, PlayerRecord, PlayerUpdate, Position};
pub use stats::{AttendanceStats, aggregate};
