//! Store layout.
//!
//! - `players/{id}` → player record
//! - `attendance/{date}` → `{playerId: status}`
//! - `attendanceMeta/{date}/rosterSize` → roster size when the day was saved

use crate::domain::DateKey;
use crate::error::ValidationError;
use crate::ports::store::StorePath;

pub const PLAYERS: &str = "players";
pub const ATTENDANCE: &str = "attendance";
pub const ATTENDANCE_META: &str = "attendanceMeta";
pub const ROSTER_SIZE: &str = "rosterSize";

pub fn players() -> StorePath {
  StorePath::trusted(PLAYERS)
}

/// Path of one player. Fails for ids that are not valid keys.
pub fn player(id: &str) -> Result<StorePath, ValidationError> {
  players().child(id)
}

pub fn attendance() -> StorePath {
  StorePath::trusted(ATTENDANCE)
}

pub fn attendance_day(date: DateKey) -> StorePath {
  StorePath::trusted(format!("{ATTENDANCE}/{date}"))
}

pub fn attendance_meta() -> StorePath {
  StorePath::trusted(ATTENDANCE_META)
}

pub fn roster_size(date: DateKey) -> StorePath {
  StorePath::trusted(format!("{ATTENDANCE_META}/{date}/{ROSTER_SIZE}"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_layout() {
    let date: DateKey = "2024-01-01".parse().unwrap();
    assert_eq!(players().as_str(), "players");
    assert_eq!(player("abc").unwrap().as_str(), "players/abc");
    assert!(player("a/b").is_err());
    assert_eq!(attendance_day(date).as_str(), "attendance/2024-01-01");
    assert_eq!(roster_size(date).as_str(), "attendanceMeta/2024-01-01/rosterSize");
  }
}
