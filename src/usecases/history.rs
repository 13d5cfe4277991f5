//! History Report - Past Practice Days
//!
//! Joins saved attendance days with the roster for the history screen:
//! the list of dates, and for one date the counts plus a row per player.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::instrument;

use super::attendance::AttendanceRepository;
use crate::domain::{
  aggregate, status_label, AttendanceHistory, AttendanceStats, AttendanceStatus, DateKey, Player,
  PlayerId,
};
use crate::error::Result;

/// Where a day's `total` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterSizeSource {
  /// Size recorded when the day was saved.
  Recorded,
  /// No size was recorded; the current roster size is used.
  Current,
}

/// One roster player's mark on a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
  pub player: Player,
  pub status: Option<AttendanceStatus>,
}

impl PlayerRow {
  /// "Present", "Late", "Absent" or "Not marked".
  pub const fn label(&self) -> &'static str {
    status_label(self.status)
  }
}

/// Everything the history screen shows for one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
  pub date: DateKey,
  pub stats: AttendanceStats,
  pub roster_size_source: RosterSizeSource,
  /// Every current roster player, in roster order.
  pub rows: Vec<PlayerRow>,
  /// Marks for players no longer on the roster.
  pub orphans: Vec<(PlayerId, AttendanceStatus)>,
}

/// Saved attendance joined with a roster snapshot.
#[derive(Debug, Clone, Default)]
pub struct HistoryReport {
  history: AttendanceHistory,
  roster_sizes: BTreeMap<DateKey, usize>,
  roster: Vec<Player>,
}

impl HistoryReport {
  pub const fn new(
    history: AttendanceHistory,
    roster_sizes: BTreeMap<DateKey, usize>,
    roster: Vec<Player>,
  ) -> Self {
    Self {
      history,
      roster_sizes,
      roster,
    }
  }

  /// Load the full history and the recorded roster sizes.
  #[instrument(skip(repo, roster), fields(players = roster.len()))]
  pub async fn load(repo: &AttendanceRepository, roster: Vec<Player>) -> Result<Self> {
    let history = repo.get_history().await?;
    let roster_sizes = repo.get_roster_sizes().await?;
    Ok(Self::new(history, roster_sizes, roster))
  }

  /// Dates with saved attendance, most recent first.
  pub fn dates(&self) -> Vec<DateKey> {
    self.history.keys().rev().copied().collect()
  }

  pub fn is_empty(&self) -> bool {
    self.history.is_empty()
  }

  /// Report for `date`. A date with nothing saved reports every player as
  /// unmarked.
  pub fn day(&self, date: DateKey) -> DayReport {
    let empty = BTreeMap::new();
    let marks = self.history.get(&date).unwrap_or(&empty);

    let (roster_size, roster_size_source) = self.roster_sizes.get(&date).map_or(
      (self.roster.len(), RosterSizeSource::Current),
      |&size| (size, RosterSizeSource::Recorded),
    );

    let rows = self
      .roster
      .iter()
      .map(|player| PlayerRow {
        player: player.clone(),
        status: marks.get(&player.id).copied(),
      })
      .collect();

    let orphans = marks
      .iter()
      .filter(|(id, _)| !self.roster.iter().any(|p| &p.id == *id))
      .map(|(id, status)| (id.clone(), *status))
      .collect();

    DayReport {
      date,
      stats: aggregate(marks, roster_size),
      roster_size_source,
      rows,
      orphans,
    }
  }

  /// Report for the most recent saved date.
  pub fn latest(&self) -> Option<DayReport> {
    self.history.keys().next_back().map(|&date| self.day(date))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{DayAttendance, PlayerRecord, Position};

  fn player(id: &str, name: &str, number: u8) -> Player {
    Player::from_record(
      id,
      PlayerRecord {
        name: name.to_string(),
        number,
        position: Position::Center,
        photo_url: None,
      },
    )
  }

  fn date(s: &str) -> DateKey {
    s.parse().unwrap()
  }

  fn report() -> HistoryReport {
    let mut history = AttendanceHistory::new();
    let day1: DayAttendance = [
      ("a".to_string(), AttendanceStatus::Present),
      ("gone".to_string(), AttendanceStatus::Late),
    ]
    .into_iter()
    .collect();
    history.insert(date("2024-01-01"), day1);
    history.insert(
      date("2024-01-08"),
      [("b".to_string(), AttendanceStatus::Absent)].into_iter().collect(),
    );

    let mut sizes = BTreeMap::new();
    sizes.insert(date("2024-01-01"), 3);

    HistoryReport::new(
      history,
      sizes,
      vec![player("a", "Alex", 7), player("b", "Blake", 11)],
    )
  }

  #[test]
  fn test_dates_most_recent_first() {
    assert_eq!(
      report().dates(),
      vec![date("2024-01-08"), date("2024-01-01")]
    );
  }

  #[test]
  fn test_day_rows_and_orphans() {
    let day = report().day(date("2024-01-01"));
    assert_eq!(day.stats.present, 1);
    assert_eq!(day.stats.late, 1);
    assert_eq!(day.stats.total, 3);
    assert_eq!(day.roster_size_source, RosterSizeSource::Recorded);

    let labels: Vec<&str> = day.rows.iter().map(PlayerRow::label).collect();
    assert_eq!(labels, vec!["Present", "Not marked"]);
    assert_eq!(
      day.orphans,
      vec![("gone".to_string(), AttendanceStatus::Late)]
    );
  }

  #[test]
  fn test_falls_back_to_current_roster_size() {
    let day = report().day(date("2024-01-08"));
    assert_eq!(day.stats.total, 2);
    assert_eq!(day.roster_size_source, RosterSizeSource::Current);
    assert!(day.orphans.is_empty());
  }

  #[test]
  fn test_unsaved_day_is_all_unmarked() {
    let day = report().day(date("2023-12-25"));
    assert_eq!(day.stats.marked(), 0);
    assert!(day.rows.iter().all(|row| row.status.is_none()));
  }
}
