//! Practice Session - Marking Attendance for One Day
//!
//! Holds the coach's local draft of a day's marks on top of the live
//! stored marks. Edits stay local until [`PracticeSession::save`].
//!
//! While the draft is unmodified it follows the store, so another
//! device's save shows up immediately. Once the coach starts marking,
//! remote changes no longer replace the draft; `is_stale` reports that
//! the stored day moved on underneath it.

use tracing::{debug, info, instrument};

use super::attendance::{AttendanceRepository, DayWatch};
use crate::domain::{aggregate, AttendanceStats, AttendanceStatus, DateKey, DayAttendance};
use crate::error::Result;

/// Draft of one day's attendance.
pub struct PracticeSession {
  repo: AttendanceRepository,
  watch: DayWatch,
  /// Marks last seen in the store.
  stored: DayAttendance,
  /// Marks as edited locally.
  draft: DayAttendance,
  /// Store changed after the draft diverged from it.
  stale: bool,
}

impl PracticeSession {
  /// Open a session on `date`, starting from the stored marks.
  #[instrument(skip(repo), fields(date = %date))]
  pub async fn open(repo: &AttendanceRepository, date: DateKey) -> Result<Self> {
    let watch = repo.subscribe_day(date).await?;
    let stored = watch.current().clone();
    debug!(marked = stored.len(), "Practice session opened");
    Ok(Self {
      repo: repo.clone(),
      watch,
      draft: stored.clone(),
      stored,
      stale: false,
    })
  }

  /// Session on today's date.
  pub async fn today(repo: &AttendanceRepository) -> Result<Self> {
    Self::open(repo, DateKey::today()).await
  }

  pub const fn date(&self) -> DateKey {
    self.watch.date()
  }

  /// Set a player's status in the draft, replacing any previous mark.
  pub fn mark(&mut self, player_id: impl Into<String>, status: AttendanceStatus) {
    self.draft.insert(player_id.into(), status);
  }

  /// Remove a player's mark from the draft.
  pub fn clear(&mut self, player_id: &str) {
    self.draft.remove(player_id);
  }

  pub fn status_of(&self, player_id: &str) -> Option<AttendanceStatus> {
    self.draft.get(player_id).copied()
  }

  pub const fn draft(&self) -> &DayAttendance {
    &self.draft
  }

  pub const fn stored(&self) -> &DayAttendance {
    &self.stored
  }

  /// Draft differs from the stored marks.
  pub fn is_dirty(&self) -> bool {
    self.draft != self.stored
  }

  /// Stored marks changed while the draft had unsaved edits.
  pub const fn is_stale(&self) -> bool {
    self.stale
  }

  /// Counts over the draft with `total` set to `roster_size`.
  pub fn stats(&self, roster_size: usize) -> AttendanceStats {
    aggregate(&self.draft, roster_size)
  }

  /// Wait for the next store change to this day.
  ///
  /// Returns true if the draft was replaced by the new stored marks,
  /// false if local edits were kept.
  pub async fn refresh(&mut self) -> Result<bool> {
    let was_dirty = self.is_dirty();
    let stored = self.watch.changed().await?.clone();
    if stored == self.stored {
      return Ok(!was_dirty);
    }
    self.stored = stored;
    if was_dirty {
      self.stale = true;
      debug!(date = %self.date(), "Stored attendance changed under local edits");
      return Ok(false);
    }
    self.draft = self.stored.clone();
    Ok(true)
  }

  /// Throw away local edits and return to the stored marks.
  pub fn revert(&mut self) {
    self.draft = self.stored.clone();
    self.stale = false;
  }

  /// Write the draft as the day's marks and record `roster_size` for the
  /// history screen.
  #[instrument(skip(self))]
  pub async fn save(&mut self, roster_size: usize) -> Result<AttendanceStats> {
    let date = self.date();
    self.repo.save_day(date, &self.draft).await?;
    self.repo.record_roster_size(date, roster_size).await?;
    self.stored = self.draft.clone();
    self.stale = false;

    let stats = self.stats(roster_size);
    info!(
      present = stats.present,
      late = stats.late,
      absent = stats.absent,
      total = stats.total,
      "Practice attendance saved"
    );
    Ok(stats)
  }

  /// Write the draft only if the stored day is unchanged since it was
  /// last loaded.
  ///
  /// # Errors
  /// [`crate::error::Error::Conflict`] if someone else saved the day first.
  #[instrument(skip(self))]
  pub async fn save_checked(&mut self, roster_size: usize) -> Result<AttendanceStats> {
    let date = self.date();
    let loaded = self.repo.load_day(date).await?;
    if loaded.attendance != self.stored {
      self.stored = loaded.attendance;
      self.stale = true;
      return Err(crate::error::Error::Conflict {
        date: date.to_string(),
      });
    }
    self
      .repo
      .save_day_checked(date, &self.draft, &loaded.revision)
      .await?;
    self.repo.record_roster_size(date, roster_size).await?;
    self.stored = self.draft.clone();
    self.stale = false;
    Ok(self.stats(roster_size))
  }

  /// Stop listening for changes to this day.
  pub fn close(self) {
    self.watch.unsubscribe();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::adapters::store::MemoryStore;
  use crate::error::Error;

  fn date() -> DateKey {
    "2024-01-01".parse().unwrap()
  }

  #[tokio::test]
  async fn test_mark_and_clear() {
    let repo = AttendanceRepository::new(Arc::new(MemoryStore::new()));
    let mut session = PracticeSession::open(&repo, date()).await.unwrap();

    session.mark("a", AttendanceStatus::Present);
    session.mark("a", AttendanceStatus::Late);
    session.mark("b", AttendanceStatus::Absent);
    session.clear("b");

    assert_eq!(session.status_of("a"), Some(AttendanceStatus::Late));
    assert_eq!(session.status_of("b"), None);
    assert!(session.is_dirty());
    assert_eq!(session.stats(3).late, 1);
  }

  #[tokio::test]
  async fn test_save_writes_draft_and_roster_size() {
    let store = MemoryStore::new();
    let repo = AttendanceRepository::new(Arc::new(store.clone()));
    let mut session = PracticeSession::open(&repo, date()).await.unwrap();

    session.mark("a", AttendanceStatus::Present);
    let stats = session.save(5).await.unwrap();
    assert_eq!(stats.total, 5);
    assert!(!session.is_dirty());

    let snapshot = store.snapshot();
    assert_eq!(snapshot["attendance"]["2024-01-01"]["a"], "present");
    assert_eq!(snapshot["attendanceMeta"]["2024-01-01"]["rosterSize"], 5);
  }

  #[tokio::test]
  async fn test_refresh_follows_store_until_edited() {
    let repo = AttendanceRepository::new(Arc::new(MemoryStore::new()));
    let mut session = PracticeSession::open(&repo, date()).await.unwrap();
    // initial snapshot
    assert!(session.refresh().await.unwrap());

    let mut remote = DayAttendance::new();
    remote.insert("x".to_string(), AttendanceStatus::Late);
    repo.save_day(date(), &remote).await.unwrap();
    assert!(session.refresh().await.unwrap());
    assert_eq!(session.draft(), &remote);

    session.mark("y", AttendanceStatus::Present);
    remote.insert("z".to_string(), AttendanceStatus::Absent);
    repo.save_day(date(), &remote).await.unwrap();
    assert!(!session.refresh().await.unwrap());
    assert!(session.is_stale());
    assert_eq!(session.status_of("y"), Some(AttendanceStatus::Present));
    assert_eq!(session.status_of("z"), None);
  }

  #[tokio::test]
  async fn test_checked_save_conflict() {
    let repo = AttendanceRepository::new(Arc::new(MemoryStore::new()));
    let mut session = PracticeSession::open(&repo, date()).await.unwrap();
    session.mark("a", AttendanceStatus::Present);

    let mut other = DayAttendance::new();
    other.insert("b".to_string(), AttendanceStatus::Absent);
    repo.save_day(date(), &other).await.unwrap();

    let err = session.save_checked(4).await.unwrap_err();
    assert!(matches!(err, Error::Conflict { .. }));
    assert!(session.is_stale());

    session.revert();
    session.mark("a", AttendanceStatus::Present);
    session.save_checked(4).await.unwrap();
  }
}
