//! Attendance Repository - Per-day Marks
//!
//! Reads and writes `attendance/{date}` and the roster size recorded
//! next to each saved day under `attendanceMeta/{date}`.
//!
//! Key design decisions:
//! - A save replaces the whole day; an unmarked player is simply absent
//!   from the saved map
//! - `save_day_checked` refuses to overwrite a day someone else changed
//!   since it was loaded
//! - Unknown status strings are dropped on read with a warning

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use super::paths;
use crate::domain::{AttendanceHistory, AttendanceStatus, DateKey, DayAttendance};
use crate::error::{Error, Result, StoreError};
use crate::ports::store::{RemoteStore, Revision, Subscription};

/// Attendance access over the store port.
#[derive(Clone)]
pub struct AttendanceRepository {
  store: Arc<dyn RemoteStore>,
}

/// A day's marks together with the revision they were read at.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDay {
  pub date: DateKey,
  pub attendance: DayAttendance,
  pub revision: Revision,
}

impl AttendanceRepository {
  pub fn new(store: Arc<dyn RemoteStore>) -> Self {
    Self { store }
  }

  /// Listen to one day's marks. The current marks are available as soon
  /// as this returns.
  #[instrument(skip(self), fields(date = %date))]
  pub async fn subscribe_day(&self, date: DateKey) -> Result<DayWatch> {
    let subscription = self
      .store
      .subscribe(&paths::attendance_day(date))
      .await
      .map_err(|e| Error::store("Failed to load attendance", e))?;
    let current = decode_day(subscription.current(), date)
      .map_err(|e| Error::store("Failed to load attendance", e))?;
    debug!(marked = current.len(), "Attendance listener attached");
    Ok(DayWatch {
      date,
      subscription,
      current,
    })
  }

  /// Listen to today's marks on the local calendar.
  pub async fn today(&self) -> Result<DayWatch> {
    self.subscribe_day(DateKey::today()).await
  }

  /// Replace the marks stored for `date`. Last writer wins.
  #[instrument(skip(self, day), fields(date = %date, marked = day.len()))]
  pub async fn save_day(&self, date: DateKey, day: &DayAttendance) -> Result<()> {
    self
      .store
      .write(&paths::attendance_day(date), &encode_day(day))
      .await
      .map_err(|e| Error::store("Failed to save attendance", e))?;
    info!("Attendance saved");
    Ok(())
  }

  /// Read one day's marks with the revision needed by
  /// [`AttendanceRepository::save_day_checked`].
  #[instrument(skip(self), fields(date = %date))]
  pub async fn load_day(&self, date: DateKey) -> Result<LoadedDay> {
    let versioned = self
      .store
      .read_versioned(&paths::attendance_day(date))
      .await
      .map_err(|e| Error::store("Failed to load attendance", e))?;
    let attendance = decode_day(versioned.value, date)
      .map_err(|e| Error::store("Failed to load attendance", e))?;
    Ok(LoadedDay {
      date,
      attendance,
      revision: versioned.revision,
    })
  }

  /// Replace the marks for `date` only if nobody changed them since
  /// `revision` was read.
  ///
  /// # Errors
  /// [`Error::Conflict`] if the stored day moved on; reload and retry.
  #[instrument(skip(self, day, revision), fields(date = %date, marked = day.len()))]
  pub async fn save_day_checked(
    &self,
    date: DateKey,
    day: &DayAttendance,
    revision: &Revision,
  ) -> Result<Revision> {
    match self
      .store
      .write_if(&paths::attendance_day(date), &encode_day(day), revision)
      .await
    {
      Ok(next) => {
        info!("Attendance saved");
        Ok(next)
      }
      Err(StoreError::PreconditionFailed(_)) => {
        warn!("Attendance changed since it was loaded");
        Err(Error::Conflict {
          date: date.to_string(),
        })
      }
      Err(e) => Err(Error::store("Failed to save attendance", e)),
    }
  }

  /// Every saved day, oldest first.
  ///
  /// Keys that are not dates and days that do not decode are skipped.
  #[instrument(skip(self))]
  pub async fn get_history(&self) -> Result<AttendanceHistory> {
    let value = self
      .store
      .read_once(&paths::attendance())
      .await
      .map_err(|e| Error::store("Failed to load attendance history", e))?;
    let days = decode_children(value, paths::ATTENDANCE)
      .map_err(|e| Error::store("Failed to load attendance history", e))?;

    let mut history = AttendanceHistory::new();
    for (key, raw) in days {
      let Ok(date) = key.parse::<DateKey>() else {
        warn!(key = %key, "Skipping attendance entry with a non-date key");
        continue;
      };
      match decode_day(Some(raw), date) {
        Ok(day) => {
          history.insert(date, day);
        }
        Err(e) => warn!(date = %date, error = %e, "Skipping malformed attendance day"),
      }
    }
    debug!(days = history.len(), "Attendance history loaded");
    Ok(history)
  }

  /// Remember how many players were on the roster when `date` was saved.
  #[instrument(skip(self), fields(date = %date))]
  pub async fn record_roster_size(&self, date: DateKey, roster_size: usize) -> Result<()> {
    self
      .store
      .write(&paths::roster_size(date), &Value::from(roster_size))
      .await
      .map_err(|e| Error::store("Failed to save attendance", e))
  }

  /// Recorded roster sizes by date. Days saved without one are missing.
  #[instrument(skip(self))]
  pub async fn get_roster_sizes(&self) -> Result<BTreeMap<DateKey, usize>> {
    let value = self
      .store
      .read_once(&paths::attendance_meta())
      .await
      .map_err(|e| Error::store("Failed to load attendance history", e))?;
    let entries = decode_children(value, paths::ATTENDANCE_META)
      .map_err(|e| Error::store("Failed to load attendance history", e))?;

    Ok(
      entries
        .into_iter()
        .filter_map(|(key, meta)| {
          let date = key.parse::<DateKey>().ok()?;
          let size = meta.get(paths::ROSTER_SIZE)?.as_u64()?;
          Some((date, usize::try_from(size).ok()?))
        })
        .collect(),
    )
  }
}

/// Live view of one day's marks.
///
/// Detaches its store listener when dropped or on
/// [`DayWatch::unsubscribe`].
#[derive(Debug)]
pub struct DayWatch {
  date: DateKey,
  subscription: Subscription,
  current: DayAttendance,
}

impl DayWatch {
  pub const fn date(&self) -> DateKey {
    self.date
  }

  /// Marks as of the last notification.
  pub const fn current(&self) -> &DayAttendance {
    &self.current
  }

  /// Wait for the stored marks to change and return them.
  ///
  /// The first call returns the marks present when the watch was opened.
  /// A snapshot that does not decode is logged and skipped.
  pub async fn changed(&mut self) -> Result<&DayAttendance> {
    loop {
      let value = self
        .subscription
        .changed()
        .await
        .map_err(|e| Error::store("Attendance listener stopped", e))?;
      match decode_day(value, self.date) {
        Ok(day) => {
          self.current = day;
          return Ok(&self.current);
        }
        Err(e) => warn!(date = %self.date, error = %e, "Ignoring malformed attendance snapshot"),
      }
    }
  }

  /// Stop listening.
  pub fn unsubscribe(self) {
    self.subscription.unsubscribe();
  }
}

fn encode_day(day: &DayAttendance) -> Value {
  Value::Object(
    day
      .iter()
      .map(|(id, status)| (id.clone(), Value::from(status.as_str())))
      .collect(),
  )
}

fn decode_children(value: Option<Value>, path: &str) -> std::result::Result<Map<String, Value>, StoreError> {
  value.map_or_else(
    || Ok(Map::new()),
    |value| {
      serde_json::from_value(value).map_err(|source| StoreError::Decode {
        path: path.to_string(),
        source,
      })
    },
  )
}

/// Decode a day's `{playerId: status}` map. Unknown statuses are skipped.
pub fn decode_day(value: Option<Value>, date: DateKey) -> std::result::Result<DayAttendance, StoreError> {
  let entries = decode_children(value, &paths::attendance_day(date).to_string())?;
  Ok(
    entries
      .into_iter()
      .filter_map(|(id, raw)| {
        match raw.as_str().map(str::parse::<AttendanceStatus>) {
          Some(Ok(status)) => Some((id, status)),
          _ => {
            warn!(date = %date, player = %id, value = %raw, "Skipping unknown attendance status");
            None
          }
        }
      })
      .collect(),
  )
}
