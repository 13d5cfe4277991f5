//! Attendance domain types.
//!
//! A practice day is keyed by its local calendar date (`YYYY-MM-DD`) and
//! maps player ids to a status. A player with no entry is unmarked; there
//! is no stored "unmarked" value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use crate::error::ValidationError;

/// Attendance mark for one player on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub const ALL: [Self; 3] = [Self::Present, Self::Late, Self::Absent];

    /// Value as stored in the attendance map.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Late => "late",
            Self::Absent => "absent",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Late => "Late",
            Self::Absent => "Absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "late" => Ok(Self::Late),
            "absent" => Ok(Self::Absent),
            other => Err(format!("unknown attendance status {other:?}")),
        }
    }
}

/// Display label for a possibly unmarked player.
pub const fn status_label(status: Option<AttendanceStatus>) -> &'static str {
    match status {
        Some(status) => status.label(),
        None => "Not marked",
    }
}

/// One day's marks, player id → status.
pub type DayAttendance = BTreeMap<PlayerId, AttendanceStatus>;

/// Every saved day, ordered by date.
pub type AttendanceHistory = BTreeMap<DateKey, DayAttendance>;

/// A local calendar day used as the attendance key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    const FORMAT: &'static str = "%Y-%m-%d";

    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today on the local calendar.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub const fn date(self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // chrono accepts unpadded fields; keys must be exactly YYYY-MM-DD
        if s.len() != 10 {
            return Err(ValidationError::InvalidDate(s.to_string()));
        }
        NaiveDate::parse_from_str(s, Self::FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_key_round_trip() {
        let key: DateKey = "2024-01-01".parse().unwrap();
        assert_eq!(key.to_string(), "2024-01-01");
        assert_eq!(key.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_date_key_rejects_other_formats() {
        assert!("2024-1-1".parse::<DateKey>().is_err());
        assert!("01/01/2024".parse::<DateKey>().is_err());
        assert!("2024-02-30".parse::<DateKey>().is_err());
        assert!("".parse::<DateKey>().is_err());
    }

    #[test]
    fn test_date_keys_order_chronologically() {
        let a: DateKey = "2023-12-31".parse().unwrap();
        let b: DateKey = "2024-01-01".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_status_wire_format() {
        let mut day = DayAttendance::new();
        day.insert("p1".to_string(), AttendanceStatus::Present);
        day.insert("p2".to_string(), AttendanceStatus::Late);
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json, serde_json::json!({"p1": "present", "p2": "late"}));
        assert_eq!("absent".parse::<AttendanceStatus>(), Ok(AttendanceStatus::Absent));
        assert!("excused".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(Some(AttendanceStatus::Late)), "Late");
        assert_eq!(status_label(None), "Not marked");
    }
}
