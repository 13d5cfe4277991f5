//! Attendance statistics.
//!
//! Pure counting over a day's marks. Unmarked players are not counted as
//! absent; `total` is the roster size passed in, so
//! `present + late + absent <= total` whenever the day only references
//! players on that roster.

use serde::Serialize;

use super::attendance::{AttendanceStatus, DayAttendance};

/// Summary shown on the attendance and history screens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub total: usize,
}

impl AttendanceStats {
    /// Players with any mark.
    pub const fn marked(&self) -> usize {
        self.present + self.late + self.absent
    }

    /// Roster players without a mark. Zero when the day references more
    /// players than `total`.
    pub const fn unmarked(&self) -> usize {
        self.total.saturating_sub(self.marked())
    }
}

/// Count statuses in `day`; `total` is `roster_size`.
pub fn aggregate(day: &DayAttendance, roster_size: usize) -> AttendanceStats {
    day.values().fold(
        AttendanceStats {
            total: roster_size,
            ..AttendanceStats::default()
        },
        |mut stats, status| {
            match status {
                AttendanceStatus::Present => stats.present += 1,
                AttendanceStatus::Late => stats.late += 1,
                AttendanceStatus::Absent => stats.absent += 1,
            }
            stats
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_day() {
        let stats = aggregate(&DayAttendance::new(), 12);
        assert_eq!(
            stats,
            AttendanceStats {
                present: 0,
                late: 0,
                absent: 0,
                total: 12
            }
        );
        assert_eq!(stats.unmarked(), 12);
    }

    #[test]
    fn test_counts_each_status() {
        let day: DayAttendance = [
            ("a", AttendanceStatus::Present),
            ("b", AttendanceStatus::Present),
            ("c", AttendanceStatus::Late),
            ("d", AttendanceStatus::Absent),
        ]
        .into_iter()
        .map(|(id, s)| (id.to_string(), s))
        .collect();

        let stats = aggregate(&day, 6);
        assert_eq!(stats.present, 2);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.absent, 1);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.marked(), 4);
        assert_eq!(stats.unmarked(), 2);
    }

    #[test]
    fn test_unmarked_saturates_for_shrunken_roster() {
        let day: DayAttendance = [("a", AttendanceStatus::Late), ("b", AttendanceStatus::Late)]
            .into_iter()
            .map(|(id, s)| (id.to_string(), s))
            .collect();
        let stats = aggregate(&day, 1);
        assert_eq!(stats.unmarked(), 0);
    }
}
