//! Property-Based Tests - Domain Layer Invariants
//!
//! Uses `proptest` to verify that validation and aggregation hold their
//! invariants across random inputs.

use std::collections::BTreeSet;

use proptest::prelude::*;

use hoopslab_roster::adapters::store::PushIdGenerator;
use hoopslab_roster::domain::{
    AttendanceStatus, DayAttendance, PlayerDraft, Position, aggregate,
};
use hoopslab_roster::error::ValidationError;
use hoopslab_roster::ports::StorePath;

fn position() -> impl Strategy<Value = Position> {
    prop::sample::select(Position::ALL.to_vec())
}

fn status() -> impl Strategy<Value = AttendanceStatus> {
    prop::sample::select(AttendanceStatus::ALL.to_vec())
}

// ── Player Validation Properties ────────────────────────────

proptest! {
    /// Every valid draft normalizes to the trimmed name, the integer
    /// number and the chosen position.
    #[test]
    fn valid_draft_normalizes(
        name in "[A-Za-z][A-Za-z '-]{0,20}",
        pad in " {0,3}",
        number in 0u8..=99,
        position in position(),
    ) {
        let draft = PlayerDraft::new(
            format!("{pad}{name}{pad}"),
            format!("{pad}{number}"),
            position.label().to_uppercase(),
        );
        let record = draft.validate().unwrap();
        prop_assert_eq!(record.name, name.trim().to_string());
        prop_assert_eq!(record.number, number);
        prop_assert_eq!(record.position, position);
    }

    /// Numbers outside 0..=99 are always rejected as out of range.
    #[test]
    fn out_of_range_number_rejected(
        number in prop_oneof![i64::MIN / 2..0i64, 100i64..i64::MAX / 2],
        position in position(),
    ) {
        let err = PlayerDraft::new("Sam", number, position.label())
            .validate()
            .unwrap_err();
        prop_assert_eq!(err, ValidationError::NumberOutOfRange(number));
    }

    /// Decimal numbers keep only their integer part.
    #[test]
    fn decimal_number_truncated(
        number in 0u8..=99,
        fraction in 0u16..1000,
        position in position(),
    ) {
        let record = PlayerDraft::new("Sam", format!("{number}.{fraction:03}"), position.label())
            .validate()
            .unwrap();
        prop_assert_eq!(record.number, number);
    }

    /// Non-numeric numbers are rejected, never coerced.
    #[test]
    fn non_numeric_number_rejected(raw in "[a-z]{1,6}") {
        let err = PlayerDraft::new("Sam", &raw, "Center").validate().unwrap_err();
        prop_assert_eq!(err, ValidationError::InvalidNumber(raw));
    }

    /// A blank name is reported before anything else.
    #[test]
    fn blank_name_reported_first(
        blank in " {0,4}",
        number in ".{0,4}",
        position in ".{0,8}",
    ) {
        let err = PlayerDraft::new(blank, number, position).validate().unwrap_err();
        prop_assert_eq!(err, ValidationError::MissingName);
    }
}

// ── Aggregation Properties ──────────────────────────────────

proptest! {
    /// Marked players never exceed the roster when the day only
    /// references roster players.
    #[test]
    fn marked_never_exceeds_roster(
        marks in prop::collection::vec(prop::option::of(status()), 0..40),
    ) {
        let roster_size = marks.len();
        let day: DayAttendance = marks
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|s| (format!("p{i}"), s)))
            .collect();

        let stats = aggregate(&day, roster_size);
        prop_assert!(stats.present + stats.late + stats.absent <= roster_size);
        prop_assert_eq!(stats.marked(), day.len());
        prop_assert_eq!(stats.total, roster_size);
        prop_assert_eq!(stats.unmarked(), roster_size - day.len());
    }

    /// An empty day counts nothing.
    #[test]
    fn empty_day_counts_nothing(n in 0usize..10_000) {
        let stats = aggregate(&DayAttendance::new(), n);
        prop_assert_eq!((stats.present, stats.late, stats.absent, stats.total), (0, 0, 0, n));
    }

    /// Each status count equals the number of entries with that status.
    #[test]
    fn counts_match_entries(
        day in prop::collection::btree_map("[a-z]{1,8}", status(), 0..50),
    ) {
        let stats = aggregate(&day, 0);
        let count = |wanted| day.values().filter(|s| **s == wanted).count();
        prop_assert_eq!(stats.present, count(AttendanceStatus::Present));
        prop_assert_eq!(stats.late, count(AttendanceStatus::Late));
        prop_assert_eq!(stats.absent, count(AttendanceStatus::Absent));
    }
}

// ── Store Key Properties ────────────────────────────────────

proptest! {
    /// Push ids are valid keys, unique, and sort in creation order.
    #[test]
    fn push_ids_sort_in_creation_order(
        start in 0u64..4_000_000_000_000,
        steps in prop::collection::vec(0u64..3, 1..50),
    ) {
        let ids = PushIdGenerator::new();
        let mut now = start;
        let mut generated = Vec::new();
        for step in steps {
            now += step;
            generated.push(ids.next_id_at(now));
        }

        let unique: BTreeSet<_> = generated.iter().collect();
        prop_assert_eq!(unique.len(), generated.len());
        let mut sorted = generated.clone();
        sorted.sort();
        prop_assert_eq!(&sorted, &generated);
        for id in &generated {
            prop_assert_eq!(id.len(), 20);
            prop_assert!(StorePath::root().child(id).is_ok());
        }
    }
}
