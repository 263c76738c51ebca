use super::common::*;
use crate::reservations::bulk::{weekend_dates, BulkError, DayPatch};
use crate::reservations::domain::{DayStatus, StayRange};

#[test]
fn apply_range_patches_unprotected_days() {
    let fixture = calendar_fixture();
    let outcome = fixture
        .bulk
        .apply_range(
            &listing(),
            date(2026, 3, 10),
            date(2026, 3, 13),
            &DayPatch {
                price_modifier: Some(1.3),
                min_stay_nights: Some(2),
                notes: Some("spring festival".to_string()),
                ..DayPatch::default()
            },
        )
        .expect("patch applies");
    assert_eq!(outcome.updated, 3);
    assert!(outcome.skipped_booked.is_empty());
    assert!(outcome.skipped_reserved.is_empty());

    let days = fixture
        .calendar
        .get_range(&listing(), date(2026, 3, 10), date(2026, 3, 13))
        .expect("range reads");
    assert!(days.iter().all(|day| day.price_modifier == 1.3));
    assert!(days.iter().all(|day| day.min_stay_nights == 2));
    assert!(days
        .iter()
        .all(|day| day.notes.as_deref() == Some("spring festival")));
}

#[test]
fn booked_and_held_days_are_protected() {
    let fixture = calendar_fixture();
    let guest = holder("guest-a");
    let hold = fixture
        .holds
        .reserve(&listing(), date(2026, 3, 11), date(2026, 3, 12), &guest, None)
        .expect("hold claims");
    fixture
        .holds
        .confirm(
            hold.id,
            &guest,
            crate::reservations::domain::BookingId::generate(),
        )
        .expect("confirm books the day");
    fixture
        .holds
        .reserve(&listing(), date(2026, 3, 12), date(2026, 3, 13), &holder("guest-b"), None)
        .expect("second hold claims");

    let outcome = fixture
        .bulk
        .apply_range(
            &listing(),
            date(2026, 3, 10),
            date(2026, 3, 14),
            &DayPatch {
                status: Some(DayStatus::Blocked),
                ..DayPatch::default()
            },
        )
        .expect("patch applies");

    assert_eq!(outcome.updated, 2);
    assert_eq!(outcome.skipped_booked, vec![date(2026, 3, 11)]);
    assert_eq!(outcome.skipped_reserved, vec![date(2026, 3, 12)]);

    let days = fixture
        .calendar
        .get_range(&listing(), date(2026, 3, 10), date(2026, 3, 14))
        .expect("range reads");
    assert_eq!(days[0].status, DayStatus::Blocked);
    assert_eq!(days[1].status, DayStatus::Booked);
    assert_eq!(days[2].status, DayStatus::Reserved);
    assert_eq!(days[3].status, DayStatus::Blocked);
}

#[test]
fn lapsed_holds_no_longer_protect_their_days() {
    let fixture = calendar_fixture();
    fixture
        .holds
        .reserve(&listing(), date(2026, 3, 11), date(2026, 3, 12), &holder("guest-a"), Some(15))
        .expect("hold claims");
    fixture.clock.advance(chrono::Duration::minutes(16));

    let outcome = fixture
        .bulk
        .apply_range(
            &listing(),
            date(2026, 3, 11),
            date(2026, 3, 12),
            &DayPatch {
                status: Some(DayStatus::Maintenance),
                ..DayPatch::default()
            },
        )
        .expect("patch applies");
    assert_eq!(outcome.updated, 1);
    assert!(outcome.skipped_reserved.is_empty());
}

#[test]
fn apply_dates_patches_a_sparse_unordered_list() {
    let fixture = calendar_fixture();
    let picked = [date(2026, 3, 10), date(2026, 3, 12), date(2026, 3, 15)];
    let outcome = fixture
        .bulk
        .apply_dates(
            &listing(),
            vec![date(2026, 3, 15), date(2026, 3, 10), date(2026, 3, 12), date(2026, 3, 12)],
            &DayPatch {
                status: Some(DayStatus::Maintenance),
                ..DayPatch::default()
            },
        )
        .expect("patch applies");
    assert_eq!(outcome.updated, 3);

    let days = fixture
        .calendar
        .get_range(&listing(), date(2026, 3, 10), date(2026, 3, 16))
        .expect("range reads");
    for day in &days {
        let expected = if picked.contains(&day.date) {
            DayStatus::Maintenance
        } else {
            DayStatus::Available
        };
        assert_eq!(day.status, expected, "unexpected status on {}", day.date);
    }
}

#[test]
fn reserved_is_not_a_settable_status() {
    let fixture = calendar_fixture();
    assert!(matches!(
        fixture.bulk.apply_range(
            &listing(),
            date(2026, 3, 10),
            date(2026, 3, 12),
            &DayPatch {
                status: Some(DayStatus::Reserved),
                ..DayPatch::default()
            },
        ),
        Err(BulkError::ReservedNotSettable)
    ));
}

#[test]
fn invalid_modifiers_are_rejected() {
    let fixture = calendar_fixture();
    assert!(matches!(
        fixture.bulk.apply_range(
            &listing(),
            date(2026, 3, 10),
            date(2026, 3, 12),
            &DayPatch {
                price_modifier: Some(-0.5),
                ..DayPatch::default()
            },
        ),
        Err(BulkError::InvalidModifier(_))
    ));
}

#[test]
fn weekend_dates_selects_friday_and_saturday_nights() {
    // 2026-03-02 is a Monday; the window covers one Friday and one Saturday
    let range = StayRange::new(date(2026, 3, 2), date(2026, 3, 9)).expect("valid range");
    assert_eq!(
        weekend_dates(range),
        vec![date(2026, 3, 6), date(2026, 3, 7)]
    );
}

#[test]
fn block_weekends_touches_only_weekend_nights() {
    let fixture = calendar_fixture();
    let outcome = fixture
        .bulk
        .block_weekends(&listing(), date(2026, 3, 2), date(2026, 3, 9))
        .expect("quick action runs");
    assert_eq!(outcome.updated, 2);

    let days = fixture
        .calendar
        .get_range(&listing(), date(2026, 3, 2), date(2026, 3, 9))
        .expect("range reads");
    for day in &days {
        let expected = if day.date == date(2026, 3, 6) || day.date == date(2026, 3, 7) {
            DayStatus::Blocked
        } else {
            DayStatus::Available
        };
        assert_eq!(day.status, expected, "unexpected status on {}", day.date);
    }
}

#[test]
fn unblock_reopens_blocked_and_maintenance_days_only() {
    let fixture = calendar_fixture();
    fixture
        .bulk
        .apply_range(
            &listing(),
            date(2026, 3, 10),
            date(2026, 3, 11),
            &DayPatch {
                status: Some(DayStatus::Blocked),
                ..DayPatch::default()
            },
        )
        .expect("block applies");
    fixture
        .bulk
        .apply_range(
            &listing(),
            date(2026, 3, 11),
            date(2026, 3, 12),
            &DayPatch {
                status: Some(DayStatus::Maintenance),
                price_modifier: Some(1.4),
                ..DayPatch::default()
            },
        )
        .expect("maintenance applies");

    let outcome = fixture
        .bulk
        .unblock(&listing(), date(2026, 3, 10), date(2026, 3, 13))
        .expect("unblock runs");
    assert_eq!(outcome.updated, 3);

    let days = fixture
        .calendar
        .get_range(&listing(), date(2026, 3, 10), date(2026, 3, 13))
        .expect("range reads");
    assert!(days.iter().all(|day| day.status == DayStatus::Available));
    // unblock leaves pricing untouched
    assert_eq!(days[1].price_modifier, 1.4);
}

#[test]
fn boost_pricing_multiplies_and_caps_modifiers() {
    let fixture = calendar_fixture();
    fixture
        .bulk
        .apply_range(
            &listing(),
            date(2026, 3, 11),
            date(2026, 3, 12),
            &DayPatch {
                price_modifier: Some(1.8),
                ..DayPatch::default()
            },
        )
        .expect("modifier applies");

    let outcome = fixture
        .bulk
        .boost_pricing(&listing(), date(2026, 3, 10), date(2026, 3, 12), 1.5, 2.0)
        .expect("boost runs");
    assert_eq!(outcome.updated, 2);

    let days = fixture
        .calendar
        .get_range(&listing(), date(2026, 3, 10), date(2026, 3, 12))
        .expect("range reads");
    assert!((days[0].price_modifier - 1.5).abs() < 1e-9);
    assert!((days[1].price_modifier - 2.0).abs() < 1e-9, "boost must cap at 2.0");
}
