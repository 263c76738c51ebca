use super::common::*;
use crate::reservations::booking::{BookingError, ChargeOutcome};
use crate::reservations::bulk::DayPatch;
use crate::reservations::domain::{BookingId, BookingStatus, DayStatus, ListingId, PaymentMethod};

#[test]
fn card_flow_locks_price_and_confirms_on_approval() {
    let fixture = booking_fixture();
    fixture
        .calendar
        .bulk
        .apply_range(
            &listing(),
            date(2026, 3, 11),
            date(2026, 3, 12),
            &DayPatch {
                price_modifier: Some(1.2),
                ..DayPatch::default()
            },
        )
        .expect("modifier applies");

    let guest = holder("session-1");
    let hold = fixture
        .calendar
        .holds
        .reserve(&listing(), date(2026, 3, 10), date(2026, 3, 13), &guest, None)
        .expect("hold claims");

    let booking = fixture
        .service
        .create_booking(card_request(date(2026, 3, 10), date(2026, 3, 13), &hold))
        .expect("booking creates");
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total_nights, 3);
    // 10000 + 12000 + 10000
    assert_eq!(booking.total_amount_cents, 32_000);

    let settled = fixture
        .service
        .process_payment(booking.id, &payment_details())
        .expect("payment settles");
    assert_eq!(settled.status, BookingStatus::Confirmed);
    assert_eq!(fixture.payments.charges(), vec![32_000]);
    assert_eq!(fixture.notifier.confirmations(), vec![booking.id]);

    let days = fixture
        .calendar
        .calendar
        .get_range(&listing(), date(2026, 3, 10), date(2026, 3, 13))
        .expect("range reads");
    assert!(days.iter().all(|day| day.status == DayStatus::Booked));
    assert!(days.iter().all(|day| day.booking_id == Some(booking.id)));
}

#[test]
fn card_flow_requires_a_hold() {
    let fixture = booking_fixture();
    let mut request = cash_request(date(2026, 3, 10), date(2026, 3, 12));
    request.payment_method = PaymentMethod::Card;
    assert!(matches!(
        fixture.service.create_booking(request),
        Err(BookingError::MissingHold)
    ));
}

#[test]
fn declined_payment_cancels_and_frees_the_days() {
    let fixture = booking_fixture();
    fixture.payments.push(ChargeOutcome::Declined {
        reason: "insufficient funds".to_string(),
    });

    let guest = holder("session-1");
    let hold = fixture
        .calendar
        .holds
        .reserve(&listing(), date(2026, 3, 10), date(2026, 3, 12), &guest, None)
        .expect("hold claims");
    let booking = fixture
        .service
        .create_booking(card_request(date(2026, 3, 10), date(2026, 3, 12), &hold))
        .expect("booking creates");

    match fixture.service.process_payment(booking.id, &payment_details()) {
        Err(BookingError::PaymentDeclined { reason }) => {
            assert_eq!(reason, "insufficient funds");
        }
        other => panic!("expected declined payment, got {other:?}"),
    }

    let stored = fixture.service.get(booking.id).expect("booking fetches");
    assert_eq!(stored.status, BookingStatus::Cancelled);
    fixture
        .calendar
        .holds
        .reserve(&listing(), date(2026, 3, 10), date(2026, 3, 12), &holder("session-2"), None)
        .expect("declined booking released its days");
}

#[test]
fn expired_hold_at_settlement_cancels_the_booking() {
    let fixture = booking_fixture();
    let guest = holder("session-1");
    let hold = fixture
        .calendar
        .holds
        .reserve(&listing(), date(2026, 3, 10), date(2026, 3, 12), &guest, Some(15))
        .expect("hold claims");
    let booking = fixture
        .service
        .create_booking(card_request(date(2026, 3, 10), date(2026, 3, 12), &hold))
        .expect("booking creates");

    fixture.calendar.clock.advance(chrono::Duration::minutes(20));

    assert!(matches!(
        fixture.service.process_payment(booking.id, &payment_details()),
        Err(BookingError::HoldExpired)
    ));
    let stored = fixture.service.get(booking.id).expect("booking fetches");
    assert_eq!(stored.status, BookingStatus::Cancelled);
}

#[test]
fn cash_flow_books_immediately_without_a_hold() {
    let fixture = booking_fixture();
    let booking = fixture
        .service
        .create_booking(cash_request(date(2026, 3, 10), date(2026, 3, 12)))
        .expect("cash booking creates");
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.total_amount_cents, 20_000);
    assert_eq!(fixture.notifier.confirmations(), vec![booking.id]);

    let days = fixture
        .calendar
        .calendar
        .get_range(&listing(), date(2026, 3, 10), date(2026, 3, 12))
        .expect("range reads");
    assert!(days.iter().all(|day| day.status == DayStatus::Booked));
}

#[test]
fn conflicting_cash_booking_stores_no_record() {
    let fixture = booking_fixture();
    fixture
        .calendar
        .holds
        .reserve(&listing(), date(2026, 3, 11), date(2026, 3, 13), &holder("session-1"), None)
        .expect("hold claims");

    let before = fixture.repository.insert_count();
    match fixture
        .service
        .create_booking(cash_request(date(2026, 3, 10), date(2026, 3, 14)))
    {
        Err(BookingError::Conflict { date: conflict }) => {
            assert_eq!(conflict, date(2026, 3, 11));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(fixture.repository.insert_count(), before);
}

#[test]
fn min_stay_rules_block_short_bookings() {
    let fixture = booking_fixture();
    fixture
        .calendar
        .bulk
        .apply_range(
            &listing(),
            date(2026, 3, 10),
            date(2026, 3, 11),
            &DayPatch {
                min_stay_nights: Some(3),
                ..DayPatch::default()
            },
        )
        .expect("min stay applies");

    assert!(matches!(
        fixture
            .service
            .create_booking(cash_request(date(2026, 3, 10), date(2026, 3, 12))),
        Err(BookingError::MinStay(_))
    ));
}

#[test]
fn guest_limit_and_unknown_listing_are_rejected() {
    let fixture = booking_fixture();
    let mut oversized = cash_request(date(2026, 3, 10), date(2026, 3, 12));
    oversized.guests = MAX_GUESTS + 1;
    assert!(matches!(
        fixture.service.create_booking(oversized),
        Err(BookingError::TooManyGuests { requested: 5, max: 4 })
    ));

    let mut unknown = cash_request(date(2026, 3, 10), date(2026, 3, 12));
    unknown.listing_id = ListingId("no-such-listing".to_string());
    assert!(matches!(
        fixture.service.create_booking(unknown),
        Err(BookingError::UnknownListing(_))
    ));
}

#[test]
fn cancelling_a_confirmed_booking_reopens_the_days() {
    let fixture = booking_fixture();
    let booking = fixture
        .service
        .create_booking(cash_request(date(2026, 3, 10), date(2026, 3, 12)))
        .expect("cash booking creates");

    let cancelled = fixture.service.cancel(booking.id).expect("cancel runs");
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let days = fixture
        .calendar
        .calendar
        .get_range(&listing(), date(2026, 3, 10), date(2026, 3, 12))
        .expect("range reads");
    assert!(days.iter().all(|day| day.status == DayStatus::Available));
}

#[test]
fn lifecycle_transitions_are_enforced() {
    let fixture = booking_fixture();
    let booking = fixture
        .service
        .create_booking(cash_request(date(2026, 3, 10), date(2026, 3, 12)))
        .expect("cash booking creates");

    let completed = fixture.service.complete(booking.id).expect("complete runs");
    assert_eq!(completed.status, BookingStatus::Completed);

    assert!(matches!(
        fixture.service.cancel(booking.id),
        Err(BookingError::InvalidTransition {
            from: "completed",
            to: "cancelled",
        })
    ));
    assert!(matches!(
        fixture.service.complete(booking.id),
        Err(BookingError::InvalidTransition { .. })
    ));
}

#[test]
fn notification_failures_do_not_affect_the_booking() {
    let fixture = booking_fixture();
    fixture.notifier.fail_next_sends();

    let booking = fixture
        .service
        .create_booking(cash_request(date(2026, 3, 10), date(2026, 3, 12)))
        .expect("cash booking creates");
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert!(fixture.notifier.confirmations().is_empty());

    let stored = fixture.service.get(booking.id).expect("booking fetches");
    assert_eq!(stored.status, BookingStatus::Confirmed);
}

#[test]
fn missing_bookings_report_not_found() {
    let fixture = booking_fixture();
    assert!(matches!(
        fixture.service.get(BookingId::generate()),
        Err(BookingError::NotFound(_))
    ));
}

#[test]
fn quote_prices_the_window_without_claiming_it() {
    let fixture = booking_fixture();
    fixture
        .calendar
        .bulk
        .apply_range(
            &listing(),
            date(2026, 3, 11),
            date(2026, 3, 12),
            &DayPatch {
                price_modifier: Some(0.9),
                ..DayPatch::default()
            },
        )
        .expect("modifier applies");

    let quote = fixture
        .service
        .quote(&listing(), date(2026, 3, 10), date(2026, 3, 13))
        .expect("quote computes");
    assert_eq!(quote.nights, 3);
    assert_eq!(quote.total_cents, 29_000);
    assert_eq!(quote.nightly.len(), 3);
    assert_eq!(quote.nightly[1].price_cents, 9_000);

    let days = fixture
        .calendar
        .calendar
        .get_range(&listing(), date(2026, 3, 10), date(2026, 3, 13))
        .expect("range reads");
    assert!(days.iter().all(|day| day.status == DayStatus::Available));
}
