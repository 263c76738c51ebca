use super::common::*;
use crate::reservations::domain::AvailabilityDay;
use crate::reservations::pricing::{
    check_min_stay, nightly_price, total_price, validate_modifier, MinStayError,
};

fn day_with(modifier: f64, min_stay: u32) -> AvailabilityDay {
    let mut day = AvailabilityDay::open(listing(), date(2026, 3, 10));
    day.price_modifier = modifier;
    day.min_stay_nights = min_stay;
    day
}

#[test]
fn nightly_price_scales_and_rounds_to_cents() {
    assert_eq!(nightly_price(10_000, 1.0), 10_000);
    assert_eq!(nightly_price(10_000, 1.2), 12_000);
    assert_eq!(nightly_price(10_000, 0.333), 3_330);
    assert_eq!(nightly_price(9_999, 1.5), 14_999);
}

#[test]
fn total_price_sums_per_day_modifiers() {
    let days = vec![day_with(1.0, 1), day_with(1.2, 1), day_with(0.9, 1)];
    assert_eq!(total_price(10_000, &days), 31_000);
}

#[test]
fn total_price_with_flat_modifiers() {
    let days = vec![day_with(1.0, 1), day_with(1.0, 1)];
    assert_eq!(total_price(5_000, &days), 10_000);
}

#[test]
fn min_stay_uses_strictest_rule_in_window() {
    let days = vec![day_with(1.0, 1), day_with(1.0, 3), day_with(1.0, 2)];
    match check_min_stay(2, &days) {
        Err(MinStayError {
            required: 3,
            requested: 2,
        }) => {}
        other => panic!("expected min-stay rejection, got {other:?}"),
    }
    assert!(check_min_stay(3, &days).is_ok());
}

#[test]
fn min_stay_defaults_to_one_night_for_unset_days() {
    assert!(check_min_stay(1, &[]).is_ok());
}

#[test]
fn modifier_validation_rejects_non_positive_and_non_finite() {
    assert!(validate_modifier(1.0).is_ok());
    assert!(validate_modifier(0.05).is_ok());
    assert!(validate_modifier(0.0).is_err());
    assert!(validate_modifier(-1.5).is_err());
    assert!(validate_modifier(f64::NAN).is_err());
    assert!(validate_modifier(f64::INFINITY).is_err());
}
