//! Nightly and total price arithmetic over a stay window.
//!
//! Prices are integer cents; applying a per-day modifier rounds to the
//! nearest cent so totals are reproducible across platforms.

use super::domain::{AvailabilityDay, Cents};

/// One night's price: the listing base price scaled by the day's modifier,
/// rounded to whole cents.
pub fn nightly_price(base_cents: Cents, modifier: f64) -> Cents {
    (base_cents as f64 * modifier).round() as Cents
}

/// Sum of nightly prices over the `[check_in, check_out)` days.
pub fn total_price(base_cents: Cents, days: &[AvailabilityDay]) -> Cents {
    days.iter()
        .map(|day| nightly_price(base_cents, day.price_modifier))
        .sum()
}

/// Fails when the stay is shorter than the strictest minimum-stay rule among
/// the covered days.
pub fn check_min_stay(nights: u32, days: &[AvailabilityDay]) -> Result<(), MinStayError> {
    let required = days
        .iter()
        .map(|day| day.min_stay_nights)
        .max()
        .unwrap_or(1);
    if nights < required {
        return Err(MinStayError {
            required,
            requested: nights,
        });
    }
    Ok(())
}

/// Price modifiers must be positive, finite multipliers.
pub fn validate_modifier(modifier: f64) -> Result<(), ModifierError> {
    if !modifier.is_finite() || modifier <= 0.0 {
        return Err(ModifierError(modifier));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stay of {requested} nights is below the {required}-night minimum for these dates")]
pub struct MinStayError {
    pub required: u32,
    pub requested: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("price modifier must be a positive number, got {0}")]
pub struct ModifierError(pub f64);
