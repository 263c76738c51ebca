use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::clock::Clock;
use super::domain::{AvailabilityDay, DayStatus, ListingId, RangeError, StayRange};
use super::pricing::{self, ModifierError};
use super::store::{AvailabilityStore, StoreError};

/// Host-facing bulk edits over a calendar window.
///
/// Every mutation routes through the same guard: days that are booked, or
/// actively held by a guest, are never modified. The guard is evaluated with
/// lazy expiry applied, so a lapsed hold does not protect its days.
pub struct BulkCalendarService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

/// Field-wise patch applied to each eligible day in a range. `None` leaves the
/// field as it is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayPatch {
    pub status: Option<DayStatus>,
    pub price_modifier: Option<f64>,
    pub min_stay_nights: Option<u32>,
    pub notes: Option<String>,
}

/// What a bulk edit actually touched, so hosts can see which days were
/// protected by guest activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub updated: u32,
    pub skipped_booked: Vec<NaiveDate>,
    pub skipped_reserved: Vec<NaiveDate>,
}

impl<S> BulkCalendarService<S>
where
    S: AvailabilityStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Applies `patch` to every unprotected day in `[start, end)`.
    pub fn apply_range(
        &self,
        listing: &ListingId,
        start: NaiveDate,
        end: NaiveDate,
        patch: &DayPatch,
    ) -> Result<BulkOutcome, BulkError> {
        let range = StayRange::new(start, end)?;
        self.apply_dates(listing, range.days().collect(), patch)
    }

    /// Applies `patch` to an explicit day list, which need not be contiguous
    /// or sorted. Hosts may not set days to `reserved`; that status is owned
    /// by the hold flow.
    pub fn apply_dates(
        &self,
        listing: &ListingId,
        dates: Vec<NaiveDate>,
        patch: &DayPatch,
    ) -> Result<BulkOutcome, BulkError> {
        if patch.status == Some(DayStatus::Reserved) {
            return Err(BulkError::ReservedNotSettable);
        }
        if let Some(modifier) = patch.price_modifier {
            pricing::validate_modifier(modifier)?;
        }
        let outcome = self.patch_days(listing, dates, |day| apply_patch(day, patch))?;
        info!(
            listing = %listing.0,
            updated = outcome.updated,
            skipped = outcome.skipped_booked.len() + outcome.skipped_reserved.len(),
            "applied bulk calendar edit"
        );
        Ok(outcome)
    }

    /// Quick action: blocks every Friday and Saturday night in the window.
    pub fn block_weekends(
        &self,
        listing: &ListingId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BulkOutcome, BulkError> {
        let range = StayRange::new(start, end)?;
        self.patch_days(listing, weekend_dates(range), |day| {
            day.status = DayStatus::Blocked;
        })
    }

    /// Quick action: reopens blocked and maintenance days.
    pub fn unblock(
        &self,
        listing: &ListingId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BulkOutcome, BulkError> {
        let range = StayRange::new(start, end)?;
        self.patch_days(listing, range.days().collect(), |day| {
            if matches!(day.status, DayStatus::Blocked | DayStatus::Maintenance) {
                day.status = DayStatus::Available;
            }
        })
    }

    /// Quick action: multiplies each day's price modifier by `factor`,
    /// capping the result at `cap`.
    pub fn boost_pricing(
        &self,
        listing: &ListingId,
        start: NaiveDate,
        end: NaiveDate,
        factor: f64,
        cap: f64,
    ) -> Result<BulkOutcome, BulkError> {
        pricing::validate_modifier(factor)?;
        pricing::validate_modifier(cap)?;
        let range = StayRange::new(start, end)?;
        self.patch_days(listing, range.days().collect(), |day| {
            day.price_modifier = (day.price_modifier * factor).min(cap);
        })
    }

    /// Shared guard-then-write pass. Reads the current window view (lazy
    /// expiry applied), sorts days into protected and editable, mutates the
    /// editable ones, and writes them back in one upsert.
    fn patch_days<F>(
        &self,
        listing: &ListingId,
        mut dates: Vec<NaiveDate>,
        mut mutate: F,
    ) -> Result<BulkOutcome, BulkError>
    where
        F: FnMut(&mut AvailabilityDay),
    {
        dates.sort_unstable();
        dates.dedup();
        let mut outcome = BulkOutcome::default();
        let Some((&first, &last)) = dates.first().zip(dates.last()) else {
            return Ok(outcome);
        };
        let now = self.clock.now();
        let window = StayRange::new(first, last + chrono::Duration::days(1))?;
        let stored = self.store.fetch_days(listing, window, now)?;
        let mut by_date: std::collections::HashMap<NaiveDate, AvailabilityDay> =
            stored.into_iter().map(|day| (day.date, day)).collect();

        let mut writes = Vec::with_capacity(dates.len());
        for date in dates {
            let mut day = by_date
                .remove(&date)
                .unwrap_or_else(|| AvailabilityDay::open(listing.clone(), date));
            match day.status {
                DayStatus::Booked => {
                    outcome.skipped_booked.push(date);
                    continue;
                }
                DayStatus::Reserved => {
                    outcome.skipped_reserved.push(date);
                    continue;
                }
                DayStatus::Available | DayStatus::Blocked | DayStatus::Maintenance => {}
            }
            mutate(&mut day);
            outcome.updated += 1;
            writes.push(day);
        }
        self.store.upsert_days(writes)?;
        Ok(outcome)
    }
}

fn apply_patch(day: &mut AvailabilityDay, patch: &DayPatch) {
    if let Some(status) = patch.status {
        day.status = status;
    }
    if let Some(modifier) = patch.price_modifier {
        day.price_modifier = modifier;
    }
    if let Some(min_stay) = patch.min_stay_nights {
        day.min_stay_nights = min_stay;
    }
    if let Some(notes) = &patch.notes {
        day.notes = Some(notes.clone());
    }
}

/// Friday and Saturday nights inside `[check_in, check_out)`.
pub fn weekend_dates(range: StayRange) -> Vec<NaiveDate> {
    range
        .days()
        .filter(|date| matches!(date.weekday(), Weekday::Fri | Weekday::Sat))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    #[error(transparent)]
    InvalidRange(#[from] RangeError),
    #[error(transparent)]
    InvalidModifier(#[from] ModifierError),
    #[error("days cannot be set to reserved directly")]
    ReservedNotSettable,
    #[error(transparent)]
    Store(#[from] StoreError),
}
