use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::clock::Clock;
use super::domain::{AvailabilityDay, DayStatus, ListingId, RangeError, StayRange};
use super::store::{AvailabilityStore, StoreError};

/// Range reads with default fill for unset dates, plus aggregate occupancy
/// statistics over a window.
pub struct AvailabilityQueryService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    max_window_days: i64,
}

impl<S> Clone for AvailabilityQueryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            max_window_days: self.max_window_days,
        }
    }
}

impl<S> AvailabilityQueryService<S>
where
    S: AvailabilityStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, max_window_days: i64) -> Self {
        Self {
            store,
            clock,
            max_window_days,
        }
    }

    /// One entry per calendar day in `[start, end)`, synthesizing default
    /// available entries for days with no stored record. The window index is
    /// rebuilt per query and never shared across requests.
    pub fn get_range(
        &self,
        listing: &ListingId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AvailabilityDay>, QueryError> {
        let range = self.bounded_range(start, end)?;
        let stored = self
            .store
            .fetch_days(listing, range, self.clock.now())?;
        let mut index: BTreeMap<NaiveDate, AvailabilityDay> =
            stored.into_iter().map(|day| (day.date, day)).collect();
        Ok(range
            .days()
            .map(|date| {
                index
                    .remove(&date)
                    .unwrap_or_else(|| AvailabilityDay::open(listing.clone(), date))
            })
            .collect())
    }

    /// Aggregates over the window. The occupancy rate counts booked days only;
    /// the average price modifier covers available days only, so it reflects
    /// the host's pricing strategy rather than occupancy.
    pub fn compute_stats(
        &self,
        listing: &ListingId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CalendarStats, QueryError> {
        let days = self.get_range(listing, start, end)?;
        let total_days = days.len() as u32;
        let mut stats = CalendarStats {
            total_days,
            ..CalendarStats::default()
        };

        let mut modifier_sum = 0.0;
        for day in &days {
            match day.status {
                DayStatus::Available => {
                    stats.available += 1;
                    modifier_sum += day.price_modifier;
                }
                DayStatus::Reserved => stats.reserved += 1,
                DayStatus::Booked => stats.booked += 1,
                DayStatus::Blocked | DayStatus::Maintenance => {
                    stats.blocked_or_maintenance += 1;
                }
            }
        }

        if total_days > 0 {
            stats.occupancy_rate = f64::from(stats.booked) / f64::from(total_days);
        }
        if stats.available > 0 {
            stats.avg_price_modifier = modifier_sum / f64::from(stats.available);
        }
        Ok(stats)
    }

    fn bounded_range(&self, start: NaiveDate, end: NaiveDate) -> Result<StayRange, QueryError> {
        let range = StayRange::new(start, end)?;
        let days = i64::from(range.nights());
        if days > self.max_window_days {
            return Err(QueryError::WindowTooLarge {
                days,
                max: self.max_window_days,
            });
        }
        Ok(range)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CalendarStats {
    pub total_days: u32,
    pub available: u32,
    pub reserved: u32,
    pub booked: u32,
    pub blocked_or_maintenance: u32,
    pub occupancy_rate: f64,
    pub avg_price_modifier: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    InvalidRange(#[from] RangeError),
    #[error("window of {days} days exceeds the {max}-day query limit")]
    WindowTooLarge { days: i64, max: i64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}
