use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info};

use super::clock::Clock;
use super::domain::{
    BookingId, HoldId, HolderId, ListingId, RangeError, ReservationHold, StayRange,
};
use super::store::{AvailabilityStore, StoreError};

/// Atomic, time-bounded claiming of date ranges.
///
/// A hold is the exclusivity window between "guest picked dates" and "payment
/// settled": while it is active nobody else can claim the covered days, and
/// once `expires_at` passes the days fall back to available with no write
/// required. The stored expiry is authoritative; client-side countdowns are
/// advisory UI only.
pub struct ReservationHoldManager<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl<S> ReservationHoldManager<S>
where
    S: AvailabilityStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, default_ttl_minutes: i64) -> Self {
        Self {
            store,
            clock,
            default_ttl: Duration::minutes(default_ttl_minutes),
        }
    }

    /// Claims every date in `[check_in, check_out)` for `holder`, or claims
    /// nothing and reports the first conflicting date. No partial holds are
    /// ever observable.
    pub fn reserve(
        &self,
        listing: &ListingId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        holder: &HolderId,
        ttl_minutes: Option<i64>,
    ) -> Result<ReservationHold, HoldError> {
        let range = StayRange::new(check_in, check_out)?;
        let ttl = match ttl_minutes {
            Some(minutes) if minutes <= 0 => return Err(HoldError::InvalidTtl),
            Some(minutes) => Duration::minutes(minutes),
            None => self.default_ttl,
        };

        let now = self.clock.now();
        let hold = ReservationHold {
            id: HoldId::generate(),
            listing_id: listing.clone(),
            check_in: range.check_in(),
            check_out: range.check_out(),
            holder_id: holder.clone(),
            created_at: now,
            expires_at: now + ttl,
        };
        self.store.insert_hold(&hold, now)?;

        info!(
            listing = %listing.0,
            holder = %holder.0,
            nights = range.nights(),
            expires_at = %hold.expires_at,
            "reserved date range"
        );
        Ok(hold)
    }

    /// Reverts the holder's reserved days in the window back to available.
    /// Idempotent: releasing a missing or already-expired hold is a no-op.
    pub fn release(
        &self,
        listing: &ListingId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        holder: &HolderId,
    ) -> Result<usize, HoldError> {
        let range = StayRange::new(check_in, check_out)?;
        let released =
            self.store
                .release_hold_days(listing, range, holder, self.clock.now())?;
        if released > 0 {
            info!(listing = %listing.0, holder = %holder.0, released, "released held days");
        }
        Ok(released)
    }

    /// Converts a still-active hold into permanent booked days. The hold must
    /// still cover its whole range: expired, non-owning, or partially released
    /// confirms fail without booking anything, and the caller must restart the
    /// reservation flow.
    pub fn confirm(
        &self,
        hold_id: HoldId,
        holder: &HolderId,
        booking_id: BookingId,
    ) -> Result<(), HoldError> {
        self.store
            .convert_hold(hold_id, holder, booking_id, self.clock.now())?;
        info!(hold = %hold_id.0, booking = %booking_id.0, "confirmed hold into booking");
        Ok(())
    }

    /// Immediate claim-and-book for flows without a separate hold phase
    /// (cash bookings): the booking creation acts as an implicit hold plus
    /// confirm in one atomic step.
    pub fn claim_direct(
        &self,
        listing: &ListingId,
        range: StayRange,
        booking_id: BookingId,
    ) -> Result<(), HoldError> {
        self.store
            .book_range(listing, range, booking_id, self.clock.now())?;
        info!(listing = %listing.0, booking = %booking_id.0, "booked date range directly");
        Ok(())
    }

    /// Proactively reverts expired holds. Correctness never depends on this
    /// running; it only keeps stored rows tidy between lazy-expiry reads.
    pub fn sweep_expired(&self) -> Result<usize, HoldError> {
        let swept = self.store.sweep_expired(self.clock.now())?;
        if swept > 0 {
            debug!(swept, "swept expired holds");
        }
        Ok(swept)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HoldError {
    #[error(transparent)]
    InvalidRange(#[from] RangeError),
    #[error("hold TTL must be a positive number of minutes")]
    InvalidTtl,
    #[error("date {date} is not available")]
    Conflict { date: NaiveDate },
    #[error("hold has expired or does not belong to this holder")]
    Expired,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for HoldError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict { date } => HoldError::Conflict { date },
            StoreError::HoldInactive => HoldError::Expired,
            other => HoldError::Store(other),
        }
    }
}
