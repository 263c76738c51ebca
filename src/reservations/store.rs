use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{
    AvailabilityDay, Booking, BookingId, DayStatus, HoldId, HolderId, ListingId, ReservationHold,
    StayRange,
};

/// Durable per-(listing, date) calendar storage plus the hold registry.
///
/// The hold registry lives behind the same abstraction so that a multi-day
/// claim can execute as one all-or-nothing operation: implementations must
/// guarantee that `insert_hold` and `book_range` either mutate every date in
/// the range or none of them. Every method takes `now` where lazy expiry
/// applies: a `Reserved` day whose hold has lapsed is treated as `Available`
/// at read and write time, whether or not a sweep has reverted it yet.
pub trait AvailabilityStore: Send + Sync {
    /// Stored rows inside the window, in date order, with lazy expiry applied
    /// to the returned view. Days without a row are not synthesized here.
    fn fetch_days(
        &self,
        listing: &ListingId,
        range: StayRange,
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailabilityDay>, StoreError>;

    /// Creates or overwrites day records. Records are created lazily on first
    /// write and never deleted.
    fn upsert_days(&self, days: Vec<AvailabilityDay>) -> Result<(), StoreError>;

    /// Atomic range claim: every date in the hold's range must be free, in
    /// which case all are marked `Reserved` and linked to the hold. On the
    /// first conflicting date nothing is mutated. A lapsed hold displaced by
    /// the claim is dropped from the registry once no day references it.
    fn insert_hold(&self, hold: &ReservationHold, now: DateTime<Utc>) -> Result<(), StoreError>;

    fn hold(&self, id: HoldId) -> Result<Option<ReservationHold>, StoreError>;

    /// Reverts `Reserved` days in the window back to `Available`, but only
    /// where the active hold belongs to `holder`. Returns how many days were
    /// reverted; releasing nothing is not an error.
    fn release_hold_days(
        &self,
        listing: &ListingId,
        range: StayRange,
        holder: &HolderId,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Converts a still-active hold's days from `Reserved` to `Booked` and
    /// associates them with the booking. Fails with `HoldInactive` when the
    /// hold is missing, expired, owned by a different holder, or no longer
    /// covers every day in its range (a partial release or a rival claim on a
    /// lapsed night both invalidate it); the check happens under the same
    /// lock/transaction as the conversion.
    fn convert_hold(
        &self,
        id: HoldId,
        holder: &HolderId,
        booking_id: BookingId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Direct claim for cash bookings: atomically moves every free date in
    /// the range straight to `Booked`.
    fn book_range(
        &self,
        listing: &ListingId,
        range: StayRange,
        booking_id: BookingId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Returns a cancelled booking's days to `Available`. Idempotent.
    fn release_booking(&self, booking_id: BookingId) -> Result<usize, StoreError>;

    /// Proactively reverts expired holds. Purely an efficiency pass: lazy
    /// expiry keeps reads and writes correct even if this never runs.
    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("date {date} is not available")]
    Conflict { date: NaiveDate },
    #[error("hold is no longer active")]
    HoldInactive,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Default)]
struct StoreInner {
    days: HashMap<(ListingId, NaiveDate), AvailabilityDay>,
    holds: HashMap<HoldId, ReservationHold>,
}

impl StoreInner {
    /// Whether the date can be claimed right now: no row, an `Available` row,
    /// or a `Reserved` row whose hold has lapsed or vanished.
    fn is_free(&self, listing: &ListingId, date: NaiveDate, now: DateTime<Utc>) -> bool {
        match self.days.get(&(listing.clone(), date)) {
            None => true,
            Some(day) => match day.status {
                DayStatus::Available => true,
                DayStatus::Reserved => day
                    .hold_id
                    .and_then(|id| self.holds.get(&id))
                    .map(|hold| hold.is_expired(now))
                    .unwrap_or(true),
                DayStatus::Booked | DayStatus::Blocked | DayStatus::Maintenance => false,
            },
        }
    }

    fn day_entry(&mut self, listing: &ListingId, date: NaiveDate) -> &mut AvailabilityDay {
        self.days
            .entry((listing.clone(), date))
            .or_insert_with(|| AvailabilityDay::open(listing.clone(), date))
    }

    /// Drops the hold record once no day references it any more.
    fn drop_hold_if_unreferenced(&mut self, id: HoldId) {
        let Some(hold) = self.holds.get(&id) else {
            return;
        };
        let listing = hold.listing_id.clone();
        let range = hold.range();
        let referenced = range.days().any(|date| {
            self.days
                .get(&(listing.clone(), date))
                .map(|day| day.hold_id == Some(id))
                .unwrap_or(false)
        });
        if !referenced {
            self.holds.remove(&id);
        }
    }
}

/// Mutex-backed calendar store. The single lock per store is what makes each
/// multi-day operation atomic; a SQL-backed implementation would rely on a
/// unique (listing_id, date) constraint and one serializable transaction
/// instead.
#[derive(Default)]
pub struct InMemoryAvailabilityStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("availability store mutex poisoned".to_string()))
    }
}

impl AvailabilityStore for InMemoryAvailabilityStore {
    fn fetch_days(
        &self,
        listing: &ListingId,
        range: StayRange,
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailabilityDay>, StoreError> {
        let inner = self.lock()?;
        let mut rows = Vec::new();
        for date in range.days() {
            let Some(day) = inner.days.get(&(listing.clone(), date)) else {
                continue;
            };
            let mut view = day.clone();
            if view.status == DayStatus::Reserved && inner.is_free(listing, date, now) {
                view.status = DayStatus::Available;
                view.hold_id = None;
            }
            rows.push(view);
        }
        Ok(rows)
    }

    fn upsert_days(&self, days: Vec<AvailabilityDay>) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for day in days {
            inner
                .days
                .insert((day.listing_id.clone(), day.date), day);
        }
        Ok(())
    }

    fn insert_hold(&self, hold: &ReservationHold, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let range = hold.range();
        for date in range.days() {
            if !inner.is_free(&hold.listing_id, date, now) {
                return Err(StoreError::Conflict { date });
            }
        }
        let mut displaced = Vec::new();
        for date in range.days() {
            let day = inner.day_entry(&hold.listing_id, date);
            if let Some(previous) = day.hold_id {
                displaced.push(previous);
            }
            day.status = DayStatus::Reserved;
            day.hold_id = Some(hold.id);
            day.booking_id = None;
        }
        inner.holds.insert(hold.id, hold.clone());
        // Lapsed holds whose last day was just re-claimed would otherwise
        // linger in the registry until a sweep runs.
        for previous in displaced {
            inner.drop_hold_if_unreferenced(previous);
        }
        Ok(())
    }

    fn hold(&self, id: HoldId) -> Result<Option<ReservationHold>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.holds.get(&id).cloned())
    }

    fn release_hold_days(
        &self,
        listing: &ListingId,
        range: StayRange,
        holder: &HolderId,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let mut released = 0;
        let mut touched_holds = Vec::new();
        for date in range.days() {
            let key = (listing.clone(), date);
            let hold_id = match inner.days.get(&key) {
                Some(day) if day.status == DayStatus::Reserved => match day.hold_id {
                    Some(id) => id,
                    None => continue,
                },
                _ => continue,
            };
            let owned_and_active = inner
                .holds
                .get(&hold_id)
                .map(|hold| hold.holder_id == *holder && !hold.is_expired(now))
                .unwrap_or(false);
            if !owned_and_active {
                continue;
            }
            if let Some(day) = inner.days.get_mut(&key) {
                day.status = DayStatus::Available;
                day.hold_id = None;
                released += 1;
                touched_holds.push(hold_id);
            }
        }
        for hold_id in touched_holds {
            inner.drop_hold_if_unreferenced(hold_id);
        }
        Ok(released)
    }

    fn convert_hold(
        &self,
        id: HoldId,
        holder: &HolderId,
        booking_id: BookingId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let Some(hold) = inner.holds.get(&id).cloned() else {
            return Err(StoreError::HoldInactive);
        };
        if hold.is_expired(now) || hold.holder_id != *holder {
            return Err(StoreError::HoldInactive);
        }
        // The hold must still cover its whole range; converting a partially
        // released or partially reclaimed hold would book dates it no longer
        // owns alongside dates someone else now holds.
        let intact = hold.range().days().all(|date| {
            inner
                .days
                .get(&(hold.listing_id.clone(), date))
                .map(|day| day.status == DayStatus::Reserved && day.hold_id == Some(id))
                .unwrap_or(false)
        });
        if !intact {
            return Err(StoreError::HoldInactive);
        }
        for date in hold.range().days() {
            if let Some(day) = inner.days.get_mut(&(hold.listing_id.clone(), date)) {
                day.status = DayStatus::Booked;
                day.hold_id = None;
                day.booking_id = Some(booking_id);
            }
        }
        inner.holds.remove(&id);
        Ok(())
    }

    fn book_range(
        &self,
        listing: &ListingId,
        range: StayRange,
        booking_id: BookingId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for date in range.days() {
            if !inner.is_free(listing, date, now) {
                return Err(StoreError::Conflict { date });
            }
        }
        let mut displaced = Vec::new();
        for date in range.days() {
            let day = inner.day_entry(listing, date);
            if let Some(previous) = day.hold_id {
                displaced.push(previous);
            }
            day.status = DayStatus::Booked;
            day.hold_id = None;
            day.booking_id = Some(booking_id);
        }
        for previous in displaced {
            inner.drop_hold_if_unreferenced(previous);
        }
        Ok(())
    }

    fn release_booking(&self, booking_id: BookingId) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let mut released = 0;
        for day in inner.days.values_mut() {
            if day.status == DayStatus::Booked && day.booking_id == Some(booking_id) {
                day.status = DayStatus::Available;
                day.booking_id = None;
                released += 1;
            }
        }
        Ok(released)
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let expired: Vec<ReservationHold> = inner
            .holds
            .values()
            .filter(|hold| hold.is_expired(now))
            .cloned()
            .collect();
        for hold in &expired {
            for date in hold.range().days() {
                let key = (hold.listing_id.clone(), date);
                if let Some(day) = inner.days.get_mut(&key) {
                    if day.status == DayStatus::Reserved && day.hold_id == Some(hold.id) {
                        day.status = DayStatus::Available;
                        day.hold_id = None;
                    }
                }
            }
            inner.holds.remove(&hold.id);
        }
        Ok(expired.len())
    }
}

/// Storage abstraction for booking records, mirroring the calendar store so
/// the booking service can be exercised against doubles.
pub trait BookingRepository: Send + Sync {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError>;
    fn update(&self, booking: Booking) -> Result<(), RepositoryError>;
    fn fetch(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    records: Mutex<HashMap<BookingId, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<BookingId, Booking>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("booking repository mutex poisoned".to_string()))
    }
}

impl BookingRepository for InMemoryBookingRepository {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&booking.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(booking.id, booking.clone());
        Ok(booking)
    }

    fn update(&self, booking: Booking) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if !guard.contains_key(&booking.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(booking.id, booking);
        Ok(())
    }

    fn fetch(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(&id).cloned())
    }
}
