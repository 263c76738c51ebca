use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Money is carried as integer cents so pricing arithmetic stays exact.
pub type Cents = i64;

pub const DEFAULT_PRICE_MODIFIER: f64 = 1.0;
pub const DEFAULT_MIN_STAY_NIGHTS: u32 = 1;

/// Opaque reference into the external listing catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of whoever is holding a date range through checkout (usually a guest session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolderId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuestId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoldId(pub Uuid);

impl HoldId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for HoldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub Uuid);

impl BookingId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Booking state of one calendar day for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Available,
    Reserved,
    Booked,
    Blocked,
    Maintenance,
}

impl DayStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DayStatus::Available => "available",
            DayStatus::Reserved => "reserved",
            DayStatus::Booked => "booked",
            DayStatus::Blocked => "blocked",
            DayStatus::Maintenance => "maintenance",
        }
    }
}

/// One calendar day's record for one listing. At most one record exists per
/// (listing, date); an absent record means the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityDay {
    pub listing_id: ListingId,
    pub date: NaiveDate,
    pub status: DayStatus,
    pub price_modifier: f64,
    pub min_stay_nights: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_id: Option<HoldId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<BookingId>,
}

impl AvailabilityDay {
    /// The synthetic record used for days with no stored row.
    pub fn open(listing_id: ListingId, date: NaiveDate) -> Self {
        Self {
            listing_id,
            date,
            status: DayStatus::Available,
            price_modifier: DEFAULT_PRICE_MODIFIER,
            min_stay_nights: DEFAULT_MIN_STAY_NIGHTS,
            notes: None,
            hold_id: None,
            booking_id: None,
        }
    }
}

/// Half-open `[check_in, check_out)` stay window. Construction rejects
/// inverted or empty windows, so a value always covers at least one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StayRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, RangeError> {
        if check_in >= check_out {
            return Err(RangeError::Inverted {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days() as u32
    }

    /// The dates covered by the stay, check-out day excluded.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.check_in.iter_days().take(self.nights() as usize)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.check_in && date < self.check_out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("check-out {check_out} must fall after check-in {check_in}")]
    Inverted {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

/// Time-bounded exclusive claim over a contiguous date range of one listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationHold {
    pub id: HoldId,
    pub listing_id: ListingId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub holder_id: HolderId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ReservationHold {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn range(&self) -> StayRange {
        StayRange {
            check_in: self.check_in,
            check_out: self.check_out,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
}

impl PaymentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Lifecycle table: pending -> confirmed -> completed, with cancellation
    /// allowed from pending and confirmed. Completed and cancelled are terminal.
    pub const fn can_transition_to(self, next: BookingStatus) -> bool {
        match self {
            BookingStatus::Pending => {
                matches!(next, BookingStatus::Confirmed | BookingStatus::Cancelled)
            }
            BookingStatus::Confirmed => {
                matches!(next, BookingStatus::Completed | BookingStatus::Cancelled)
            }
            BookingStatus::Cancelled | BookingStatus::Completed => false,
        }
    }
}

/// A guest's request to occupy a listing for a date range. The total amount is
/// locked when the booking is created and never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub id: BookingId,
    pub listing_id: ListingId,
    pub guest_id: GuestId,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub total_nights: u32,
    pub total_amount_cents: Cents,
    pub payment_method: PaymentMethod,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_id: Option<HoldId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_id: Option<HolderId>,
}

impl Booking {
    pub fn range(&self) -> StayRange {
        StayRange {
            check_in: self.check_in_date,
            check_out: self.check_out_date,
        }
    }
}
