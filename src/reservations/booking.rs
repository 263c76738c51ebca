use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use super::availability::{AvailabilityQueryService, QueryError};
use super::clock::Clock;
use super::domain::{
    Booking, BookingId, BookingStatus, Cents, DayStatus, GuestId, HoldId, HolderId, ListingId,
    PaymentMethod, RangeError, StayRange,
};
use super::holds::{HoldError, ReservationHoldManager};
use super::pricing::{self, MinStayError};
use super::store::{AvailabilityStore, BookingRepository, RepositoryError, StoreError};

/// Read-only listing facts owned by the external catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingProfile {
    pub id: ListingId,
    pub base_price_cents: Cents,
    pub max_guests: u32,
}

pub trait ListingCatalog: Send + Sync {
    fn listing(&self, id: &ListingId) -> Result<Option<ListingProfile>, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("listing catalog unavailable: {0}")]
    Unavailable(String),
}

/// Tokenized payment instrument; the engine never sees raw card data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    pub method_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Approved { reference: String },
    Declined { reason: String },
}

pub trait PaymentProcessor: Send + Sync {
    fn charge(&self, amount: Cents, details: &PaymentDetails) -> Result<ChargeOutcome, PaymentError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment processor unavailable: {0}")]
    Unavailable(String),
}

/// Fire-and-forget confirmation hook. Delivery failures are logged and must
/// never roll a booking back.
pub trait NotificationSender: Send + Sync {
    fn booking_confirmed(&self, booking: &Booking) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub listing_id: ListingId,
    pub guest_id: GuestId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub payment_method: PaymentMethod,
    pub special_requests: Option<String>,
    /// Card flow only: the hold obtained while the guest went through checkout.
    pub hold_id: Option<HoldId>,
    pub holder_id: Option<HolderId>,
}

/// Drives the booking lifecycle: creation against held (card) or free (cash)
/// dates, payment settlement, cancellation, and completion.
pub struct BookingService<S, B, C, P, N> {
    bookings: Arc<B>,
    catalog: Arc<C>,
    payments: Arc<P>,
    notifier: Arc<N>,
    calendar: AvailabilityQueryService<S>,
    holds: Arc<ReservationHoldManager<S>>,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S, B, C, P, N> BookingService<S, B, C, P, N>
where
    S: AvailabilityStore,
    B: BookingRepository,
    C: ListingCatalog,
    P: PaymentProcessor,
    N: NotificationSender,
{
    pub fn new(
        store: Arc<S>,
        bookings: Arc<B>,
        catalog: Arc<C>,
        payments: Arc<P>,
        notifier: Arc<N>,
        calendar: AvailabilityQueryService<S>,
        holds: Arc<ReservationHoldManager<S>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            catalog,
            payments,
            notifier,
            calendar,
            holds,
            store,
            clock,
        }
    }

    /// Creates a booking and locks its total price against the current
    /// per-day modifiers. Card bookings start `pending` behind an active
    /// hold; cash bookings claim the range immediately and start `confirmed`.
    /// A cash conflict leaves no booking record behind.
    pub fn create_booking(&self, request: BookingRequest) -> Result<Booking, BookingError> {
        let range = StayRange::new(request.check_in, request.check_out)?;
        let profile = self
            .catalog
            .listing(&request.listing_id)?
            .ok_or_else(|| BookingError::UnknownListing(request.listing_id.clone()))?;
        if request.guests > profile.max_guests {
            return Err(BookingError::TooManyGuests {
                requested: request.guests,
                max: profile.max_guests,
            });
        }

        let days = self
            .calendar
            .get_range(&request.listing_id, range.check_in(), range.check_out())?;
        pricing::check_min_stay(range.nights(), &days)?;
        let total = pricing::total_price(profile.base_price_cents, &days);

        let mut booking = Booking {
            id: BookingId::generate(),
            listing_id: request.listing_id.clone(),
            guest_id: request.guest_id.clone(),
            check_in_date: range.check_in(),
            check_out_date: range.check_out(),
            total_nights: range.nights(),
            total_amount_cents: total,
            payment_method: request.payment_method,
            status: BookingStatus::Pending,
            special_requests: request.special_requests.clone(),
            hold_id: None,
            holder_id: None,
        };

        match request.payment_method {
            PaymentMethod::Card => {
                let hold_id = request.hold_id.ok_or(BookingError::MissingHold)?;
                let holder = request.holder_id.clone().ok_or(BookingError::MissingHold)?;
                let hold = self
                    .store
                    .hold(hold_id)?
                    .ok_or(BookingError::HoldExpired)?;
                if hold.holder_id != holder || hold.is_expired(self.clock.now()) {
                    return Err(BookingError::HoldExpired);
                }
                if hold.listing_id != request.listing_id || hold.range() != range {
                    return Err(BookingError::Validation(
                        "hold does not cover the requested stay".to_string(),
                    ));
                }
                booking.hold_id = Some(hold_id);
                booking.holder_id = Some(holder);
                let stored = self.bookings.insert(booking)?;
                info!(booking = %stored.id, listing = %stored.listing_id, "created pending card booking");
                Ok(stored)
            }
            PaymentMethod::Cash => {
                self.holds
                    .claim_direct(&request.listing_id, range, booking.id)?;
                booking.status = BookingStatus::Confirmed;
                let stored = self.bookings.insert(booking)?;
                info!(booking = %stored.id, listing = %stored.listing_id, "confirmed cash booking");
                self.notify(&stored);
                Ok(stored)
            }
        }
    }

    /// Charges the locked total through the external processor and settles
    /// the booking: approved charges convert the hold into booked days and
    /// confirm; declines and expired holds release the dates and cancel, so
    /// nothing stays stuck `reserved`.
    pub fn process_payment(
        &self,
        booking_id: BookingId,
        details: &PaymentDetails,
    ) -> Result<Booking, BookingError> {
        let mut booking = self.fetch(booking_id)?;
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: booking.status.label(),
                to: BookingStatus::Confirmed.label(),
            });
        }
        let (hold_id, holder) = match (booking.hold_id, booking.holder_id.clone()) {
            (Some(hold_id), Some(holder)) => (hold_id, holder),
            _ => {
                return Err(BookingError::Validation(
                    "pending booking has no hold attached".to_string(),
                ))
            }
        };

        match self.payments.charge(booking.total_amount_cents, details)? {
            ChargeOutcome::Approved { reference } => {
                match self.holds.confirm(hold_id, &holder, booking.id) {
                    Ok(()) => {
                        booking.status = BookingStatus::Confirmed;
                        self.bookings.update(booking.clone())?;
                        info!(
                            booking = %booking.id,
                            charge = %reference,
                            "payment approved, booking confirmed"
                        );
                        self.notify(&booking);
                        Ok(booking)
                    }
                    Err(HoldError::Expired) => {
                        // Charge succeeded but the hold lapsed mid-flight;
                        // the dates are already lazily available again.
                        self.cancel_after_failed_settlement(&mut booking, &holder)?;
                        warn!(booking = %booking.id, "hold expired before settlement, booking cancelled");
                        Err(BookingError::HoldExpired)
                    }
                    Err(other) => Err(other.into()),
                }
            }
            ChargeOutcome::Declined { reason } => {
                self.cancel_after_failed_settlement(&mut booking, &holder)?;
                warn!(booking = %booking.id, %reason, "payment declined, booking cancelled");
                Err(BookingError::PaymentDeclined { reason })
            }
        }
    }

    /// Cancels a pending or confirmed booking, returning its dates to
    /// available (held days for pending card bookings, booked days for
    /// confirmed ones).
    pub fn cancel(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        let mut booking = self.fetch(booking_id)?;
        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(BookingError::InvalidTransition {
                from: booking.status.label(),
                to: BookingStatus::Cancelled.label(),
            });
        }

        match booking.status {
            BookingStatus::Pending => {
                if let Some(holder) = booking.holder_id.clone() {
                    self.holds.release(
                        &booking.listing_id,
                        booking.check_in_date,
                        booking.check_out_date,
                        &holder,
                    )?;
                }
            }
            BookingStatus::Confirmed => {
                self.store.release_booking(booking.id)?;
            }
            BookingStatus::Cancelled | BookingStatus::Completed => {}
        }

        booking.status = BookingStatus::Cancelled;
        self.bookings.update(booking.clone())?;
        info!(booking = %booking.id, "booking cancelled");
        Ok(booking)
    }

    /// Marks a confirmed booking completed once the stay has elapsed. The
    /// trigger is external (scheduler or admin); booked days stay booked as
    /// history.
    pub fn complete(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        let mut booking = self.fetch(booking_id)?;
        if !booking.status.can_transition_to(BookingStatus::Completed) {
            return Err(BookingError::InvalidTransition {
                from: booking.status.label(),
                to: BookingStatus::Completed.label(),
            });
        }
        booking.status = BookingStatus::Completed;
        self.bookings.update(booking.clone())?;
        info!(booking = %booking.id, "booking completed");
        Ok(booking)
    }

    pub fn get(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.fetch(booking_id)
    }

    /// Prices a prospective stay without claiming anything. The returned
    /// total is indicative; the binding price is locked at booking creation.
    pub fn quote(
        &self,
        listing_id: &ListingId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<StayQuote, BookingError> {
        let range = StayRange::new(check_in, check_out)?;
        let profile = self
            .catalog
            .listing(listing_id)?
            .ok_or_else(|| BookingError::UnknownListing(listing_id.clone()))?;
        let days = self
            .calendar
            .get_range(listing_id, range.check_in(), range.check_out())?;
        pricing::check_min_stay(range.nights(), &days)?;

        let nightly = days
            .iter()
            .map(|day| NightlyQuote {
                date: day.date,
                status: day.status,
                price_cents: pricing::nightly_price(profile.base_price_cents, day.price_modifier),
            })
            .collect::<Vec<_>>();
        Ok(StayQuote {
            listing_id: listing_id.clone(),
            check_in: range.check_in(),
            check_out: range.check_out(),
            nights: range.nights(),
            total_cents: nightly.iter().map(|night| night.price_cents).sum(),
            nightly,
        })
    }

    fn fetch(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.bookings
            .fetch(booking_id)?
            .ok_or(BookingError::NotFound(booking_id))
    }

    fn cancel_after_failed_settlement(
        &self,
        booking: &mut Booking,
        holder: &HolderId,
    ) -> Result<(), BookingError> {
        self.holds.release(
            &booking.listing_id,
            booking.check_in_date,
            booking.check_out_date,
            holder,
        )?;
        booking.status = BookingStatus::Cancelled;
        self.bookings.update(booking.clone())?;
        Ok(())
    }

    fn notify(&self, booking: &Booking) {
        if let Err(err) = self.notifier.booking_confirmed(booking) {
            warn!(booking = %booking.id, error = %err, "confirmation notification failed, booking state unaffected");
        }
    }
}

/// Indicative pricing for a prospective stay.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StayQuote {
    pub listing_id: ListingId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
    pub total_cents: Cents,
    pub nightly: Vec<NightlyQuote>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NightlyQuote {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub price_cents: Cents,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error(transparent)]
    InvalidRange(#[from] RangeError),
    #[error(transparent)]
    MinStay(#[from] MinStayError),
    #[error("invalid booking request: {0}")]
    Validation(String),
    #[error("listing {0} is not in the catalog")]
    UnknownListing(ListingId),
    #[error("party of {requested} exceeds the {max}-guest limit for this listing")]
    TooManyGuests { requested: u32, max: u32 },
    #[error("card bookings require an active hold")]
    MissingHold,
    #[error("date {date} is not available")]
    Conflict { date: NaiveDate },
    #[error("hold has expired or does not belong to this holder")]
    HoldExpired,
    #[error("payment was declined: {reason}")]
    PaymentDeclined { reason: String },
    #[error("booking {0} not found")]
    NotFound(BookingId),
    #[error("booking cannot move from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for BookingError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict { date } => BookingError::Conflict { date },
            StoreError::HoldInactive => BookingError::HoldExpired,
            other => BookingError::Store(other),
        }
    }
}

impl From<HoldError> for BookingError {
    fn from(value: HoldError) -> Self {
        match value {
            HoldError::InvalidRange(err) => BookingError::InvalidRange(err),
            HoldError::InvalidTtl => {
                BookingError::Validation("hold TTL must be a positive number of minutes".to_string())
            }
            HoldError::Conflict { date } => BookingError::Conflict { date },
            HoldError::Expired => BookingError::HoldExpired,
            HoldError::Store(err) => BookingError::Store(err),
        }
    }
}

impl From<QueryError> for BookingError {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::InvalidRange(err) => BookingError::InvalidRange(err),
            QueryError::WindowTooLarge { days, max } => BookingError::Validation(format!(
                "stay of {days} days exceeds the {max}-day window limit"
            )),
            QueryError::Store(err) => err.into(),
        }
    }
}

/// Catalog backed by a seeded map, used by the dev server and tests. Real
/// deployments implement `ListingCatalog` against the marketplace catalog
/// service.
#[derive(Default)]
pub struct InMemoryListingCatalog {
    listings: Mutex<HashMap<ListingId, ListingProfile>>,
}

impl InMemoryListingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listings(listings: impl IntoIterator<Item = ListingProfile>) -> Self {
        let catalog = Self::default();
        for profile in listings {
            catalog.insert(profile);
        }
        catalog
    }

    pub fn insert(&self, profile: ListingProfile) {
        if let Ok(mut guard) = self.listings.lock() {
            guard.insert(profile.id.clone(), profile);
        }
    }
}

impl ListingCatalog for InMemoryListingCatalog {
    fn listing(&self, id: &ListingId) -> Result<Option<ListingProfile>, CatalogError> {
        let guard = self
            .listings
            .lock()
            .map_err(|_| CatalogError::Unavailable("listing catalog mutex poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }
}

/// Dev-server stand-in for the external processor: approves every charge with
/// a synthetic reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprovePaymentProcessor;

impl PaymentProcessor for AutoApprovePaymentProcessor {
    fn charge(&self, amount: Cents, _details: &PaymentDetails) -> Result<ChargeOutcome, PaymentError> {
        info!(amount_cents = amount, "auto-approving charge (dev processor)");
        Ok(ChargeOutcome::Approved {
            reference: format!("dev-{}", Uuid::new_v4()),
        })
    }
}

/// Logs confirmations instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSender for TracingNotifier {
    fn booking_confirmed(&self, booking: &Booking) -> Result<(), NotificationError> {
        info!(
            booking = %booking.id,
            guest = %booking.guest_id.0,
            "booking confirmation notification"
        );
        Ok(())
    }
}
