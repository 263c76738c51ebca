//! Availability and booking engine: per-listing day calendars, TTL-bound
//! holds, locked-price bookings, and guarded host bulk edits.

pub mod availability;
pub mod booking;
pub mod bulk;
pub mod clock;
pub mod domain;
pub mod holds;
pub mod pricing;
pub mod router;
pub mod store;

#[cfg(test)]
mod tests;

pub use availability::{AvailabilityQueryService, CalendarStats, QueryError};
pub use booking::{
    AutoApprovePaymentProcessor, BookingError, BookingRequest, BookingService, CatalogError,
    ChargeOutcome, InMemoryListingCatalog, ListingCatalog, ListingProfile, NightlyQuote,
    NotificationError, NotificationSender, PaymentDetails, PaymentError, PaymentProcessor,
    StayQuote, TracingNotifier,
};
pub use bulk::{BulkCalendarService, BulkError, BulkOutcome, DayPatch};
pub use clock::{Clock, SystemClock};
pub use domain::{
    AvailabilityDay, Booking, BookingId, BookingStatus, Cents, DayStatus, GuestId, HoldId,
    HolderId, ListingId, PaymentMethod, RangeError, ReservationHold, StayRange,
};
pub use holds::{HoldError, ReservationHoldManager};
pub use router::{reservation_router, ReservationApi};
pub use store::{
    AvailabilityStore, BookingRepository, InMemoryAvailabilityStore, InMemoryBookingRepository,
    RepositoryError, StoreError,
};
