use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::BookingConfig;
use crate::reservations::{
    AutoApprovePaymentProcessor, AvailabilityQueryService, BookingService, BulkCalendarService,
    Clock, InMemoryAvailabilityStore, InMemoryBookingRepository, InMemoryListingCatalog,
    ListingId, ListingProfile, ReservationApi, ReservationHoldManager, SystemClock,
    TracingNotifier,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type DevReservationApi = ReservationApi<
    InMemoryAvailabilityStore,
    InMemoryBookingRepository,
    InMemoryListingCatalog,
    AutoApprovePaymentProcessor,
    TracingNotifier,
>;

pub(crate) struct Engine {
    pub(crate) api: DevReservationApi,
    pub(crate) catalog: Arc<InMemoryListingCatalog>,
}

/// Wires the reservation services over the in-memory store. Production
/// deployments swap the store, catalog, processor, and notifier for real
/// integrations through the same trait seams.
pub(crate) fn build_engine(booking: &BookingConfig) -> Engine {
    let store = Arc::new(InMemoryAvailabilityStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let catalog = Arc::new(InMemoryListingCatalog::new());

    let availability =
        AvailabilityQueryService::new(store.clone(), clock.clone(), booking.max_window_days);
    let holds = Arc::new(ReservationHoldManager::new(
        store.clone(),
        clock.clone(),
        booking.hold_ttl_minutes,
    ));
    let bookings = Arc::new(BookingService::new(
        store.clone(),
        Arc::new(InMemoryBookingRepository::new()),
        catalog.clone(),
        Arc::new(AutoApprovePaymentProcessor),
        Arc::new(TracingNotifier),
        availability.clone(),
        holds.clone(),
        clock.clone(),
    ));
    let bulk = Arc::new(BulkCalendarService::new(store, clock));

    Engine {
        api: ReservationApi {
            availability,
            holds,
            bookings,
            bulk,
        },
        catalog,
    }
}

/// Parses a `listing_id:base_price_cents:max_guests` seed triple.
pub(crate) fn parse_seed_listing(raw: &str) -> Result<ListingProfile, String> {
    let mut parts = raw.trim().splitn(3, ':');
    let id = parts
        .next()
        .filter(|part| !part.is_empty())
        .ok_or_else(|| format!("seed '{raw}' is missing a listing id"))?;
    let base = parts
        .next()
        .ok_or_else(|| format!("seed '{raw}' is missing a base price"))?
        .parse::<i64>()
        .map_err(|err| format!("seed '{raw}' has an invalid base price ({err})"))?;
    let guests = parts
        .next()
        .ok_or_else(|| format!("seed '{raw}' is missing a guest limit"))?
        .parse::<u32>()
        .map_err(|err| format!("seed '{raw}' has an invalid guest limit ({err})"))?;
    if base <= 0 {
        return Err(format!("seed '{raw}' must have a positive base price"));
    }
    Ok(ListingProfile {
        id: ListingId(id.to_string()),
        base_price_cents: base,
        max_guests: guests,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
