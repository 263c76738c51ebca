use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::reservations::availability::AvailabilityQueryService;
use crate::reservations::booking::{
    BookingRequest, BookingService, ChargeOutcome, InMemoryListingCatalog, ListingProfile,
    NotificationError, NotificationSender, PaymentDetails, PaymentError, PaymentProcessor,
};
use crate::reservations::bulk::BulkCalendarService;
use crate::reservations::clock::Clock;
use crate::reservations::domain::{
    Booking, BookingId, GuestId, HolderId, ListingId, PaymentMethod,
};
use crate::reservations::holds::ReservationHoldManager;
use crate::reservations::store::{
    BookingRepository, InMemoryAvailabilityStore, InMemoryBookingRepository, RepositoryError,
};

pub(super) const BASE_PRICE_CENTS: i64 = 10_000;
pub(super) const MAX_GUESTS: u32 = 4;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn listing() -> ListingId {
    ListingId("loft-12".to_string())
}

pub(super) fn holder(name: &str) -> HolderId {
    HolderId(name.to_string())
}

/// Clock whose reading only moves when a test advances it.
pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub(super) fn default_start() -> Arc<Self> {
        Self::starting_at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard = *guard + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// Payment double that replays a script of outcomes and records the amounts
/// it was asked to charge. An empty script approves everything.
#[derive(Default)]
pub(super) struct ScriptedPayments {
    script: Mutex<VecDeque<ChargeOutcome>>,
    pub(super) charged_amounts: Mutex<Vec<i64>>,
}

impl ScriptedPayments {
    pub(super) fn push(&self, outcome: ChargeOutcome) {
        self.script
            .lock()
            .expect("payment mutex poisoned")
            .push_back(outcome);
    }

    pub(super) fn charges(&self) -> Vec<i64> {
        self.charged_amounts
            .lock()
            .expect("payment mutex poisoned")
            .clone()
    }
}

impl PaymentProcessor for ScriptedPayments {
    fn charge(
        &self,
        amount: i64,
        _details: &PaymentDetails,
    ) -> Result<ChargeOutcome, PaymentError> {
        self.charged_amounts
            .lock()
            .expect("payment mutex poisoned")
            .push(amount);
        let next = self
            .script
            .lock()
            .expect("payment mutex poisoned")
            .pop_front();
        Ok(next.unwrap_or(ChargeOutcome::Approved {
            reference: "test-charge".to_string(),
        }))
    }
}

/// Notification double that records confirmations and can be told to fail.
#[derive(Default)]
pub(super) struct RecordingNotifier {
    confirmed: Mutex<Vec<BookingId>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub(super) fn fail_next_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub(super) fn confirmations(&self) -> Vec<BookingId> {
        self.confirmed.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationSender for RecordingNotifier {
    fn booking_confirmed(&self, booking: &Booking) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Transport(
                "smtp relay offline".to_string(),
            ));
        }
        self.confirmed
            .lock()
            .expect("notifier mutex poisoned")
            .push(booking.id);
        Ok(())
    }
}

/// Repository wrapper counting inserts, so tests can assert that a failed
/// booking attempt stored nothing.
#[derive(Default)]
pub(super) struct CountingRepository {
    inner: InMemoryBookingRepository,
    pub(super) inserts: AtomicUsize,
}

impl CountingRepository {
    pub(super) fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

impl BookingRepository for CountingRepository {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let stored = self.inner.insert(booking)?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    fn update(&self, booking: Booking) -> Result<(), RepositoryError> {
        self.inner.update(booking)
    }

    fn fetch(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        self.inner.fetch(id)
    }
}

pub(super) struct CalendarFixture {
    pub(super) store: Arc<InMemoryAvailabilityStore>,
    pub(super) clock: Arc<ManualClock>,
    pub(super) calendar: AvailabilityQueryService<InMemoryAvailabilityStore>,
    pub(super) holds: Arc<ReservationHoldManager<InMemoryAvailabilityStore>>,
    pub(super) bulk: BulkCalendarService<InMemoryAvailabilityStore>,
}

pub(super) fn calendar_fixture() -> CalendarFixture {
    let store = Arc::new(InMemoryAvailabilityStore::new());
    let clock = ManualClock::default_start();
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    let calendar = AvailabilityQueryService::new(store.clone(), clock_dyn.clone(), 370);
    let holds = Arc::new(ReservationHoldManager::new(
        store.clone(),
        clock_dyn.clone(),
        15,
    ));
    let bulk = BulkCalendarService::new(store.clone(), clock_dyn);
    CalendarFixture {
        store,
        clock,
        calendar,
        holds,
        bulk,
    }
}

pub(super) type TestBookingService = BookingService<
    InMemoryAvailabilityStore,
    CountingRepository,
    InMemoryListingCatalog,
    ScriptedPayments,
    RecordingNotifier,
>;

pub(super) struct BookingFixture {
    pub(super) calendar: CalendarFixture,
    pub(super) service: TestBookingService,
    pub(super) repository: Arc<CountingRepository>,
    pub(super) payments: Arc<ScriptedPayments>,
    pub(super) notifier: Arc<RecordingNotifier>,
}

pub(super) fn booking_fixture() -> BookingFixture {
    let calendar = calendar_fixture();
    let repository = Arc::new(CountingRepository::default());
    let payments = Arc::new(ScriptedPayments::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let catalog = Arc::new(InMemoryListingCatalog::with_listings([ListingProfile {
        id: listing(),
        base_price_cents: BASE_PRICE_CENTS,
        max_guests: MAX_GUESTS,
    }]));
    let clock_dyn: Arc<dyn Clock> = calendar.clock.clone();
    let service = BookingService::new(
        calendar.store.clone(),
        repository.clone(),
        catalog,
        payments.clone(),
        notifier.clone(),
        calendar.calendar.clone(),
        calendar.holds.clone(),
        clock_dyn,
    );
    BookingFixture {
        calendar,
        service,
        repository,
        payments,
        notifier,
    }
}

pub(super) fn card_request(
    check_in: NaiveDate,
    check_out: NaiveDate,
    hold: &crate::reservations::domain::ReservationHold,
) -> BookingRequest {
    BookingRequest {
        listing_id: listing(),
        guest_id: GuestId("guest-7".to_string()),
        check_in,
        check_out,
        guests: 2,
        payment_method: PaymentMethod::Card,
        special_requests: None,
        hold_id: Some(hold.id),
        holder_id: Some(hold.holder_id.clone()),
    }
}

pub(super) fn cash_request(check_in: NaiveDate, check_out: NaiveDate) -> BookingRequest {
    BookingRequest {
        listing_id: listing(),
        guest_id: GuestId("guest-7".to_string()),
        check_in,
        check_out,
        guests: 2,
        payment_method: PaymentMethod::Cash,
        special_requests: None,
        hold_id: None,
        holder_id: None,
    }
}

pub(super) fn payment_details() -> PaymentDetails {
    PaymentDetails {
        method_token: "tok_test".to_string(),
    }
}
