use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::availability::{AvailabilityQueryService, QueryError};
use super::booking::{
    BookingError, BookingRequest, BookingService, ListingCatalog, NotificationSender,
    PaymentDetails, PaymentProcessor,
};
use super::bulk::{BulkCalendarService, BulkError, DayPatch};
use super::domain::{BookingId, GuestId, HoldId, HolderId, ListingId, PaymentMethod};
use super::holds::{HoldError, ReservationHoldManager};
use super::store::{AvailabilityStore, BookingRepository};

/// Shared handler state bundling the reservation services.
pub struct ReservationApi<S, B, C, P, N> {
    pub availability: AvailabilityQueryService<S>,
    pub holds: Arc<ReservationHoldManager<S>>,
    pub bookings: Arc<BookingService<S, B, C, P, N>>,
    pub bulk: Arc<BulkCalendarService<S>>,
}

impl<S, B, C, P, N> Clone for ReservationApi<S, B, C, P, N> {
    fn clone(&self) -> Self {
        Self {
            availability: self.availability.clone(),
            holds: self.holds.clone(),
            bookings: self.bookings.clone(),
            bulk: self.bulk.clone(),
        }
    }
}

/// Router builder exposing the calendar, hold, and booking endpoints.
pub fn reservation_router<S, B, C, P, N>(api: ReservationApi<S, B, C, P, N>) -> Router
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    Router::new()
        .route(
            "/api/v1/listings/:listing_id/calendar",
            get(calendar_handler::<S, B, C, P, N>),
        )
        .route(
            "/api/v1/listings/:listing_id/calendar/stats",
            get(stats_handler::<S, B, C, P, N>),
        )
        .route(
            "/api/v1/listings/:listing_id/calendar/bulk",
            post(bulk_handler::<S, B, C, P, N>),
        )
        .route(
            "/api/v1/listings/:listing_id/calendar/quick-actions",
            post(quick_action_handler::<S, B, C, P, N>),
        )
        .route(
            "/api/v1/listings/:listing_id/quote",
            post(quote_handler::<S, B, C, P, N>),
        )
        .route("/api/v1/holds", post(create_hold_handler::<S, B, C, P, N>))
        .route(
            "/api/v1/holds/release",
            post(release_hold_handler::<S, B, C, P, N>),
        )
        .route(
            "/api/v1/bookings",
            post(create_booking_handler::<S, B, C, P, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id",
            get(get_booking_handler::<S, B, C, P, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id/payment",
            post(payment_handler::<S, B, C, P, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id/cancel",
            post(cancel_booking_handler::<S, B, C, P, N>),
        )
        .route(
            "/api/v1/bookings/:booking_id/complete",
            post(complete_booking_handler::<S, B, C, P, N>),
        )
        .with_state(api)
}

#[derive(Debug, Deserialize)]
pub(crate) struct WindowQuery {
    start: NaiveDate,
    end: NaiveDate,
}

async fn calendar_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    Path(listing_id): Path<String>,
    Query(window): Query<WindowQuery>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    let listing = ListingId(listing_id);
    match api
        .availability
        .get_range(&listing, window.start, window.end)
    {
        Ok(days) => (StatusCode::OK, axum::Json(json!({ "days": days }))).into_response(),
        Err(error) => query_error_response(error),
    }
}

async fn stats_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    Path(listing_id): Path<String>,
    Query(window): Query<WindowQuery>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    let listing = ListingId(listing_id);
    match api
        .availability
        .compute_stats(&listing, window.start, window.end)
    {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => query_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkEditBody {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    #[serde(default)]
    dates: Vec<NaiveDate>,
    #[serde(flatten)]
    patch: DayPatch,
}

async fn bulk_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    Path(listing_id): Path<String>,
    axum::Json(body): axum::Json<BulkEditBody>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    let listing = ListingId(listing_id);
    let result = if !body.dates.is_empty() {
        api.bulk.apply_dates(&listing, body.dates, &body.patch)
    } else {
        match (body.start, body.end) {
            (Some(start), Some(end)) => api.bulk.apply_range(&listing, start, end, &body.patch),
            _ => {
                return error_payload(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    &"bulk edit requires either dates or a start/end window",
                );
            }
        }
    };
    match result {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => bulk_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub(crate) enum QuickAction {
    BlockWeekends,
    Unblock,
    BoostPricing { factor: f64, cap: f64 },
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuickActionBody {
    start: NaiveDate,
    end: NaiveDate,
    #[serde(flatten)]
    action: QuickAction,
}

async fn quick_action_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    Path(listing_id): Path<String>,
    axum::Json(body): axum::Json<QuickActionBody>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    let listing = ListingId(listing_id);
    let result = match body.action {
        QuickAction::BlockWeekends => api.bulk.block_weekends(&listing, body.start, body.end),
        QuickAction::Unblock => api.bulk.unblock(&listing, body.start, body.end),
        QuickAction::BoostPricing { factor, cap } => api
            .bulk
            .boost_pricing(&listing, body.start, body.end, factor, cap),
    };
    match result {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => bulk_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteBody {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

async fn quote_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    Path(listing_id): Path<String>,
    axum::Json(body): axum::Json<QuoteBody>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    let listing = ListingId(listing_id);
    match api.bookings.quote(&listing, body.check_in, body.check_out) {
        Ok(quote) => (StatusCode::OK, axum::Json(quote)).into_response(),
        Err(error) => booking_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateHoldBody {
    listing_id: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    holder_id: String,
    ttl_minutes: Option<i64>,
}

async fn create_hold_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    axum::Json(body): axum::Json<CreateHoldBody>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    let listing = ListingId(body.listing_id);
    let holder = HolderId(body.holder_id);
    match api.holds.reserve(
        &listing,
        body.check_in,
        body.check_out,
        &holder,
        body.ttl_minutes,
    ) {
        Ok(hold) => (StatusCode::CREATED, axum::Json(hold)).into_response(),
        Err(error) => hold_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReleaseHoldBody {
    listing_id: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    holder_id: String,
}

async fn release_hold_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    axum::Json(body): axum::Json<ReleaseHoldBody>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    let listing = ListingId(body.listing_id);
    let holder = HolderId(body.holder_id);
    match api
        .holds
        .release(&listing, body.check_in, body.check_out, &holder)
    {
        Ok(released) => {
            (StatusCode::OK, axum::Json(json!({ "released": released }))).into_response()
        }
        Err(error) => hold_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateBookingBody {
    listing_id: String,
    guest_id: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: u32,
    payment_method: PaymentMethod,
    special_requests: Option<String>,
    hold_id: Option<Uuid>,
    holder_id: Option<String>,
}

async fn create_booking_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    axum::Json(body): axum::Json<CreateBookingBody>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    let request = BookingRequest {
        listing_id: ListingId(body.listing_id),
        guest_id: GuestId(body.guest_id),
        check_in: body.check_in,
        check_out: body.check_out,
        guests: body.guests,
        payment_method: body.payment_method,
        special_requests: body.special_requests,
        hold_id: body.hold_id.map(HoldId),
        holder_id: body.holder_id.map(HolderId),
    };
    match api.bookings.create_booking(request) {
        Ok(booking) => (StatusCode::CREATED, axum::Json(booking)).into_response(),
        Err(error) => booking_error_response(error),
    }
}

async fn get_booking_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    Path(booking_id): Path<Uuid>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    match api.bookings.get(BookingId(booking_id)) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking)).into_response(),
        Err(error) => booking_error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentBody {
    method_token: String,
}

async fn payment_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    Path(booking_id): Path<Uuid>,
    axum::Json(body): axum::Json<PaymentBody>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    let details = PaymentDetails {
        method_token: body.method_token,
    };
    match api.bookings.process_payment(BookingId(booking_id), &details) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking)).into_response(),
        Err(error) => booking_error_response(error),
    }
}

async fn cancel_booking_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    Path(booking_id): Path<Uuid>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    match api.bookings.cancel(BookingId(booking_id)) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking)).into_response(),
        Err(error) => booking_error_response(error),
    }
}

async fn complete_booking_handler<S, B, C, P, N>(
    State(api): State<ReservationApi<S, B, C, P, N>>,
    Path(booking_id): Path<Uuid>,
) -> Response
where
    S: AvailabilityStore + 'static,
    B: BookingRepository + 'static,
    C: ListingCatalog + 'static,
    P: PaymentProcessor + 'static,
    N: NotificationSender + 'static,
{
    match api.bookings.complete(BookingId(booking_id)) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking)).into_response(),
        Err(error) => booking_error_response(error),
    }
}

fn query_error_response(error: QueryError) -> Response {
    match error {
        QueryError::InvalidRange(_) | QueryError::WindowTooLarge { .. } => {
            error_payload(StatusCode::UNPROCESSABLE_ENTITY, &error)
        }
        QueryError::Store(_) => error_payload(StatusCode::INTERNAL_SERVER_ERROR, &error),
    }
}

fn hold_error_response(error: HoldError) -> Response {
    match &error {
        HoldError::InvalidRange(_) | HoldError::InvalidTtl => {
            error_payload(StatusCode::UNPROCESSABLE_ENTITY, &error)
        }
        HoldError::Conflict { date } => {
            let payload = json!({
                "error": error.to_string(),
                "date": date,
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        HoldError::Expired => error_payload(StatusCode::GONE, &error),
        HoldError::Store(_) => error_payload(StatusCode::INTERNAL_SERVER_ERROR, &error),
    }
}

fn bulk_error_response(error: BulkError) -> Response {
    match error {
        BulkError::InvalidRange(_)
        | BulkError::InvalidModifier(_)
        | BulkError::ReservedNotSettable => error_payload(StatusCode::UNPROCESSABLE_ENTITY, &error),
        BulkError::Store(_) => error_payload(StatusCode::INTERNAL_SERVER_ERROR, &error),
    }
}

fn booking_error_response(error: BookingError) -> Response {
    match &error {
        BookingError::InvalidRange(_)
        | BookingError::MinStay(_)
        | BookingError::Validation(_)
        | BookingError::TooManyGuests { .. }
        | BookingError::MissingHold => error_payload(StatusCode::UNPROCESSABLE_ENTITY, &error),
        BookingError::UnknownListing(_) | BookingError::NotFound(_) => {
            error_payload(StatusCode::NOT_FOUND, &error)
        }
        BookingError::Conflict { date } => {
            let payload = json!({
                "error": error.to_string(),
                "date": date,
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        BookingError::InvalidTransition { .. } => error_payload(StatusCode::CONFLICT, &error),
        BookingError::HoldExpired => error_payload(StatusCode::GONE, &error),
        BookingError::PaymentDeclined { .. } => {
            error_payload(StatusCode::PAYMENT_REQUIRED, &error)
        }
        BookingError::Catalog(_)
        | BookingError::Payment(_)
        | BookingError::Repository(_)
        | BookingError::Store(_) => error_payload(StatusCode::INTERNAL_SERVER_ERROR, &error),
    }
}

fn error_payload(status: StatusCode, error: &dyn std::fmt::Display) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
