use chrono::{Local, NaiveDate};
use clap::Args;

use crate::config::BookingConfig;
use crate::error::AppError;
use crate::infra::{build_engine, parse_date};
use crate::reservations::{
    BookingRequest, GuestId, HolderId, ListingId, ListingProfile, PaymentDetails, PaymentMethod,
};

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Check-in date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) check_in: Option<NaiveDate>,
    /// Check-out date (YYYY-MM-DD). Defaults to check-in + 3 nights.
    #[arg(long, value_parser = parse_date)]
    pub(crate) check_out: Option<NaiveDate>,
    /// Base nightly price in cents for the demo listing.
    #[arg(long, default_value_t = 12000)]
    pub(crate) base_price_cents: i64,
    /// Weekend price boost factor applied before quoting.
    #[arg(long, default_value_t = 1.2)]
    pub(crate) boost_factor: f64,
}

/// Walks the full guest flow against an in-memory calendar: boost pricing,
/// quote, hold, book by card, settle payment.
pub(crate) fn run_quote_demo(args: QuoteArgs) -> Result<(), AppError> {
    let check_in = args.check_in.unwrap_or_else(|| Local::now().date_naive());
    let check_out = args
        .check_out
        .unwrap_or_else(|| check_in + chrono::Duration::days(3));

    let booking_config = BookingConfig {
        hold_ttl_minutes: 15,
        sweep_interval_secs: 0,
        max_window_days: 370,
    };
    let engine = build_engine(&booking_config);
    let listing = ListingId("demo-loft".to_string());
    engine.catalog.insert(ListingProfile {
        id: listing.clone(),
        base_price_cents: args.base_price_cents,
        max_guests: 4,
    });

    println!("Reservation engine demo: {listing} from {check_in} to {check_out}");

    let boosted = engine
        .api
        .bulk
        .boost_pricing(&listing, check_in, check_out, args.boost_factor, 2.0)
        .map_err(|err| AppError::Cli(err.to_string()))?;
    println!(
        "Boosted pricing on {} day(s) by {:.2}x",
        boosted.updated, args.boost_factor
    );

    let quote = engine
        .api
        .bookings
        .quote(&listing, check_in, check_out)
        .map_err(|err| AppError::Cli(err.to_string()))?;
    for night in &quote.nightly {
        println!(
            "  {}  {}  {}",
            night.date,
            night.status.label(),
            format_dollars(night.price_cents)
        );
    }
    println!(
        "Total for {} night(s): {}",
        quote.nights,
        format_dollars(quote.total_cents)
    );

    let holder = HolderId("demo-session".to_string());
    let hold = engine
        .api
        .holds
        .reserve(&listing, check_in, check_out, &holder, None)
        .map_err(|err| AppError::Cli(err.to_string()))?;
    println!("Held {} night(s) until {}", quote.nights, hold.expires_at);

    let booking = engine
        .api
        .bookings
        .create_booking(BookingRequest {
            listing_id: listing.clone(),
            guest_id: GuestId("demo-guest".to_string()),
            check_in,
            check_out,
            guests: 2,
            payment_method: PaymentMethod::Card,
            special_requests: None,
            hold_id: Some(hold.id),
            holder_id: Some(holder),
        })
        .map_err(|err| AppError::Cli(err.to_string()))?;
    println!("Created booking {} ({})", booking.id, booking.status.label());

    let settled = engine
        .api
        .bookings
        .process_payment(
            booking.id,
            &PaymentDetails {
                method_token: "tok_demo".to_string(),
            },
        )
        .map_err(|err| AppError::Cli(err.to_string()))?;
    println!(
        "Payment settled; booking {} is now {} for {}",
        settled.id,
        settled.status.label(),
        format_dollars(settled.total_amount_cents)
    );

    Ok(())
}

fn format_dollars(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, (cents % 100).abs())
}
