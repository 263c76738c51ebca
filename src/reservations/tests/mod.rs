mod common;

mod bookings;
mod bulk;
mod pricing;
