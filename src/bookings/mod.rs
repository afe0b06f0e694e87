//! Bookings: every route is gated and scoped to the caller's identity.

pub mod handlers;
