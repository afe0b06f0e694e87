//! Per-route authorization rules.
//!
//! The route table decides which requests the authenticator gates; the
//! decision functions run inside handlers once the principal is known and
//! before any store call.

use actix_web::http::Method;

use crate::auth::token::Principal;
use crate::db::models::{Booking, NewBooking};
use crate::error::AppError;

pub const ACT_FOR_OTHERS_DENIED: &str = "cannot act on behalf of another identity";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Open to anonymous callers
    Public,
    /// Requires a verified session token
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ServiceInfo,
    HealthCheck,
    RegisterUser,
    Login,
    Logout,
    LatestVehicles,
    ReadVehicle,
    SearchVehicles,
    CreateVehicle,
    DeleteVehicle,
    ListBookings,
    CreateBooking,
    CancelBooking,
}

impl Operation {
    /// Maps a request line onto an operation. Path parameters are not
    /// validated here; handlers reject malformed identifiers.
    pub fn resolve(method: &Method, path: &str) -> Option<Operation> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let method = if *method == Method::HEAD { Method::GET } else { method.clone() };

        let op = match (method.as_str(), segments.as_slice()) {
            ("GET", []) => Operation::ServiceInfo,
            ("GET", ["health"]) => Operation::HealthCheck,
            ("POST", ["users"]) => Operation::RegisterUser,
            ("POST", ["login"]) => Operation::Login,
            ("POST", ["logout"]) => Operation::Logout,
            ("GET", ["vehicles"]) => Operation::LatestVehicles,
            ("GET", ["vehicles", _]) => Operation::ReadVehicle,
            ("GET", ["allVehicles"]) => Operation::SearchVehicles,
            ("POST", ["vehicles"]) => Operation::CreateVehicle,
            ("DELETE", ["vehicles", _]) => Operation::DeleteVehicle,
            ("GET", ["bookings"]) => Operation::ListBookings,
            ("POST", ["bookings"]) => Operation::CreateBooking,
            ("DELETE", ["bookings", _]) => Operation::CancelBooking,
            _ => return None,
        };
        Some(op)
    }

    pub fn access(self) -> Access {
        match self {
            Operation::ServiceInfo
            | Operation::HealthCheck
            | Operation::RegisterUser
            | Operation::Login
            | Operation::Logout
            | Operation::LatestVehicles
            | Operation::ReadVehicle
            | Operation::SearchVehicles => Access::Public,
            Operation::CreateVehicle
            | Operation::DeleteVehicle
            | Operation::ListBookings
            | Operation::CreateBooking
            | Operation::CancelBooking => Access::Authenticated,
        }
    }
}

/// Access required for a request. Requests that match no known operation are
/// gated, so a route added without a table entry is never anonymous.
pub fn required_access(method: &Method, path: &str) -> Access {
    Operation::resolve(method, path)
        .map(Operation::access)
        .unwrap_or(Access::Authenticated)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub allow: bool,
    pub reason: &'static str,
}

impl AuthorizationDecision {
    pub fn allow() -> Self {
        Self { allow: true, reason: "" }
    }

    pub fn deny(reason: &'static str) -> Self {
        Self { allow: false, reason }
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.allow {
            Ok(())
        } else {
            Err(AppError::forbidden(self.reason))
        }
    }
}

/// A booking may only be created under the caller's own identity.
pub fn authorize_booking_create(principal: &Principal, booking: &NewBooking) -> AuthorizationDecision {
    if booking.user_email == principal.email {
        AuthorizationDecision::allow()
    } else {
        AuthorizationDecision::deny(ACT_FOR_OTHERS_DENIED)
    }
}

/// Only the owner of a booking may cancel it.
pub fn authorize_booking_cancel(principal: &Principal, booking: &Booking) -> AuthorizationDecision {
    if booking.user_email == principal.email {
        AuthorizationDecision::allow()
    } else {
        AuthorizationDecision::deny(ACT_FOR_OTHERS_DENIED)
    }
}

/// Listings carry no owner; any authenticated principal may create or delete.
pub fn authorize_vehicle_write(_principal: &Principal) -> AuthorizationDecision {
    AuthorizationDecision::allow()
}

/// Filter applied to `GET /bookings`. It is derived from the principal only;
/// caller-supplied filters are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingScope {
    pub user_email: String,
}

pub fn booking_list_scope(principal: &Principal) -> BookingScope {
    BookingScope {
        user_email: principal.email.clone(),
    }
}
