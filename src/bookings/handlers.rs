use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, warn};

use crate::auth::policy::{authorize_booking_cancel, authorize_booking_create, booking_list_scope};
use crate::auth::Principal;
use crate::db::models::{Booking, NewBooking};
use crate::error::AppError;
use crate::{parse_id, AppState};

const INVALID_ID: &str = "Invalid booking ID";
const NOT_FOUND: &str = "Booking not found";
pub const ALREADY_BOOKED: &str = "Vehicle already booked";

pub async fn list(
    principal: Principal,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let scope = booking_list_scope(&principal);
    let bookings = state.bookings.bookings_for(&scope.user_email).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

pub async fn create(
    principal: Principal,
    body: web::Json<NewBooking>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let booking = body.into_inner();
    authorize_booking_create(&principal, &booking)
        .into_result()
        .map_err(|e| {
            warn!(email = %principal.email, claimed = %booking.user_email, "Booking for another identity refused");
            e
        })?;

    if booking.vehicle_id.trim().is_empty() {
        return Err(AppError::ValidationError("vehicleId is required".to_string()));
    }

    let vehicle_id = booking.vehicle_id.clone();
    let id = state
        .bookings
        .insert_booking(Booking::from_new(booking))
        .await?
        .ok_or_else(|| AppError::Conflict(ALREADY_BOOKED.to_string()))?;
    info!(booking_id = %id, vehicle_id = %vehicle_id, email = %principal.email, "Booking saved");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Booking saved successfully",
        "bookingId": id,
    })))
}

pub async fn cancel(
    principal: Principal,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, INVALID_ID)?;
    let booking = state
        .bookings
        .find_booking(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;

    authorize_booking_cancel(&principal, &booking).into_result()?;

    if !state.bookings.delete_booking(id).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    info!(booking_id = %id, email = %principal.email, "Booking canceled");

    Ok(HttpResponse::Ok().json(json!({ "message": "Booking canceled successfully" })))
}
