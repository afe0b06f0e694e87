use actix_web::{web, HttpResponse};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::auth::policy::authorize_vehicle_write;
use crate::auth::Principal;
use crate::db::models::Vehicle;
use crate::error::AppError;
use crate::vehicles::query::VehicleQuery;
use crate::{parse_id, AppState};

const LATEST_LIMIT: u64 = 6;
const INVALID_ID: &str = "Invalid vehicle ID";
const NOT_FOUND: &str = "Vehicle not found";

pub async fn latest(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let vehicles = state.vehicles.latest_vehicles(LATEST_LIMIT).await?;
    Ok(HttpResponse::Ok().json(vehicles))
}

pub async fn get_vehicle(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, INVALID_ID)?;
    let vehicle = state
        .vehicles
        .find_vehicle(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(HttpResponse::Ok().json(vehicle))
}

pub async fn search(
    query: web::Query<VehicleQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let criteria = query.into_inner().into_search();
    let page = state.vehicles.search_vehicles(&criteria).await?;

    Ok(HttpResponse::Ok().json(json!({
        "vehicles": page.items,
        "totalCount": page.total,
        "currentPage": criteria.page,
        "limit": criteria.limit,
    })))
}

pub async fn create_vehicle(
    principal: Principal,
    body: web::Json<Map<String, Value>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    authorize_vehicle_write(&principal).into_result()?;

    let id = state.vehicles.insert_vehicle(Vehicle::new(body.into_inner())).await?;
    info!(vehicle_id = %id, email = %principal.email, "Vehicle listing created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Vehicle added successfully",
        "insertedId": id,
    })))
}

pub async fn delete_vehicle(
    principal: Principal,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    authorize_vehicle_write(&principal).into_result()?;
    let id = parse_id(&path, INVALID_ID)?;

    if !state.vehicles.delete_vehicle(id).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    info!(vehicle_id = %id, email = %principal.email, "Vehicle listing deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Vehicle deleted successfully" })))
}
