//! Car routes under /api/cars. Every route is scoped to the caller's cars.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use parkvalet_cars::{Car, CarUpdate};

use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RegisterCarRequest {
    pub registration: String,
    #[serde(rename = "type")]
    pub vehicle_type: String,
}

/// GET /api/cars
pub async fn list_cars(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<Vec<Car>>, ApiError> {
    Ok(Json(state.cars.list_for_user(&current.user.id)?))
}

/// POST /api/cars
pub async fn register_car(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<RegisterCarRequest>,
) -> Result<(StatusCode, Json<Car>), ApiError> {
    let car = state
        .cars
        .register(&current.user.id, &req.registration, &req.vehicle_type)?;
    Ok((StatusCode::CREATED, Json(car)))
}

/// GET /api/cars/{id}
pub async fn get_car(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Car>, ApiError> {
    state
        .cars
        .get(&current.user.id, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("car not found: {id}")))
}

/// PUT /api/cars/{id}
pub async fn update_car(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<CarUpdate>,
) -> Result<Json<Car>, ApiError> {
    Ok(Json(state.cars.update(&current.user.id, &id, &update)?))
}

/// DELETE /api/cars/{id}
pub async fn delete_car(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.cars.delete(&current.user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
