//! Parking lot routes under /api/parkings. Reads are public; writes need a login.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use parkvalet_parking::{LotUpdate, ParkingLot};

use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateLotRequest {
    pub city: String,
    pub name: String,
    pub rows: Option<u32>,
    pub cols: Option<u32>,
}

/// GET /api/parkings
pub async fn list_lots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ParkingLot>>, ApiError> {
    Ok(Json(state.parking.list_lots()?))
}

/// POST /api/parkings — generate a lot with a random layout.
pub async fn create_lot(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<CreateLotRequest>,
) -> Result<(StatusCode, Json<ParkingLot>), ApiError> {
    let lot = state
        .parking
        .create_lot(&req.city, &req.name, req.rows, req.cols)?;
    info!(lot_id = %lot.id, by = %current.user.id, "lot generated");
    Ok((StatusCode::CREATED, Json(lot)))
}

/// GET /api/parkings/{id}
pub async fn get_lot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ParkingLot>, ApiError> {
    state
        .parking
        .get_lot(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("parking lot not found: {id}")))
}

/// PUT /api/parkings/{id}
pub async fn update_lot(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<LotUpdate>,
) -> Result<Json<ParkingLot>, ApiError> {
    Ok(Json(state.parking.update_lot(&id, &update)?))
}

/// DELETE /api/parkings/{id} — also drops the lot's reservations.
///
/// Reservations go first: if either step fails the lot is still there and
/// the request can be repeated.
pub async fn delete_lot(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.parking.get_lot(&id)?.is_none() {
        return Err(ApiError::not_found(format!("parking lot not found: {id}")));
    }
    let dropped = state.reservations.delete_for_lot(&id)?;
    state.parking.delete_lot(&id)?;
    info!(lot_id = %id, reservations = dropped, "lot deleted");
    Ok(StatusCode::NO_CONTENT)
}
