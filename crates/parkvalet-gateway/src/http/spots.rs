//! Spot CRUD inside a lot layout, and free-spot queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use parkvalet_parking::{free_spots, free_spots_all_lots, Spot, SpotDraft, SpotUpdate};

use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

/// `?type=<raw vehicle type>`
#[derive(Deserialize)]
pub struct TypeFilter {
    #[serde(rename = "type")]
    pub vehicle_type: Option<String>,
}

/// GET /api/parkings/{id}/spots
pub async fn list_spots(
    State(state): State<Arc<AppState>>,
    Path(lot_id): Path<String>,
    Query(filter): Query<TypeFilter>,
) -> Result<Json<Vec<Spot>>, ApiError> {
    let spots = match filter.vehicle_type.as_deref() {
        Some(raw) => state.parking.spots_for_vehicle_type(&lot_id, raw)?,
        None => state.parking.list_spots(&lot_id)?,
    };
    Ok(Json(spots))
}

/// POST /api/parkings/{id}/spots
pub async fn add_spot(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    Path(lot_id): Path<String>,
    Json(draft): Json<SpotDraft>,
) -> Result<(StatusCode, Json<Spot>), ApiError> {
    let spot = state.parking.add_spot(&lot_id, &draft)?;
    Ok((StatusCode::CREATED, Json(spot)))
}

/// GET /api/parkings/{id}/spots/{spot_id}
pub async fn get_spot(
    State(state): State<Arc<AppState>>,
    Path((lot_id, spot_id)): Path<(String, String)>,
) -> Result<Json<Spot>, ApiError> {
    state
        .parking
        .get_spot(&lot_id, &spot_id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("spot {spot_id} not found in lot {lot_id}")))
}

/// PUT /api/parkings/{id}/spots/{spot_id}
pub async fn update_spot(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    Path((lot_id, spot_id)): Path<(String, String)>,
    Json(update): Json<SpotUpdate>,
) -> Result<Json<Spot>, ApiError> {
    Ok(Json(state.parking.update_spot(&lot_id, &spot_id, &update)?))
}

/// DELETE /api/parkings/{id}/spots/{spot_id}
pub async fn remove_spot(
    State(state): State<Arc<AppState>>,
    _current: CurrentUser,
    Path((lot_id, spot_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.parking.remove_spot(&lot_id, &spot_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/parkings/{id}/spots/free
pub async fn free_in_lot(
    State(state): State<Arc<AppState>>,
    Path(lot_id): Path<String>,
    Query(filter): Query<TypeFilter>,
) -> Result<Json<Vec<Spot>>, ApiError> {
    let lot = state
        .parking
        .get_lot(&lot_id)?
        .ok_or_else(|| ApiError::not_found(format!("parking lot not found: {lot_id}")))?;
    let reservations = state.reservations.list_all()?;
    Ok(Json(free_spots(
        &lot,
        &reservations,
        filter.vehicle_type.as_deref(),
        state.parking.categories(),
    )))
}

/// GET /api/spots/free
pub async fn free_all(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<TypeFilter>,
) -> Result<Json<BTreeMap<String, Vec<Spot>>>, ApiError> {
    free_map(&state, filter.vehicle_type.as_deref()).map(Json)
}

/// GET /api/spots/free/{type}
pub async fn free_all_by_type(
    State(state): State<Arc<AppState>>,
    Path(vehicle_type): Path<String>,
) -> Result<Json<BTreeMap<String, Vec<Spot>>>, ApiError> {
    free_map(&state, Some(&vehicle_type)).map(Json)
}

fn free_map(
    state: &AppState,
    vehicle_type: Option<&str>,
) -> Result<BTreeMap<String, Vec<Spot>>, ApiError> {
    let lots = state.parking.list_lots()?;
    let reservations = state.reservations.list_all()?;
    Ok(free_spots_all_lots(
        &lots,
        &reservations,
        vehicle_type,
        state.parking.categories(),
    ))
}
