//! Reservation routes under /api/reservations.
//!
//! A reservation made for a car is visible only to that car's owner.
//! Responses embed the derived status, computed at request time.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use parkvalet_reservations::{classify, NewReservation, Reservation, ReservationStatus};

use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct ReservationView {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub status: ReservationStatus,
    pub status_label: &'static str,
}

impl ReservationView {
    fn build(reservation: Reservation) -> Result<Self, ApiError> {
        let status = classify(&reservation, Utc::now())?;
        Ok(Self {
            reservation,
            status,
            status_label: status.label(),
        })
    }
}

#[derive(Deserialize)]
pub struct WindowUpdate {
    pub planned_arrival: Option<String>,
    pub planned_departure: Option<String>,
}

/// Body of the arrival/departure routes; `at` defaults to now.
#[derive(Deserialize, Default)]
pub struct StayEvent {
    pub at: Option<String>,
}

/// GET /api/reservations — reservations of every car the caller owns.
pub async fn list_reservations(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<Vec<ReservationView>>, ApiError> {
    let car_ids: Vec<String> = state
        .cars
        .list_for_user(&current.user.id)?
        .into_iter()
        .map(|c| c.id)
        .collect();
    let views = state
        .reservations
        .list_for_cars(&car_ids)?
        .into_iter()
        .map(ReservationView::build)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

/// POST /api/reservations
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(req): Json<NewReservation>,
) -> Result<(StatusCode, Json<ReservationView>), ApiError> {
    if state.parking.get_spot(&req.lot_id, &req.spot_id)?.is_none() {
        return Err(ApiError::not_found(format!(
            "spot {} not found in lot {}",
            req.spot_id, req.lot_id
        )));
    }
    if let Some(car_id) = &req.car_id {
        if state.cars.get(&current.user.id, car_id)?.is_none() {
            return Err(ApiError::not_found(format!("car not found: {car_id}")));
        }
    }
    let reservation = state.reservations.create(&req)?;
    Ok((StatusCode::CREATED, Json(ReservationView::build(reservation)?)))
}

/// GET /api/reservations/{id}
pub async fn get_reservation(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ReservationView>, ApiError> {
    let reservation = owned(&state, &current, &id)?;
    Ok(Json(ReservationView::build(reservation)?))
}

/// PUT /api/reservations/{id} — move the planned window.
pub async fn update_reservation(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(update): Json<WindowUpdate>,
) -> Result<Json<ReservationView>, ApiError> {
    owned(&state, &current, &id)?;
    let reservation = state.reservations.update_window(
        &id,
        update.planned_arrival.as_deref(),
        update.planned_departure.as_deref(),
    )?;
    Ok(Json(ReservationView::build(reservation)?))
}

/// DELETE /api/reservations/{id}
pub async fn delete_reservation(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    owned(&state, &current, &id)?;
    state.reservations.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/reservations/{id}/cancel
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ReservationView>, ApiError> {
    owned(&state, &current, &id)?;
    Ok(Json(ReservationView::build(state.reservations.cancel(&id)?)?))
}

/// POST /api/reservations/{id}/arrival
pub async fn record_arrival(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
    body: Option<Json<StayEvent>>,
) -> Result<Json<ReservationView>, ApiError> {
    owned(&state, &current, &id)?;
    let event = body.map(|Json(e)| e).unwrap_or_default();
    let reservation = state.reservations.record_arrival(&id, event.at.as_deref())?;
    Ok(Json(ReservationView::build(reservation)?))
}

/// POST /api/reservations/{id}/departure
pub async fn record_departure(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<String>,
    body: Option<Json<StayEvent>>,
) -> Result<Json<ReservationView>, ApiError> {
    owned(&state, &current, &id)?;
    let event = body.map(|Json(e)| e).unwrap_or_default();
    let reservation = state
        .reservations
        .record_departure(&id, event.at.as_deref())?;
    Ok(Json(ReservationView::build(reservation)?))
}

/// Load a reservation the caller may act on. A reservation tied to someone
/// else's car is reported as missing.
fn owned(state: &AppState, current: &CurrentUser, id: &str) -> Result<Reservation, ApiError> {
    let not_found = || ApiError::not_found(format!("reservation not found: {id}"));
    let reservation = state.reservations.get(id)?.ok_or_else(not_found)?;
    if let Some(car_id) = &reservation.car_id {
        if state.cars.get(&current.user.id, car_id)?.is_none() {
            return Err(not_found());
        }
    }
    Ok(reservation)
}
