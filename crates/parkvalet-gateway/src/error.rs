use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use parkvalet_cars::CarError;
use parkvalet_parking::ParkingError;
use parkvalet_reservations::ReservationError;
use parkvalet_users::UserError;

/// Error returned by every handler, rendered as `{"error": .., "code": ..}`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "login required: send the session cookie or 'Authorization: Bearer <token>'",
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
    }

    /// Storage failures: logged in full, reported without detail.
    fn internal(source: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %source, "request failed on storage");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "internal error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message, "code": self.code }));
        (self.status, body).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound(_) => Self::not_found(e.to_string()),
            UserError::AlreadyExists(_) => {
                Self::new(StatusCode::CONFLICT, "ALREADY_EXISTS", e.to_string())
            }
            UserError::InvalidInput(_) => Self::bad_request(e.to_string()),
            UserError::InvalidCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", e.to_string())
            }
            UserError::InvalidSession => Self::unauthorized(),
            UserError::ExpiryOutOfRange
            | UserError::PasswordHash(_)
            | UserError::DatabaseError(_) => Self::internal(&e),
        }
    }
}

impl From<CarError> for ApiError {
    fn from(e: CarError) -> Self {
        match e {
            CarError::NotFound(_) => Self::not_found(e.to_string()),
            CarError::AlreadyExists(_) => {
                Self::new(StatusCode::CONFLICT, "ALREADY_EXISTS", e.to_string())
            }
            CarError::InvalidInput(_) => Self::bad_request(e.to_string()),
            CarError::Database(_) => Self::internal(&e),
        }
    }
}

impl From<ReservationError> for ApiError {
    fn from(e: ReservationError) -> Self {
        match e {
            ReservationError::NotFound(_) => Self::not_found(e.to_string()),
            ReservationError::InvalidInput(_) => Self::bad_request(e.to_string()),
            ReservationError::MalformedTimestamp { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "MALFORMED_TIMESTAMP",
                e.to_string(),
            ),
            ReservationError::ArrivalNotRecorded(_) => {
                Self::new(StatusCode::CONFLICT, "ARRIVAL_NOT_RECORDED", e.to_string())
            }
            ReservationError::StayClosed(_) => {
                Self::new(StatusCode::CONFLICT, "STAY_CLOSED", e.to_string())
            }
            ReservationError::DepartureBeforeArrival { .. } => Self::new(
                StatusCode::CONFLICT,
                "DEPARTURE_BEFORE_ARRIVAL",
                e.to_string(),
            ),
            ReservationError::Database(_) => Self::internal(&e),
        }
    }
}

impl From<ParkingError> for ApiError {
    fn from(e: ParkingError) -> Self {
        match e {
            ParkingError::NotFound(_) | ParkingError::SpotNotFound { .. } => {
                Self::not_found(e.to_string())
            }
            ParkingError::AlreadyExists(_) => {
                Self::new(StatusCode::CONFLICT, "ALREADY_EXISTS", e.to_string())
            }
            ParkingError::InvalidDimensions { .. }
            | ParkingError::TooManySpots { .. }
            | ParkingError::InvalidInput(_) => Self::bad_request(e.to_string()),
            ParkingError::Layout(_) | ParkingError::Database(_) => Self::internal(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (UserError::AlreadyExists("a".into()).into(), StatusCode::CONFLICT),
            (UserError::InvalidCredentials.into(), StatusCode::UNAUTHORIZED),
            (UserError::InvalidSession.into(), StatusCode::UNAUTHORIZED),
            (CarError::NotFound("c".into()).into(), StatusCode::NOT_FOUND),
            (
                ReservationError::MalformedTimestamp {
                    field: "planned_arrival",
                    value: "x".into(),
                }
                .into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ReservationError::StayClosed("r".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                ReservationError::DepartureBeforeArrival {
                    id: "r".into(),
                    arrival: "2025-01-01T10:00:00Z".into(),
                    departure: "2025-01-01T09:00:00Z".into(),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                UserError::ExpiryOutOfRange.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ParkingError::InvalidDimensions { rows: 0, cols: 1 }.into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ParkingError::Database(rusqlite::Error::InvalidQuery).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status, status, "{}", err.message);
        }
    }

    #[test]
    fn storage_detail_is_not_leaked() {
        let err: ApiError = CarError::Database(rusqlite::Error::InvalidQuery).into();
        assert_eq!(err.message, "internal error");
        assert_eq!(err.code, "INTERNAL_ERROR");
    }
}
