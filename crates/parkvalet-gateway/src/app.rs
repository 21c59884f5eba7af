use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use tracing::info;

use parkvalet_cars::CarManager;
use parkvalet_core::ValetConfig;
use parkvalet_parking::{CategoryMap, ParkingManager};
use parkvalet_reservations::ReservationManager;
use parkvalet_users::AccountManager;

use crate::http;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: ValetConfig,
    pub accounts: AccountManager,
    pub cars: CarManager,
    pub parking: ParkingManager,
    pub reservations: ReservationManager,
}

impl AppState {
    /// Open the SQLite file, run every migration and build the managers.
    /// Each manager gets its own connection to the same file.
    pub fn open(config: ValetConfig) -> anyhow::Result<Self> {
        let db_path = config.database.path.clone();
        info!(path = %db_path, "opening SQLite database");

        let db = open_connection(&db_path)?;
        parkvalet_users::db::init_db(&db)?;
        parkvalet_cars::db::init_db(&db)?;
        parkvalet_reservations::db::init_db(&db)?;
        parkvalet_parking::db::init_db(&db)?;
        info!("database migrations complete");

        let accounts = AccountManager::new(open_connection(&db_path)?, config.session.ttl_hours);
        let cars = CarManager::new(open_connection(&db_path)?);
        let reservations = ReservationManager::new(open_connection(&db_path)?);
        let parking = ParkingManager::new(
            open_connection(&db_path)?,
            CategoryMap::new(config.categories.clone()),
            config.parking.clone(),
        );

        Ok(Self {
            config,
            accounts,
            cars,
            parking,
            reservations,
        })
    }
}

fn open_connection(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")?;
    Ok(conn)
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(http::health::health_handler))
        // accounts
        .route("/api/user/signup", post(http::users::signup))
        .route("/api/user/login", post(http::users::login))
        .route("/api/user/logout", post(http::users::logout))
        .route(
            "/api/user/me",
            get(http::users::me)
                .put(http::users::update_me)
                .delete(http::users::delete_me),
        )
        // cars
        .route(
            "/api/cars",
            get(http::cars::list_cars).post(http::cars::register_car),
        )
        .route(
            "/api/cars/{id}",
            get(http::cars::get_car)
                .put(http::cars::update_car)
                .delete(http::cars::delete_car),
        )
        // reservations
        .route(
            "/api/reservations",
            get(http::reservations::list_reservations)
                .post(http::reservations::create_reservation),
        )
        .route(
            "/api/reservations/{id}",
            get(http::reservations::get_reservation)
                .put(http::reservations::update_reservation)
                .delete(http::reservations::delete_reservation),
        )
        .route(
            "/api/reservations/{id}/cancel",
            post(http::reservations::cancel_reservation),
        )
        .route(
            "/api/reservations/{id}/arrival",
            post(http::reservations::record_arrival),
        )
        .route(
            "/api/reservations/{id}/departure",
            post(http::reservations::record_departure),
        )
        // parking lots and spots
        .route(
            "/api/parkings",
            get(http::parkings::list_lots).post(http::parkings::create_lot),
        )
        .route(
            "/api/parkings/{id}",
            get(http::parkings::get_lot)
                .put(http::parkings::update_lot)
                .delete(http::parkings::delete_lot),
        )
        .route(
            "/api/parkings/{id}/spots",
            get(http::spots::list_spots).post(http::spots::add_spot),
        )
        .route("/api/parkings/{id}/spots/free", get(http::spots::free_in_lot))
        .route(
            "/api/parkings/{id}/spots/{spot_id}",
            get(http::spots::get_spot)
                .put(http::spots::update_spot)
                .delete(http::spots::remove_spot),
        )
        .route("/api/spots/free", get(http::spots::free_all))
        .route("/api/spots/free/{vehicle_type}", get(http::spots::free_all_by_type))
        .route("/api/categories", get(http::categories::categories))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
