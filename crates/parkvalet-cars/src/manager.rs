use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection};
use tracing::{debug, info, instrument};

use parkvalet_core::types::{new_id, now_rfc3339};

use crate::error::{CarError, Result};
use crate::types::{Car, CarUpdate};

const CAR_COLUMNS: &str = "id, user_id, registration, vehicle_type, created_at";

/// Thread-safe manager for registered cars.
///
/// Every lookup is scoped to an owner: a car that exists but belongs to
/// someone else is reported exactly like a missing one.
pub struct CarManager {
    db: Mutex<Connection>,
}

impl CarManager {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a car for `user_id`. The same plate twice for one owner is rejected.
    #[instrument(skip(self))]
    pub fn register(&self, user_id: &str, registration: &str, vehicle_type: &str) -> Result<Car> {
        if registration.trim().is_empty() || vehicle_type.trim().is_empty() {
            return Err(CarError::InvalidInput(
                "registration and type are required".to_string(),
            ));
        }

        let db = self.conn();
        if find_by_registration(&db, user_id, registration)?.is_some() {
            return Err(CarError::AlreadyExists(registration.to_string()));
        }

        let car = Car {
            id: new_id(),
            user_id: user_id.to_string(),
            registration: registration.to_string(),
            vehicle_type: vehicle_type.to_string(),
            created_at: now_rfc3339(),
        };
        db.execute(
            "INSERT INTO cars (id, user_id, registration, vehicle_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                car.id,
                car.user_id,
                car.registration,
                car.vehicle_type,
                car.created_at
            ],
        )?;
        info!(car_id = %car.id, "car registered");
        Ok(car)
    }

    /// Fetch one of `user_id`'s cars.
    #[instrument(skip(self))]
    pub fn get(&self, user_id: &str, car_id: &str) -> Result<Option<Car>> {
        let db = self.conn();
        match db.query_row(
            &format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = ?1 AND user_id = ?2"),
            params![car_id, user_id],
            row_to_car,
        ) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CarError::Database(e)),
        }
    }

    /// All cars of a user, oldest registration first.
    #[instrument(skip(self))]
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<Car>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {CAR_COLUMNS} FROM cars WHERE user_id = ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(params![user_id], row_to_car)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Change plate and/or type of an owned car.
    #[instrument(skip(self, update))]
    pub fn update(&self, user_id: &str, car_id: &str, update: &CarUpdate) -> Result<Car> {
        let mut car = self
            .get(user_id, car_id)?
            .ok_or_else(|| CarError::NotFound(car_id.to_string()))?;

        let db = self.conn();
        if let Some(registration) = &update.registration {
            if registration.trim().is_empty() {
                return Err(CarError::InvalidInput("registration is empty".to_string()));
            }
            if let Some(other) = find_by_registration(&db, user_id, registration)? {
                if other.id != car.id {
                    return Err(CarError::AlreadyExists(registration.clone()));
                }
            }
            car.registration = registration.clone();
        }
        if let Some(vehicle_type) = &update.vehicle_type {
            if vehicle_type.trim().is_empty() {
                return Err(CarError::InvalidInput("type is empty".to_string()));
            }
            car.vehicle_type = vehicle_type.clone();
        }

        db.execute(
            "UPDATE cars SET registration = ?3, vehicle_type = ?4
             WHERE id = ?1 AND user_id = ?2",
            params![car.id, car.user_id, car.registration, car.vehicle_type],
        )?;
        debug!(car_id, "car updated");
        Ok(car)
    }

    /// Delete an owned car.
    #[instrument(skip(self))]
    pub fn delete(&self, user_id: &str, car_id: &str) -> Result<()> {
        let rows = self.conn().execute(
            "DELETE FROM cars WHERE id = ?1 AND user_id = ?2",
            params![car_id, user_id],
        )?;
        if rows == 0 {
            return Err(CarError::NotFound(car_id.to_string()));
        }
        Ok(())
    }

    /// Delete every car of a user (account removal). Returns how many went.
    #[instrument(skip(self))]
    pub fn delete_for_user(&self, user_id: &str) -> Result<usize> {
        let rows = self
            .conn()
            .execute("DELETE FROM cars WHERE user_id = ?1", params![user_id])?;
        Ok(rows)
    }
}

fn find_by_registration(db: &Connection, user_id: &str, registration: &str) -> Result<Option<Car>> {
    match db.query_row(
        &format!("SELECT {CAR_COLUMNS} FROM cars WHERE user_id = ?1 AND registration = ?2"),
        params![user_id, registration],
        row_to_car,
    ) {
        Ok(c) => Ok(Some(c)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(CarError::Database(e)),
    }
}

fn row_to_car(row: &rusqlite::Row<'_>) -> rusqlite::Result<Car> {
    Ok(Car {
        id: row.get(0)?,
        user_id: row.get(1)?,
        registration: row.get(2)?,
        vehicle_type: row.get(3)?,
        created_at: row.get(4)?,
    })
}
