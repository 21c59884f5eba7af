use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, instrument};

use parkvalet_core::config::ParkingConfig;
use parkvalet_core::types::{new_id, now_rfc3339, random_id};

use crate::category::CategoryMap;
use crate::error::{ParkingError, Result};
use crate::layout::generate_layout;
use crate::types::{LotUpdate, ParkingLot, Spot, SpotDraft, SpotUpdate};

const LOT_SELECT_SQL: &str = "SELECT id, city, name, layout, created_at FROM parking_lots";

/// Thread-safe manager for parking lots and the spots in their layouts.
///
/// Layouts live in a JSON text column; every spot mutation rewrites it.
pub struct ParkingManager {
    db: Mutex<Connection>,
    categories: CategoryMap,
    limits: ParkingConfig,
}

impl ParkingManager {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection, categories: CategoryMap, limits: ParkingConfig) -> Self {
        Self {
            db: Mutex::new(conn),
            categories,
            limits,
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    /// Create a lot with a generated `rows x cols` layout. Missing dimensions
    /// fall back to the configured defaults.
    #[instrument(skip(self))]
    pub fn create_lot(
        &self,
        city: &str,
        name: &str,
        rows: Option<u32>,
        cols: Option<u32>,
    ) -> Result<ParkingLot> {
        if city.trim().is_empty() || name.trim().is_empty() {
            return Err(ParkingError::InvalidInput(
                "city and name are required".to_string(),
            ));
        }
        let rows = rows.unwrap_or(self.limits.default_rows);
        let cols = cols.unwrap_or(self.limits.default_cols);
        let layout = generate_layout(
            rows,
            cols,
            self.limits.max_spots,
            &self.categories,
            &mut rand::thread_rng(),
        )?;

        let db = self.conn();
        if find_by_city_and_name(&db, city, name)?.is_some() {
            return Err(ParkingError::AlreadyExists(format!("{city}/{name}")));
        }

        let lot = ParkingLot {
            id: new_id(),
            city: city.to_string(),
            name: name.to_string(),
            layout,
            created_at: now_rfc3339(),
        };
        db.execute(
            "INSERT INTO parking_lots (id, city, name, layout, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                lot.id,
                lot.city,
                lot.name,
                serde_json::to_string(&lot.layout)?,
                lot.created_at
            ],
        )?;
        info!(lot_id = %lot.id, spots = lot.layout.len(), "parking lot created");
        Ok(lot)
    }

    #[instrument(skip(self))]
    pub fn get_lot(&self, lot_id: &str) -> Result<Option<ParkingLot>> {
        get_row(&self.conn(), lot_id)
    }

    #[instrument(skip(self))]
    pub fn find_by_city_and_name(&self, city: &str, name: &str) -> Result<Option<ParkingLot>> {
        find_by_city_and_name(&self.conn(), city, name)
    }

    /// All lots ordered by city, then name.
    #[instrument(skip(self))]
    pub fn list_lots(&self) -> Result<Vec<ParkingLot>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!("{LOT_SELECT_SQL} ORDER BY city, name"))?;
        let rows = stmt.query_map([], raw_row)?;
        let lots = rows
            .map(|row| decode(row?))
            .collect::<Result<Vec<_>>>()?;
        Ok(lots)
    }

    /// Rename or move a lot. The layout is untouched.
    #[instrument(skip(self, update))]
    pub fn update_lot(&self, lot_id: &str, update: &LotUpdate) -> Result<ParkingLot> {
        let db = self.conn();
        let mut lot = get_row(&db, lot_id)?.ok_or_else(|| ParkingError::NotFound(lot_id.to_string()))?;
        if let Some(city) = &update.city {
            lot.city = city.clone();
        }
        if let Some(name) = &update.name {
            lot.name = name.clone();
        }
        if lot.city.trim().is_empty() || lot.name.trim().is_empty() {
            return Err(ParkingError::InvalidInput(
                "city and name must not be empty".to_string(),
            ));
        }
        if let Some(other) = find_by_city_and_name(&db, &lot.city, &lot.name)? {
            if other.id != lot.id {
                return Err(ParkingError::AlreadyExists(format!("{}/{}", lot.city, lot.name)));
            }
        }
        db.execute(
            "UPDATE parking_lots SET city = ?2, name = ?3 WHERE id = ?1",
            params![lot.id, lot.city, lot.name],
        )?;
        debug!("parking lot updated");
        Ok(lot)
    }

    #[instrument(skip(self))]
    pub fn delete_lot(&self, lot_id: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute("DELETE FROM parking_lots WHERE id = ?1", params![lot_id])?;
        if rows == 0 {
            return Err(ParkingError::NotFound(lot_id.to_string()));
        }
        info!(lot_id, "parking lot deleted");
        Ok(())
    }

    /// The lot's whole layout.
    #[instrument(skip(self))]
    pub fn list_spots(&self, lot_id: &str) -> Result<Vec<Spot>> {
        Ok(self.require_lot(lot_id)?.layout)
    }

    #[instrument(skip(self))]
    pub fn get_spot(&self, lot_id: &str, spot_id: &str) -> Result<Option<Spot>> {
        Ok(self
            .require_lot(lot_id)?
            .layout
            .into_iter()
            .find(|s| s.id == spot_id))
    }

    /// Spots whose category matches that of `vehicle_type`, ignoring occupancy.
    #[instrument(skip(self))]
    pub fn spots_for_vehicle_type(&self, lot_id: &str, vehicle_type: &str) -> Result<Vec<Spot>> {
        let wanted = self.categories.categorize(vehicle_type);
        Ok(self
            .require_lot(lot_id)?
            .layout
            .into_iter()
            .filter(|s| s.category == wanted)
            .collect())
    }

    /// Append a spot. Its position must be free within the layout.
    #[instrument(skip(self, draft))]
    pub fn add_spot(&self, lot_id: &str, draft: &SpotDraft) -> Result<Spot> {
        let db = self.conn();
        let mut lot = get_row(&db, lot_id)?.ok_or_else(|| ParkingError::NotFound(lot_id.to_string()))?;
        if lot.layout.len() >= self.limits.max_spots as usize {
            return Err(ParkingError::TooManySpots {
                requested: lot.layout.len() as u64 + 1,
                max: self.limits.max_spots,
            });
        }
        if lot.layout.iter().any(|s| s.position == draft.position) {
            return Err(ParkingError::AlreadyExists(format!(
                "spot at row {} col {}",
                draft.position.row, draft.position.col
            )));
        }
        let spot = Spot {
            id: random_id(),
            position: draft.position,
            category: self.categories.categorize(&draft.vehicle_type),
        };
        lot.layout.push(spot.clone());
        store_layout(&db, &lot)?;
        debug!(spot_id = %spot.id, "spot added");
        Ok(spot)
    }

    /// Move a spot and/or re-derive its category from a new vehicle type.
    #[instrument(skip(self, update))]
    pub fn update_spot(&self, lot_id: &str, spot_id: &str, update: &SpotUpdate) -> Result<Spot> {
        let db = self.conn();
        let mut lot = get_row(&db, lot_id)?.ok_or_else(|| ParkingError::NotFound(lot_id.to_string()))?;
        if let Some(position) = update.position {
            if lot.layout.iter().any(|s| s.position == position && s.id != spot_id) {
                return Err(ParkingError::AlreadyExists(format!(
                    "spot at row {} col {}",
                    position.row, position.col
                )));
            }
        }
        let spot = lot
            .layout
            .iter_mut()
            .find(|s| s.id == spot_id)
            .ok_or_else(|| ParkingError::SpotNotFound {
                lot_id: lot_id.to_string(),
                spot_id: spot_id.to_string(),
            })?;
        if let Some(position) = update.position {
            spot.position = position;
        }
        if let Some(raw) = &update.vehicle_type {
            spot.category = self.categories.categorize(raw);
        }
        let updated = spot.clone();
        store_layout(&db, &lot)?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub fn remove_spot(&self, lot_id: &str, spot_id: &str) -> Result<()> {
        let db = self.conn();
        let mut lot = get_row(&db, lot_id)?.ok_or_else(|| ParkingError::NotFound(lot_id.to_string()))?;
        let before = lot.layout.len();
        lot.layout.retain(|s| s.id != spot_id);
        if lot.layout.len() == before {
            return Err(ParkingError::SpotNotFound {
                lot_id: lot_id.to_string(),
                spot_id: spot_id.to_string(),
            });
        }
        store_layout(&db, &lot)?;
        debug!(spot_id, "spot removed");
        Ok(())
    }

    fn require_lot(&self, lot_id: &str) -> Result<ParkingLot> {
        self.get_lot(lot_id)?
            .ok_or_else(|| ParkingError::NotFound(lot_id.to_string()))
    }
}

/// Columns of LOT_SELECT_SQL with the layout still encoded.
type RawLot = (String, String, String, String, String);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawLot> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode((id, city, name, layout, created_at): RawLot) -> Result<ParkingLot> {
    Ok(ParkingLot {
        id,
        city,
        name,
        layout: serde_json::from_str(&layout)?,
        created_at,
    })
}

fn get_row(db: &Connection, lot_id: &str) -> Result<Option<ParkingLot>> {
    db.query_row(
        &format!("{LOT_SELECT_SQL} WHERE id = ?1"),
        params![lot_id],
        raw_row,
    )
    .optional()?
    .map(decode)
    .transpose()
}

fn find_by_city_and_name(db: &Connection, city: &str, name: &str) -> Result<Option<ParkingLot>> {
    db.query_row(
        &format!("{LOT_SELECT_SQL} WHERE city = ?1 AND name = ?2"),
        params![city, name],
        raw_row,
    )
    .optional()?
    .map(decode)
    .transpose()
}

fn store_layout(db: &Connection, lot: &ParkingLot) -> Result<()> {
    db.execute(
        "UPDATE parking_lots SET layout = ?2 WHERE id = ?1",
        params![lot.id, serde_json::to_string(&lot.layout)?],
    )?;
    Ok(())
}
