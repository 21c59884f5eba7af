use rusqlite::Connection;

use crate::error::Result;

/// Initialise the reservations and stays tables.
///
/// Safe to call on every startup: uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS reservations (
            id                TEXT PRIMARY KEY,
            lot_id            TEXT NOT NULL,
            spot_id           TEXT NOT NULL,
            car_id            TEXT,
            status            TEXT NOT NULL DEFAULT 'booked',
            reserved_at       TEXT NOT NULL,
            planned_arrival   TEXT NOT NULL,
            planned_departure TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_reservations_lot
            ON reservations(lot_id);
        CREATE INDEX IF NOT EXISTS idx_reservations_spot
            ON reservations(spot_id);
        CREATE INDEX IF NOT EXISTS idx_reservations_car
            ON reservations(car_id);

        -- at most one stay per reservation
        CREATE TABLE IF NOT EXISTS stays (
            reservation_id   TEXT PRIMARY KEY
                             REFERENCES reservations(id) ON DELETE CASCADE,
            actual_arrival   TEXT,
            actual_departure TEXT
        );",
    )?;
    Ok(())
}
