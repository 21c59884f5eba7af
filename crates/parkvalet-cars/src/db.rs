use rusqlite::Connection;

use crate::error::Result;

/// Initialise the cars table and its owner index.
///
/// Safe to call on every startup: uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS cars (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL,
            registration  TEXT NOT NULL,
            vehicle_type  TEXT NOT NULL,
            created_at    TEXT NOT NULL,
            UNIQUE(user_id, registration)
        );
        CREATE INDEX IF NOT EXISTS idx_cars_user
            ON cars(user_id, created_at);",
    )?;
    Ok(())
}
