use rusqlite::Connection;

use crate::error::Result;

/// Initialise the parking_lots table. The layout is a JSON array of spots.
///
/// Safe to call on every startup: uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS parking_lots (
            id          TEXT PRIMARY KEY,
            city        TEXT NOT NULL,
            name        TEXT NOT NULL,
            layout      TEXT NOT NULL DEFAULT '[]',
            created_at  TEXT NOT NULL,
            UNIQUE(city, name)
        );",
    )?;
    Ok(())
}
