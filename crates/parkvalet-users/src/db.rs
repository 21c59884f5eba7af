use rusqlite::{Connection, Result};

use crate::types::User;

pub(crate) const USER_SELECT_SQL: &str =
    "SELECT id, username, email, password_hash, created_at, updated_at FROM users";

/// Map a SELECT row (column order from USER_SELECT_SQL) to a User.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Initialise all tables for the accounts subsystem. Safe to call on every
/// startup: CREATE IF NOT EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_users_table(conn)?;
    create_sessions_table(conn)?;
    Ok(())
}

fn create_users_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY NOT NULL,
            username      TEXT NOT NULL UNIQUE,
            email         TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );",
    )
}

fn create_sessions_table(conn: &Connection) -> Result<()> {
    // token_hash is hex(sha256(token)); the raw token is never stored.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_sessions (
            token_hash  TEXT PRIMARY KEY NOT NULL,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL,
            expires_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_user_sessions_user
            ON user_sessions (user_id);",
    )
}
