use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};

use parkvalet_core::types::random_id;

use crate::db::row_to_user;
use crate::error::{Result, UserError};
use crate::types::{LoginSession, User};

/// Hex SHA-256 of a session token, the only form the table stores.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Open a session for `user_id` valid for `ttl` from `now`.
pub fn create_session(
    conn: &Connection,
    user_id: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<LoginSession> {
    let token = random_id();
    let expires_at = now
        .checked_add_signed(ttl)
        .ok_or(UserError::ExpiryOutOfRange)?
        .to_rfc3339();
    conn.execute(
        "INSERT INTO user_sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![token_digest(&token), user_id, now.to_rfc3339(), expires_at],
    )?;
    Ok(LoginSession {
        token,
        user_id: user_id.to_string(),
        expires_at,
    })
}

/// Return the user owning `token`. Expired sessions are deleted on sight.
pub fn resolve_session(conn: &Connection, token: &str, now: DateTime<Utc>) -> Result<User> {
    let digest = token_digest(token);
    let row = conn.query_row(
        "SELECT u.id, u.username, u.email, u.password_hash, u.created_at, u.updated_at,
                s.expires_at
         FROM user_sessions s JOIN users u ON u.id = s.user_id
         WHERE s.token_hash = ?1",
        params![digest],
        |row| Ok((row_to_user(row)?, row.get::<_, String>(6)?)),
    );
    let (user, expires_at) = match row {
        Ok(r) => r,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Err(UserError::InvalidSession),
        Err(e) => return Err(UserError::DatabaseError(e)),
    };

    // An unparsable expiry is treated as expired.
    let live = DateTime::parse_from_rfc3339(&expires_at)
        .map(|t| t.with_timezone(&Utc) > now)
        .unwrap_or(false);
    if !live {
        conn.execute(
            "DELETE FROM user_sessions WHERE token_hash = ?1",
            params![digest],
        )?;
        return Err(UserError::InvalidSession);
    }
    Ok(user)
}

/// Drop a session. Revoking an unknown token is not an error.
pub fn revoke_session(conn: &Connection, token: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM user_sessions WHERE token_hash = ?1",
        params![token_digest(token)],
    )?;
    Ok(())
}

/// Delete every session whose expiry is at or before `now`. Returns the count.
pub fn purge_expired(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    let mut stmt = conn.prepare("SELECT token_hash, expires_at FROM user_sessions")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
    let mut stale = Vec::new();
    for row in rows {
        let (hash, expires_at) = row?;
        let expired = DateTime::parse_from_rfc3339(&expires_at)
            .map(|t| t.with_timezone(&Utc) <= now)
            .unwrap_or(true);
        if expired {
            stale.push(hash);
        }
    }
    for hash in &stale {
        conn.execute("DELETE FROM user_sessions WHERE token_hash = ?1", params![hash])?;
    }
    Ok(stale.len())
}
