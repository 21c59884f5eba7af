use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};
use parkvalet_core::config::MAX_SESSION_TTL_HOURS;
use rusqlite::Connection;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::types::{LoginSession, User, UserUpdate};
use crate::{account, session};

/// Thread-safe owner of the accounts tables: users and their login sessions.
///
/// Wraps a single SQLite connection in a `Mutex`, one per manager.
pub struct AccountManager {
    db: Mutex<Connection>,
    session_ttl: Duration,
}

impl AccountManager {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    ///
    /// The session lifetime is clamped to 1 hour ..= `MAX_SESSION_TTL_HOURS`.
    pub fn new(conn: Connection, session_ttl_hours: i64) -> Self {
        let hours = session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS);
        Self {
            db: Mutex::new(conn),
            session_ttl: Duration::hours(hours),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[instrument(skip(self, password))]
    pub fn create_user(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let user = account::create_user(&self.conn(), username, email, password)?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub fn authenticate(&self, login: &str, password: &str) -> Result<User> {
        account::authenticate(&self.conn(), login, password)
    }

    #[instrument(skip(self))]
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        account::get_user(&self.conn(), user_id)
    }

    #[instrument(skip(self, update))]
    pub fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<User> {
        account::update_user(&self.conn(), user_id, update)
    }

    #[instrument(skip(self))]
    pub fn delete_user(&self, user_id: &str) -> Result<()> {
        account::delete_user(&self.conn(), user_id)?;
        info!(user_id, "user deleted");
        Ok(())
    }

    /// Issue a new login session using the configured TTL.
    #[instrument(skip(self))]
    pub fn open_session(&self, user_id: &str) -> Result<LoginSession> {
        let session = session::create_session(&self.conn(), user_id, self.session_ttl, Utc::now())?;
        debug!(user_id, expires_at = %session.expires_at, "session opened");
        Ok(session)
    }

    /// Look up the user behind a session token.
    #[instrument(skip(self, token))]
    pub fn resolve_session(&self, token: &str) -> Result<User> {
        session::resolve_session(&self.conn(), token, Utc::now())
    }

    #[instrument(skip(self, token))]
    pub fn revoke_session(&self, token: &str) -> Result<()> {
        session::revoke_session(&self.conn(), token)
    }

    /// Housekeeping hook, run once at startup.
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let purged = session::purge_expired(&self.conn(), Utc::now())?;
        if purged > 0 {
            info!(purged, "expired login sessions removed");
        }
        Ok(purged)
    }
}
