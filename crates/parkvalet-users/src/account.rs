use rusqlite::{params, Connection};

use parkvalet_core::types::{new_id, now_rfc3339};

use crate::db::{row_to_user, USER_SELECT_SQL};
use crate::error::{Result, UserError};
use crate::password::{hash_password, verify_password};
use crate::types::{User, UserUpdate};

/// Insert a new account. E-mail and username must both be unused.
pub fn create_user(conn: &Connection, username: &str, email: &str, password: &str) -> Result<User> {
    require_non_empty("username", username)?;
    require_non_empty("email", email)?;
    require_non_empty("password", password)?;

    if find_by_column(conn, "email", email)?.is_some() {
        return Err(UserError::AlreadyExists(email.to_string()));
    }
    if find_by_column(conn, "username", username)?.is_some() {
        return Err(UserError::AlreadyExists(username.to_string()));
    }

    let now = now_rfc3339();
    let user = User {
        id: new_id(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: hash_password(password)?,
        created_at: now.clone(),
        updated_at: now,
    };
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.username,
            user.email,
            user.password_hash,
            user.created_at,
            user.updated_at
        ],
    )
    .map_err(|e| unique_to_exists(e, email))?;
    Ok(user)
}

/// Load a user by primary key. Returns None instead of an error when absent
/// so callers decide whether missing is exceptional in their context.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    find_by_column(conn, "id", user_id)
}

/// Resolve `login` as an e-mail first, then as a username, and check the
/// password. Both failure modes collapse into `InvalidCredentials`.
pub fn authenticate(conn: &Connection, login: &str, password: &str) -> Result<User> {
    let user = match find_by_column(conn, "email", login)? {
        Some(u) => u,
        None => find_by_column(conn, "username", login)?.ok_or(UserError::InvalidCredentials)?,
    };
    if !verify_password(password, &user.password_hash)? {
        return Err(UserError::InvalidCredentials);
    }
    Ok(user)
}

/// Apply a partial update. A new password is rehashed; always bumps updated_at.
pub fn update_user(conn: &Connection, user_id: &str, update: &UserUpdate) -> Result<User> {
    let mut user =
        get_user(conn, user_id)?.ok_or_else(|| UserError::NotFound(user_id.to_string()))?;

    if let Some(username) = &update.username {
        require_non_empty("username", username)?;
        if let Some(other) = find_by_column(conn, "username", username)? {
            if other.id != user.id {
                return Err(UserError::AlreadyExists(username.clone()));
            }
        }
        user.username = username.clone();
    }
    if let Some(email) = &update.email {
        require_non_empty("email", email)?;
        if let Some(other) = find_by_column(conn, "email", email)? {
            if other.id != user.id {
                return Err(UserError::AlreadyExists(email.clone()));
            }
        }
        user.email = email.clone();
    }
    if let Some(password) = &update.password {
        require_non_empty("password", password)?;
        user.password_hash = hash_password(password)?;
    }
    user.updated_at = now_rfc3339();

    conn.execute(
        "UPDATE users SET username=?2, email=?3, password_hash=?4, updated_at=?5 WHERE id=?1",
        params![
            user.id,
            user.username,
            user.email,
            user.password_hash,
            user.updated_at
        ],
    )
    .map_err(|e| unique_to_exists(e, &user.email))?;
    Ok(user)
}

/// Remove an account together with its login sessions.
pub fn delete_user(conn: &Connection, user_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM user_sessions WHERE user_id = ?1",
        params![user_id],
    )?;
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    if rows == 0 {
        return Err(UserError::NotFound(user_id.to_string()));
    }
    Ok(())
}

fn find_by_column(conn: &Connection, column: &str, value: &str) -> Result<Option<User>> {
    // column is always one of our own literals, never user input
    let sql = format!("{USER_SELECT_SQL} WHERE {column} = ?1");
    match conn.query_row(&sql, params![value], row_to_user) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(UserError::DatabaseError(e)),
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(UserError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

fn unique_to_exists(e: rusqlite::Error, what: &str) -> UserError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            UserError::AlreadyExists(what.to_string())
        }
        _ => UserError::DatabaseError(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        conn
    }

    #[test]
    fn create_and_fetch() {
        let conn = conn();
        let user = create_user(&conn, "alice", "alice@example.com", "pw").unwrap();
        let loaded = get_user(&conn, &user.id).unwrap().unwrap();
        assert_eq!(loaded.username, "alice");
        assert_eq!(loaded.email, "alice@example.com");
        assert_ne!(loaded.password_hash, "pw");
    }

    #[test]
    fn duplicate_email_rejected() {
        let conn = conn();
        create_user(&conn, "alice", "a@example.com", "pw").unwrap();
        let err = create_user(&conn, "alice2", "a@example.com", "pw").unwrap_err();
        assert!(matches!(err, UserError::AlreadyExists(_)));
    }

    #[test]
    fn duplicate_username_rejected() {
        let conn = conn();
        create_user(&conn, "alice", "a@example.com", "pw").unwrap();
        let err = create_user(&conn, "alice", "b@example.com", "pw").unwrap_err();
        assert!(matches!(err, UserError::AlreadyExists(_)));
    }

    #[test]
    fn empty_fields_rejected() {
        let conn = conn();
        assert!(matches!(
            create_user(&conn, " ", "a@example.com", "pw"),
            Err(UserError::InvalidInput(_))
        ));
        assert!(matches!(
            create_user(&conn, "alice", "a@example.com", ""),
            Err(UserError::InvalidInput(_))
        ));
    }

    #[test]
    fn authenticate_by_email_or_username() {
        let conn = conn();
        let user = create_user(&conn, "alice", "a@example.com", "secret").unwrap();
        assert_eq!(authenticate(&conn, "a@example.com", "secret").unwrap().id, user.id);
        assert_eq!(authenticate(&conn, "alice", "secret").unwrap().id, user.id);
        assert!(matches!(
            authenticate(&conn, "alice", "wrong"),
            Err(UserError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&conn, "bob", "secret"),
            Err(UserError::InvalidCredentials)
        ));
    }

    #[test]
    fn update_rehashes_password() {
        let conn = conn();
        let user = create_user(&conn, "alice", "a@example.com", "old").unwrap();
        let update = UserUpdate {
            password: Some("new".into()),
            ..Default::default()
        };
        update_user(&conn, &user.id, &update).unwrap();
        assert!(authenticate(&conn, "alice", "new").is_ok());
        assert!(authenticate(&conn, "alice", "old").is_err());
    }

    #[test]
    fn update_cannot_steal_email() {
        let conn = conn();
        create_user(&conn, "alice", "a@example.com", "pw").unwrap();
        let bob = create_user(&conn, "bob", "b@example.com", "pw").unwrap();
        let update = UserUpdate {
            email: Some("a@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            update_user(&conn, &bob.id, &update),
            Err(UserError::AlreadyExists(_))
        ));
    }

    #[test]
    fn update_unknown_user_is_not_found() {
        let conn = conn();
        assert!(matches!(
            update_user(&conn, "missing", &UserUpdate::default()),
            Err(UserError::NotFound(_))
        ));
    }

    #[test]
    fn delete_then_missing() {
        let conn = conn();
        let user = create_user(&conn, "alice", "a@example.com", "pw").unwrap();
        delete_user(&conn, &user.id).unwrap();
        assert!(get_user(&conn, &user.id).unwrap().is_none());
        assert!(matches!(
            delete_user(&conn, &user.id),
            Err(UserError::NotFound(_))
        ));
    }

    #[test]
    fn password_hash_not_serialized() {
        let conn = conn();
        let user = create_user(&conn, "alice", "a@example.com", "pw").unwrap();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(json.contains("alice"));
    }
}
