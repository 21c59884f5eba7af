use serde::{Deserialize, Serialize};

/// Account record. The password hash is an argon2 PHC string and never
/// leaves the process through serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUIDv7.
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    /// Plain text; rehashed before it is stored.
    pub password: Option<String>,
}

/// A freshly opened login session. `token` is only available here: the
/// table keeps its SHA-256 digest.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub user_id: String,
    pub expires_at: String,
}
