//! Account routes under /api/user.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use parkvalet_users::{LoginSession, User, UserUpdate};

use crate::app::AppState;
use crate::auth::{clear_cookie, session_cookie, CurrentUser};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// `login` accepts an e-mail or a username; `email` and `username` are
/// accepted as field names too.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    pub login: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub expires_at: String,
}

/// POST /api/user/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .accounts
        .create_user(&req.username, &req.email, &req.password)?;
    let session = state.accounts.open_session(&user.id)?;
    Ok(with_session(&state, StatusCode::CREATED, user, session))
}

/// POST /api/user/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.accounts.authenticate(&req.login, &req.password)?;
    let session = state.accounts.open_session(&user.id)?;
    info!(user_id = %user.id, "login");
    Ok(with_session(&state, StatusCode::OK, user, session))
}

/// POST /api/user/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.accounts.revoke_session(&current.token)?;
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_cookie(&state.config.session.cookie_name))],
    ))
}

/// GET /api/user/me
pub async fn me(current: CurrentUser) -> Json<User> {
    Json(current.user)
}

/// PUT /api/user/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.accounts.update_user(&current.user.id, &update)?))
}

/// DELETE /api/user/me — removes the account, its cars and its sessions.
pub async fn delete_me(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.cars.delete_for_user(&current.user.id)?;
    state.accounts.delete_user(&current.user.id)?;
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_cookie(&state.config.session.cookie_name))],
    ))
}

fn with_session(
    state: &AppState,
    status: StatusCode,
    user: User,
    session: LoginSession,
) -> impl IntoResponse {
    let cookie = session_cookie(
        &state.config.session.cookie_name,
        &session.token,
        state.config.session.ttl_hours,
    );
    (
        status,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user,
            token: session.token,
            expires_at: session.expires_at,
        }),
    )
}
