use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};

use parkvalet_users::User;

use crate::app::AppState;
use crate::error::ApiError;

/// The logged-in user behind a request, resolved from the session cookie or
/// an `Authorization: Bearer` header. Rejects with 401 otherwise.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.config.session.cookie_name)
            .ok_or_else(ApiError::unauthorized)?
            .to_string();
        let user = state.accounts.resolve_session(&token)?;
        Ok(CurrentUser { user, token })
    }
}

/// Cookie first, then bearer.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    extract_cookie(headers, cookie_name).or_else(|| extract_bearer(headers))
}

fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(name: &str, token: &str, ttl_hours: i64) -> HeaderValue {
    let max_age = ttl_hours.max(0).saturating_mul(3600);
    cookie_header(format!(
        "{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    ))
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn clear_cookie(name: &str) -> HeaderValue {
    cookie_header(format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"))
}

fn cookie_header(value: String) -> HeaderValue {
    // tokens are UUIDs and cookie names come from config; fall back to an
    // empty value rather than panicking on a bad configured name
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(k.clone(), HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn cookie_is_found_among_others() {
        let h = headers(&[(header::COOKIE, "theme=dark; valet_session=abc123; lang=fr")]);
        assert_eq!(session_token(&h, "valet_session"), Some("abc123"));
    }

    #[test]
    fn bearer_used_when_no_cookie() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer tok")]);
        assert_eq!(session_token(&h, "valet_session"), Some("tok"));
    }

    #[test]
    fn cookie_beats_bearer() {
        let h = headers(&[
            (header::COOKIE, "valet_session=from-cookie"),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(session_token(&h, "valet_session"), Some("from-cookie"));
    }

    #[test]
    fn missing_or_empty_yields_none() {
        assert_eq!(session_token(&HeaderMap::new(), "valet_session"), None);
        let h = headers(&[
            (header::COOKIE, "valet_session="),
            (header::AUTHORIZATION, "Basic xyz"),
        ]);
        assert_eq!(session_token(&h, "valet_session"), None);
    }

    #[test]
    fn cookies_carry_attributes() {
        let set = session_cookie("valet_session", "t", 2);
        let set = set.to_str().unwrap();
        assert!(set.starts_with("valet_session=t;"));
        assert!(set.contains("HttpOnly"));
        assert!(set.contains("Max-Age=7200"));
        assert!(clear_cookie("valet_session").to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn huge_ttl_saturates_max_age() {
        let set = session_cookie("valet_session", "t", i64::MAX);
        let expected = format!("Max-Age={}", i64::MAX);
        assert!(set.to_str().unwrap().ends_with(&expected));
    }
}
