//! Session lifecycle: issuing, refreshing and revoking token pairs, and
//! resolving a presented credential to a user.

use axum::http::{header, HeaderMap, HeaderName};
use serde::Serialize;

use crate::auth::{AuthError, TokenKeys};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::store::{StoreError, UserStore};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints a fresh pair and persists the refresh token, replacing any previous one.
pub fn issue_tokens(users: &UserStore, keys: &TokenKeys, user: &User) -> AppResult<TokenPair> {
    let access_token = keys
        .sign_access(user)
        .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))?;
    let refresh_token = keys
        .sign_refresh(&user.id)
        .map_err(|e| AppError::Internal(format!("Failed to sign refresh token: {}", e)))?;

    users.set_refresh_token(&user.id, Some(&refresh_token))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Exchanges a refresh token for a new pair. Only the most recently issued
/// refresh token is accepted; anything else is `Expired`.
pub fn refresh(
    users: &UserStore,
    keys: &TokenKeys,
    presented: Option<&str>,
) -> AppResult<(User, TokenPair)> {
    let presented = presented
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;
    let claims = keys.verify_refresh(presented)?;

    let user = users.find_by_id(&claims.sub)?.ok_or(AuthError::NotFound)?;
    if user.refresh_token.as_deref() != Some(presented) {
        return Err(AuthError::Expired.into());
    }

    let pair = issue_tokens(users, keys, &user)?;
    Ok((user, pair))
}

/// Forgets the persisted refresh token so it can no longer be exchanged.
pub fn revoke(users: &UserStore, user_id: &str) -> AppResult<()> {
    match users.set_refresh_token(user_id, None) {
        Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Resolves an access token to the user it was issued for.
pub fn authenticate(
    users: &UserStore,
    keys: &TokenKeys,
    credential: Option<&str>,
) -> AppResult<User> {
    let token = credential
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;
    let claims = keys.verify_access(token)?;
    let user = users.find_by_id(&claims.sub)?.ok_or(AuthError::NotFound)?;
    Ok(user)
}

/// The access token carried by a request: cookie first, then bearer header.
pub fn credential(headers: &HeaderMap) -> Option<&str> {
    cookie_value(headers, ACCESS_COOKIE).or_else(|| bearer_token(headers))
}

pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn session_cookies(
    pair: &TokenPair,
    keys: &TokenKeys,
    secure: bool,
) -> [(HeaderName, String); 2] {
    [
        (
            header::SET_COOKIE,
            cookie(
                ACCESS_COOKIE,
                &pair.access_token,
                keys.access_ttl().num_seconds(),
                secure,
            ),
        ),
        (
            header::SET_COOKIE,
            cookie(
                REFRESH_COOKIE,
                &pair.refresh_token,
                keys.refresh_ttl().num_seconds(),
                secure,
            ),
        ),
    ]
}

pub fn clear_cookies(secure: bool) -> [(HeaderName, String); 2] {
    [
        (header::SET_COOKIE, cookie(ACCESS_COOKIE, "", 0, secure)),
        (header::SET_COOKIE, cookie(REFRESH_COOKIE, "", 0, secure)),
    ]
}

fn cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly;{} SameSite=None; Path=/; Max-Age={}",
        name,
        value,
        if secure { " Secure;" } else { "" },
        max_age_secs.max(0)
    )
}
