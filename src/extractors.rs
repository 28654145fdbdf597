use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::session;
use crate::db::models::User;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller.
///
/// Reads the access token from the `accessToken` cookie, falling back to an
/// `Authorization: Bearer` header. Rejects with 401 when the token is absent,
/// invalid or expired, or names a user that no longer exists.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = session::credential(&parts.headers);
        let user = session::authenticate(&state.users(), &state.tokens, credential)?;
        Ok(CurrentUser(user))
    }
}
