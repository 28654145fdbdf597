use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::assets::{self, AssetKind, MultipartForm};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{self, TokenPair, REFRESH_COOKIE};
use crate::auth::AuthError;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::response::{ApiResponse, Empty};
use crate::routes::{required, JsonBody};
use crate::state::AppState;
use crate::store::users::NewUser;
use crate::views::channels::{self, ChannelView};
use crate::views::{history, VideoSummary};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/refresh-token", post(refresh_token))
        .route("/users/logout", post(logout))
        .route("/users/current-user", get(current_user))
        .route("/users/change-password", post(change_password))
        .route("/users/update-account", patch(update_account))
        .route("/users/avatar", patch(update_avatar))
        .route("/users/cover-image", patch(update_cover))
        .route("/users/c/{user_name}", get(channel_profile))
        .route("/users/history", get(watch_history).delete(clear_history))
}

// --- Payloads ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountBody {
    pub full_name: Option<String>,
    pub description: Option<String>,
}

/// Attaches a fresh session's cookies to a response.
fn with_session<T: Serialize>(
    state: &AppState,
    tokens: &TokenPair,
    body: ApiResponse<T>,
) -> Response {
    let cookies = session::session_cookies(tokens, &state.tokens, state.config.auth.secure_cookies);
    (AppendHeaders(cookies), body).into_response()
}

// --- Session ---

/// POST /users/register (multipart)
async fn register(State(state): State<AppState>, multipart: Multipart) -> AppResult<Response> {
    let mut form = MultipartForm::read(multipart, &state.spool_dir).await?;

    let user_name = required(form.text("userName"), "userName")?.to_lowercase();
    let email = required(form.text("email"), "email")?.to_lowercase();
    let full_name = required(form.text("fullName"), "fullName")?.to_string();
    let password = required(form.text("password"), "password")?.to_string();
    let avatar = form.require_file("avatar", "Avatar")?;
    let cover = form.take_file("coverImage");

    let users = state.users();
    if users
        .find_by_login(Some(&user_name), Some(&email))?
        .is_some()
    {
        return Err(AppError::Conflict(
            "User with email or username already exists".into(),
        ));
    }

    let password_hash = hash_password(&password)?;

    let avatar = state.assets.store(avatar, AssetKind::Avatar).await?;
    let cover = match cover {
        Some(file) => match state.assets.store(file, AssetKind::Cover).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                assets::discard(state.assets.as_ref(), &avatar.url).await;
                return Err(e.into());
            }
        },
        None => None,
    };

    let created = users.create(NewUser {
        user_name,
        email,
        full_name,
        password_hash,
        avatar_url: avatar.url.clone(),
        cover_url: cover.as_ref().map(|c| c.url.clone()),
    });
    let user = match created {
        Ok(user) => user,
        Err(e) => {
            assets::discard(state.assets.as_ref(), &avatar.url).await;
            if let Some(cover) = &cover {
                assets::discard(state.assets.as_ref(), &cover.url).await;
            }
            return Err(e.into());
        }
    };

    tracing::info!("Registered user {}", user.user_name);

    let tokens = session::issue_tokens(&users, &state.tokens, &user)?;
    let body = ApiResponse::created(
        SessionData {
            user,
            tokens: tokens.clone(),
        },
        "User registered successfully",
    );
    Ok(with_session(&state, &tokens, body))
}

/// POST /users/login
async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginBody>,
) -> AppResult<Response> {
    let user_name = body.user_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let email = body.email.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if user_name.is_none() && email.is_none() {
        return Err(AppError::Validation("userName or email is required".into()));
    }
    let password = required(body.password.as_deref(), "password")?;

    let users = state.users();
    let user = users
        .find_by_login(user_name, email)?
        .filter(|user| verify_password(password, &user.password_hash))
        .ok_or(AuthError::InvalidCredentials)?;

    tracing::debug!("User {} logged in", user.user_name);

    let tokens = session::issue_tokens(&users, &state.tokens, &user)?;
    let body = ApiResponse::ok(
        SessionData {
            user,
            tokens: tokens.clone(),
        },
        "User logged in successfully",
    );
    Ok(with_session(&state, &tokens, body))
}

/// POST /users/refresh-token, token from the cookie or the JSON body.
async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshBody::default()
    } else {
        serde_json::from_slice::<RefreshBody>(&body)
            .map_err(|e| AppError::Validation(format!("Malformed JSON body: {}", e)))?
    };
    let presented = session::cookie_value(&headers, REFRESH_COOKIE)
        .or(from_body.refresh_token.as_deref());

    let (_, tokens) = session::refresh(&state.users(), &state.tokens, presented)?;
    let body = ApiResponse::ok(tokens.clone(), "Access token refreshed");
    Ok(with_session(&state, &tokens, body))
}

/// POST /users/logout
async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    session::revoke(&state.users(), &user.id)?;
    tracing::debug!("User {} logged out", user.user_name);

    let cookies = session::clear_cookies(state.config.auth.secure_cookies);
    Ok((
        AppendHeaders(cookies),
        ApiResponse::ok(Empty {}, "User logged out successfully"),
    )
        .into_response())
}

// --- Account ---

/// GET /users/current-user
async fn current_user(CurrentUser(user): CurrentUser) -> ApiResponse<User> {
    ApiResponse::ok(user, "Current user fetched successfully")
}

/// POST /users/change-password
async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<ChangePasswordBody>,
) -> AppResult<ApiResponse<Empty>> {
    let old_password = required(body.old_password.as_deref(), "oldPassword")?;
    let new_password = required(body.new_password.as_deref(), "newPassword")?;

    if !verify_password(old_password, &user.password_hash) {
        return Err(AppError::Validation("Invalid old password".into()));
    }

    let hash = hash_password(new_password)?;
    state.users().set_password_hash(&user.id, &hash)?;

    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}

/// PATCH /users/update-account
async fn update_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<UpdateAccountBody>,
) -> AppResult<ApiResponse<User>> {
    let full_name = body.full_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let description = body.description.as_deref().map(str::trim);
    if full_name.is_none() && description.is_none() {
        return Err(AppError::Validation(
            "fullName or description is required".into(),
        ));
    }

    let updated = state.users().update_account(&user.id, full_name, description)?;
    Ok(ApiResponse::ok(updated, "Account details updated successfully"))
}

/// PATCH /users/avatar (multipart)
async fn update_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<ApiResponse<User>> {
    let mut form = MultipartForm::read(multipart, &state.spool_dir).await?;
    let file = form.require_file("avatar", "Avatar")?;

    let stored = state.assets.store(file, AssetKind::Avatar).await?;
    let (updated, previous) = match state.users().set_avatar(&user.id, &stored.url) {
        Ok(result) => result,
        Err(e) => {
            assets::discard(state.assets.as_ref(), &stored.url).await;
            return Err(e.into());
        }
    };
    assets::discard(state.assets.as_ref(), &previous).await;

    Ok(ApiResponse::ok(updated, "Avatar updated successfully"))
}

/// PATCH /users/cover-image (multipart)
async fn update_cover(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<ApiResponse<User>> {
    let mut form = MultipartForm::read(multipart, &state.spool_dir).await?;
    let file = form.require_file("coverImage", "Cover image")?;

    let stored = state.assets.store(file, AssetKind::Cover).await?;
    let (updated, previous) = match state.users().set_cover(&user.id, &stored.url) {
        Ok(result) => result,
        Err(e) => {
            assets::discard(state.assets.as_ref(), &stored.url).await;
            return Err(e.into());
        }
    };
    if let Some(previous) = previous {
        assets::discard(state.assets.as_ref(), &previous).await;
    }

    Ok(ApiResponse::ok(updated, "Cover image updated successfully"))
}

// --- Channel & history ---

/// GET /users/c/{userName}
async fn channel_profile(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(user_name): Path<String>,
) -> AppResult<ApiResponse<ChannelView>> {
    let conn = state.db.get()?;
    let channel = channels::get_channel_profile(&conn, &user_name, Some(viewer.id.as_str()))?;
    Ok(ApiResponse::ok(channel, "Channel fetched successfully"))
}

/// GET /users/history
async fn watch_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<Vec<VideoSummary>>> {
    let conn = state.db.get()?;
    let videos = history::get_watch_history(&conn, &user.id)?;
    Ok(ApiResponse::ok(videos, "Watch history fetched successfully"))
}

/// DELETE /users/history
async fn clear_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<Empty>> {
    state.users().clear_watch_history(&user.id)?;
    Ok(ApiResponse::ok(Empty {}, "Watch history cleared"))
}
