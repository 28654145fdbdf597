use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;

use crate::db::models::LikeTarget;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::store::Toggled;
use crate::views::likes::{self, LikedVideo};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/likes/toggle/v/{video_id}", post(toggle_video_like))
        .route("/likes/toggle/c/{comment_id}", post(toggle_comment_like))
        .route("/likes/toggle/t/{tweet_id}", post(toggle_tweet_like))
        .route("/likes/videos", get(liked_videos))
}

fn toggle(state: &AppState, user_id: &str, target: LikeTarget) -> AppResult<ApiResponse<Toggled>> {
    let toggled = state.likes().toggle(&target, user_id)?;
    let message = if toggled.active {
        format!("Liked {}", target.kind())
    } else {
        format!("Unliked {}", target.kind())
    };
    Ok(ApiResponse::ok(toggled, message))
}

async fn toggle_video_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<String>,
) -> AppResult<ApiResponse<Toggled>> {
    toggle(&state, &user.id, LikeTarget::Video(video_id))
}

async fn toggle_comment_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<String>,
) -> AppResult<ApiResponse<Toggled>> {
    toggle(&state, &user.id, LikeTarget::Comment(comment_id))
}

async fn toggle_tweet_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tweet_id): Path<String>,
) -> AppResult<ApiResponse<Toggled>> {
    toggle(&state, &user.id, LikeTarget::Tweet(tweet_id))
}

/// GET /likes/videos: the caller's liked videos, most recent like first.
async fn liked_videos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<ApiResponse<Vec<LikedVideo>>> {
    let conn = state.db.get()?;
    let videos = likes::list_liked_videos(&conn, &user.id)?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}
