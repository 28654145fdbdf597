use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;

use crate::db::models::Playlist;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::response::{ApiResponse, Empty};
use crate::routes::{required, JsonBody};
use crate::state::AppState;
use crate::views::playlists::{self, PlaylistSummary, PlaylistView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/playlists", post(create_playlist))
        .route(
            "/playlists/{playlist_id}",
            get(get_playlist)
                .patch(update_playlist)
                .delete(delete_playlist),
        )
        .route("/playlists/add/{video_id}/{playlist_id}", patch(add_video))
        .route("/playlists/remove/{video_id}/{playlist_id}", patch(remove_video))
        .route("/playlists/user/{user_id}", get(user_playlists))
}

#[derive(Deserialize)]
pub struct PlaylistBody {
    pub name: Option<String>,
    pub description: Option<String>,
}

async fn create_playlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<PlaylistBody>,
) -> AppResult<ApiResponse<Playlist>> {
    let name = required(body.name.as_deref(), "Name")?;
    let description = required(body.description.as_deref(), "Description")?;
    let playlist = state.playlists().create(&user.id, name, description)?;
    Ok(ApiResponse::created(playlist, "Playlist created successfully"))
}

async fn get_playlist(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(playlist_id): Path<String>,
) -> AppResult<ApiResponse<PlaylistView>> {
    let conn = state.db.get()?;
    let playlist = playlists::get_playlist_detail(&conn, &playlist_id)?;
    Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

async fn update_playlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(playlist_id): Path<String>,
    JsonBody(body): JsonBody<PlaylistBody>,
) -> AppResult<ApiResponse<Playlist>> {
    let playlist = state.playlists().update(
        &playlist_id,
        &user.id,
        body.name.as_deref(),
        body.description.as_deref(),
    )?;
    Ok(ApiResponse::ok(playlist, "Playlist updated successfully"))
}

async fn delete_playlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(playlist_id): Path<String>,
) -> AppResult<ApiResponse<Empty>> {
    state.playlists().delete(&playlist_id, &user.id)?;
    Ok(ApiResponse::ok(Empty {}, "Playlist deleted successfully"))
}

async fn add_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<Playlist>> {
    let playlist = state.playlists().add_video(&playlist_id, &user.id, &video_id)?;
    Ok(ApiResponse::ok(playlist, "Video added to playlist"))
}

async fn remove_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<Playlist>> {
    let playlist = state
        .playlists()
        .remove_video(&playlist_id, &user.id, &video_id)?;
    Ok(ApiResponse::ok(playlist, "Video removed from playlist"))
}

async fn user_playlists(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Vec<PlaylistSummary>>> {
    let conn = state.db.get()?;
    let playlists = playlists::list_user_playlists(&conn, &user_id)?;
    Ok(ApiResponse::ok(playlists, "Playlists fetched successfully"))
}
