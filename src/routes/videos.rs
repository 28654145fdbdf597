use axum::extract::{Multipart, Path, Query, State};
use axum::routing::{get, patch};
use axum::Router;
use serde::Deserialize;

use crate::assets::{self, AssetKind, MultipartForm};
use crate::db::models::Video;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::response::{ApiResponse, Empty};
use crate::routes::required;
use crate::state::AppState;
use crate::store::require_owner;
use crate::store::videos::{NewVideo, VideoPatch};
use crate::views::videos::{self, VideoFilter, VideoSort, VideoView};
use crate::views::{Page, PageRequest, VideoSummary};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/videos", get(list_videos).post(publish_video))
        .route(
            "/videos/{video_id}",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/videos/toggle/publish/{video_id}", patch(toggle_publish))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVideosQuery {
    pub query: Option<String>,
    pub user_id: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// GET /videos
async fn list_videos(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(params): Query<ListVideosQuery>,
) -> AppResult<ApiResponse<Page<VideoSummary>>> {
    let sort = VideoSort::parse(params.sort_by.as_deref(), params.sort_type.as_deref())?;
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref());
    let filter = VideoFilter {
        query: params.query,
        owner_id: params.user_id.filter(|id| !id.trim().is_empty()),
    };

    let conn = state.db.get()?;
    let videos = videos::list_videos(&conn, &filter, sort, page)?;
    Ok(ApiResponse::ok(videos, "Videos fetched successfully"))
}

/// POST /videos (multipart)
async fn publish_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<ApiResponse<Video>> {
    let mut form = MultipartForm::read(multipart, &state.spool_dir).await?;

    let title = required(form.text("title"), "Title")?.to_string();
    let description = required(form.text("description"), "Description")?.to_string();
    let declared_duration = form
        .text("duration")
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);
    let video_file = form.require_file("videoFile", "Video")?;
    let thumbnail = form.require_file("thumbnail", "Thumbnail")?;

    let media = state.assets.store(video_file, AssetKind::Video).await?;
    let thumb = match state.assets.store(thumbnail, AssetKind::Thumbnail).await {
        Ok(stored) => stored,
        Err(e) => {
            assets::discard(state.assets.as_ref(), &media.url).await;
            return Err(e.into());
        }
    };

    let created = state.videos().create(
        &user.id,
        NewVideo {
            title,
            description,
            media_url: media.url.clone(),
            thumbnail_url: thumb.url.clone(),
            duration: media.duration.or(declared_duration).unwrap_or(0.0),
        },
    );
    let video = match created {
        Ok(video) => video,
        Err(e) => {
            assets::discard(state.assets.as_ref(), &media.url).await;
            assets::discard(state.assets.as_ref(), &thumb.url).await;
            return Err(e.into());
        }
    };

    tracing::info!("User {} published video {}", user.user_name, video.id);
    Ok(ApiResponse::created(video, "Video published successfully"))
}

/// GET /videos/{videoId}; counts a view the first time this caller opens it.
async fn get_video(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(video_id): Path<String>,
) -> AppResult<ApiResponse<VideoView>> {
    let conn = state.db.get()?;
    let video = videos::get_video_detail(&conn, &video_id, Some(viewer.id.as_str()))?;
    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

/// PATCH /videos/{videoId} (multipart)
async fn update_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> AppResult<ApiResponse<Video>> {
    let current = state.videos().get_by_id(&video_id)?;
    require_owner(&current, &user.id)?;

    let mut form = MultipartForm::read(multipart, &state.spool_dir).await?;

    let mut changes = VideoPatch {
        title: form.text("title").map(str::to_string),
        description: form.text("description").map(str::to_string),
        thumbnail_url: None,
    };
    let thumbnail = form.take_file("thumbnail");
    if changes.is_empty() && thumbnail.is_none() {
        return Err(AppError::Validation(
            "Title, description or thumbnail is required".into(),
        ));
    }

    let new_thumb = match thumbnail {
        Some(file) => Some(state.assets.store(file, AssetKind::Thumbnail).await?),
        None => None,
    };
    changes.thumbnail_url = new_thumb.as_ref().map(|t| t.url.clone());

    let (video, replaced) = match state.videos().update(&video_id, &user.id, changes) {
        Ok(result) => result,
        Err(e) => {
            if let Some(thumb) = &new_thumb {
                assets::discard(state.assets.as_ref(), &thumb.url).await;
            }
            return Err(e.into());
        }
    };
    if let Some(old) = replaced {
        assets::discard(state.assets.as_ref(), &old).await;
    }

    Ok(ApiResponse::ok(video, "Video updated successfully"))
}

/// DELETE /videos/{videoId}
async fn delete_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<String>,
) -> AppResult<ApiResponse<Empty>> {
    let video = state.videos().delete(&video_id, &user.id)?;

    assets::discard(state.assets.as_ref(), &video.media_url).await;
    assets::discard(state.assets.as_ref(), &video.thumbnail_url).await;

    tracing::info!("User {} deleted video {}", user.user_name, video.id);
    Ok(ApiResponse::ok(Empty {}, "Video deleted successfully"))
}

/// PATCH /videos/toggle/publish/{videoId}
async fn toggle_publish(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<String>,
) -> AppResult<ApiResponse<Video>> {
    let video = state.videos().toggle_publish(&video_id, &user.id)?;
    let message = if video.is_published {
        "Video published"
    } else {
        "Video unpublished"
    };
    Ok(ApiResponse::ok(video, message))
}
