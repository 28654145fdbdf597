use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::Router;
use serde::Deserialize;

use crate::db::models::Comment;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::response::{ApiResponse, Empty};
use crate::routes::{required, JsonBody, PageQuery};
use crate::state::AppState;
use crate::views::comments::{self, CommentView};
use crate::views::Page;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments/{video_id}", get(list_comments).post(add_comment))
        .route(
            "/comments/c/{comment_id}",
            patch(update_comment).delete(delete_comment),
        )
}

#[derive(Deserialize)]
pub struct ContentBody {
    pub content: Option<String>,
}

async fn list_comments(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(video_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> AppResult<ApiResponse<Page<CommentView>>> {
    let conn = state.db.get()?;
    let comments =
        comments::list_comments(&conn, &video_id, Some(viewer.id.as_str()), page.page_request())?;
    Ok(ApiResponse::ok(comments, "Comments fetched successfully"))
}

async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(video_id): Path<String>,
    JsonBody(body): JsonBody<ContentBody>,
) -> AppResult<ApiResponse<Comment>> {
    let content = required(body.content.as_deref(), "Content")?;
    let comment = state.comments().create(&video_id, &user.id, content)?;
    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<String>,
    JsonBody(body): JsonBody<ContentBody>,
) -> AppResult<ApiResponse<Comment>> {
    let content = body.content.as_deref().unwrap_or_default();
    let comment = state.comments().update(&comment_id, &user.id, content)?;
    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<String>,
) -> AppResult<ApiResponse<Empty>> {
    state.comments().delete(&comment_id, &user.id)?;
    Ok(ApiResponse::ok(Empty {}, "Comment deleted successfully"))
}
