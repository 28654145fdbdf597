use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET <asset prefix>/{*path}: streams a stored upload.
pub async fn serve(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Response> {
    let not_found = || AppError::NotFound("Asset not found".into());

    let file_path = state.assets.local_path(&path).ok_or_else(not_found)?;
    let file = tokio::fs::File::open(&file_path)
        .await
        .map_err(|_| not_found())?;

    let mime = mime_guess::from_path(&file_path).first_or_octet_stream();
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        body,
    )
        .into_response())
}
