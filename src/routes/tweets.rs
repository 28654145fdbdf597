use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Router;

use crate::db::models::Tweet;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::response::{ApiResponse, Empty};
use crate::routes::comments::ContentBody;
use crate::routes::{required, JsonBody};
use crate::state::AppState;
use crate::views::tweets::{self, TweetView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tweets", post(create_tweet))
        .route("/tweets/user/{user_id}", get(user_tweets))
        .route("/tweets/{tweet_id}", patch(update_tweet).delete(delete_tweet))
}

async fn create_tweet(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<ContentBody>,
) -> AppResult<ApiResponse<Tweet>> {
    let content = required(body.content.as_deref(), "Content")?;
    let tweet = state.tweets().create(&user.id, content)?;
    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

async fn user_tweets(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<Vec<TweetView>>> {
    let conn = state.db.get()?;
    let tweets = tweets::list_user_tweets(&conn, &user_id, Some(viewer.id.as_str()))?;
    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

async fn update_tweet(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tweet_id): Path<String>,
    JsonBody(body): JsonBody<ContentBody>,
) -> AppResult<ApiResponse<Tweet>> {
    let content = body.content.as_deref().unwrap_or_default();
    let tweet = state.tweets().update(&tweet_id, &user.id, content)?;
    Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

async fn delete_tweet(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tweet_id): Path<String>,
) -> AppResult<ApiResponse<Empty>> {
    state.tweets().delete(&tweet_id, &user.id)?;
    Ok(ApiResponse::ok(Empty {}, "Tweet deleted successfully"))
}
