use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;

use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::store::Toggled;
use crate::views::channels::{self, SubscribedChannel, SubscriberView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/subscriptions/c/{channel_id}",
            get(list_subscribers).post(toggle_subscription),
        )
        .route("/subscriptions/u/{subscriber_id}", get(list_subscriptions))
}

async fn toggle_subscription(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(channel_id): Path<String>,
) -> AppResult<ApiResponse<Toggled>> {
    let toggled = state.subscriptions().toggle(&channel_id, &user.id)?;
    let message = if toggled.active {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(toggled, message))
}

async fn list_subscribers(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(channel_id): Path<String>,
) -> AppResult<ApiResponse<Vec<SubscriberView>>> {
    let conn = state.db.get()?;
    let subscribers = channels::list_subscribers(&conn, &channel_id)?;
    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}

async fn list_subscriptions(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(subscriber_id): Path<String>,
) -> AppResult<ApiResponse<Vec<SubscribedChannel>>> {
    let conn = state.db.get()?;
    let channels = channels::list_subscriptions(&conn, &subscriber_id)?;
    Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully"))
}
