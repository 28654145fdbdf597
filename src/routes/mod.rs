pub mod assets;
pub mod comments;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

use std::time::Duration;

use axum::extract::{DefaultBodyLimit, FromRequest};
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::views::PageRequest;

pub const API_PREFIX: &str = "/api/v1";

/// The whole HTTP surface with its middleware stack.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(users::router())
        .merge(videos::router())
        .merge(comments::router())
        .merge(likes::router())
        .merge(subscriptions::router())
        .merge(tweets::router())
        .merge(playlists::router());

    let asset_route = format!("{}/{{*path}}", state.config.asset_prefix());

    Router::new()
        .route("/", get(health))
        .route(&asset_route, get(assets::serve))
        .nest(API_PREFIX, api)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes()))
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.server.request_timeout_secs,
        )))
        .layer(cors(&state.config.server))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors(server: &ServerConfig) -> CorsLayer {
    // Cookies need credentials, which rule out a wildcard origin
    let origin = match server
        .cors_origin
        .as_deref()
        .and_then(|o| HeaderValue::from_str(o).ok())
    {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60))
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> ApiResponse<Health> {
    ApiResponse::ok(Health { status: "ok" }, "Server is running")
}

/// JSON body whose rejections render as the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `?page=&limit=` as sent by clients; parsed leniently.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref())
    }
}

/// Trimmed, non-blank text or a validation error naming the field.
pub(crate) fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}
