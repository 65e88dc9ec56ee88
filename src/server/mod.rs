pub mod throttle;

use crate::config::Config;
use crate::core::{FetchError, Pipeline, VideoInfo};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

pub use throttle::WindowBudget;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

pub fn router(state: AppState, cors_origins: &[String], budget: Arc<WindowBudget>) -> Router {
    Router::new()
        .route("/api/info", get(video_info))
        .route("/api/download", get(download_url))
        .route("/api/platforms", get(platforms))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(budget, throttle::throttle))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Credentials are allowed, so methods and headers are mirrored from the
/// request rather than answered with a wildcard.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Bind `config.bind_address` and serve the API until the process exits.
pub async fn serve(config: &Config, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let budget = Arc::new(WindowBudget::new(
        config.inbound_limit.max_requests,
        Duration::from_secs(config.inbound_limit.window_secs),
    ));
    let app = router(AppState::new(pipeline), &config.cors_origins, budget);

    let addr: SocketAddr = config.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub url: String,
    pub format: String,
    pub quality: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadUrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlatformsResponse {
    pub platforms: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

async fn video_info(
    State(state): State<AppState>,
    query: Result<Query<InfoQuery>, QueryRejection>,
) -> Result<Json<VideoInfo>, ApiError> {
    let Query(query) = query?;
    let info = state
        .pipeline
        .fetch_metadata(&query.url)
        .await
        .map_err(|e| log_failure("Error fetching video info", e))?;
    Ok(Json(info))
}

async fn download_url(
    State(state): State<AppState>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Json<DownloadUrlResponse>, ApiError> {
    let Query(query) = query?;
    let url = state
        .pipeline
        .resolve_stream_url(&query.url, &query.format, &query.quality)
        .await
        .map_err(|e| log_failure("Error getting download URL", e))?;
    Ok(Json(DownloadUrlResponse { url }))
}

async fn platforms(State(state): State<AppState>) -> Result<Json<PlatformsResponse>, ApiError> {
    let platforms = state
        .pipeline
        .supported_platforms()
        .await
        .map_err(|e| log_failure("Error getting platforms", e))?;
    Ok(Json(PlatformsResponse { platforms }))
}

// Bad input from a client is not a server fault.
fn log_failure(context: &str, e: FetchError) -> FetchError {
    if e.is_input_error() {
        warn!("{}: {}", context, e);
    } else {
        error!("{}: {}", context, e);
    }
    e
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Fetch(FetchError::NoStreamFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
