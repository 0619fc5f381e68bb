pub mod error;
pub mod forecast;
pub mod health;
pub mod model;
pub mod response;
pub mod v1;

use axum::{extract::DefaultBodyLimit, http::StatusCode, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Config;
use crate::forecast::ForecastPipeline;

use self::error::ApiError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: ForecastPipeline,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(cfg: Config) -> Self {
        Self {
            pipeline: cfg.pipeline(),
            config: Arc::new(cfg),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let server = &state.config.server;
    let body_limit = server.max_upload_bytes;
    let timeout = Duration::from_secs(server.request_timeout_secs);

    Router::new()
        .route("/healthz", get(health::healthz))
        .with_state(state.clone())
        .nest("/api/v1", v1::router(state))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    timeout,
                )),
        )
        .layer(TraceLayer::new_for_http())
}

/// Run one pipeline pass on the blocking pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}
