use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{error::ApiError, response::ApiResponse, run_blocking, AppState};
use crate::domain::{PredictedLoad, PredictionResult, PredictionSummary};
use crate::io;

#[derive(Debug, Deserialize, Validate)]
pub struct ForecastQuery {
    #[validate(range(min = 1))]
    pub horizon_days: Option<u32>,
}

/// JSON forecast: chart series plus headline numbers
#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub horizon_days: u32,
    /// Hours from the first to the last prediction
    pub span_hours: Option<i64>,
    pub summary: PredictionSummary,
    pub day_boundaries: Vec<NaiveDateTime>,
    pub points: Vec<PredictedLoad>,
}

impl ForecastResponse {
    fn new(horizon_days: u32, result: PredictionResult) -> Self {
        Self {
            horizon_days,
            span_hours: result.span().map(|d| d.num_hours()),
            summary: result.summary(),
            day_boundaries: result.day_boundaries(),
            points: result.into_points(),
        }
    }
}

/// POST /api/v1/forecast - Predict load for an uploaded weather CSV
pub async fn forecast_json(
    State(state): State<AppState>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
    body: Bytes,
) -> Result<ApiResponse<ForecastResponse>, ApiError> {
    let started = Instant::now();
    let Query(query) = query?;
    let horizon_days = horizon(&state, &query)?;
    let result = predict(&state, body, horizon_days).await?;

    let count = result.len();
    Ok(ApiResponse::success(ForecastResponse::new(horizon_days, result))
        .with_count(count)
        .with_duration(started.elapsed().as_millis() as u64))
}

/// POST /api/v1/forecast/csv - Same forecast as a CSV download
pub async fn forecast_csv(
    State(state): State<AppState>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let horizon_days = horizon(&state, &query)?;
    let result = predict(&state, body, horizon_days).await?;
    let csv = io::predictions_to_csv(&result)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"predicted_load.csv\"",
            ),
        ],
        csv,
    ))
}

fn horizon(state: &AppState, query: &ForecastQuery) -> Result<u32, ApiError> {
    query.validate()?;
    Ok(query
        .horizon_days
        .unwrap_or(state.config.forecast.default_horizon_days))
}

async fn predict(
    state: &AppState,
    body: Bytes,
    horizon_days: u32,
) -> Result<PredictionResult, ApiError> {
    let pipeline = state.pipeline.clone();
    run_blocking(move || {
        let frame = io::read_frame(body.as_ref())?;
        pipeline.predict(&frame, horizon_days)
    })
    .await
}
