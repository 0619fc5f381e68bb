use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
};
use serde::Deserialize;
use validator::Validate;

use super::{error::ApiError, response::ApiResponse, run_blocking, AppState};
use crate::io;
use crate::ml::ModelMetadata;

#[derive(Debug, Deserialize, Validate)]
pub struct RetrainQuery {
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub train_fraction: Option<f64>,
}

/// GET /api/v1/model - Metadata of the current model generation
pub async fn get_model(
    State(state): State<AppState>,
) -> Result<ApiResponse<ModelMetadata>, ApiError> {
    let store = state.pipeline.store().clone();
    let metadata = run_blocking(move || store.metadata()).await?;
    Ok(ApiResponse::success(metadata))
}

/// POST /api/v1/model/retrain - Fit a new model from uploaded history
pub async fn retrain(
    State(state): State<AppState>,
    query: Result<Query<RetrainQuery>, QueryRejection>,
    body: Bytes,
) -> Result<ApiResponse<ModelMetadata>, ApiError> {
    let Query(query) = query?;
    query.validate()?;

    let mut options = state.config.training.clone();
    if let Some(fraction) = query.train_fraction {
        options.train_fraction = fraction;
    }

    let pipeline = state.pipeline.clone();
    let metadata = run_blocking(move || {
        let frame = io::read_frame(body.as_ref())?;
        pipeline.retrain(&frame, &options)
    })
    .await?;

    tracing::info!(generation = %metadata.generation, "model retrained via API");
    Ok(ApiResponse::success(metadata))
}
