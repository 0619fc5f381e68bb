use axum::{
    routing::{get, post},
    Router,
};

use super::{forecast, model, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/forecast", post(forecast::forecast_json))
        .route("/forecast/csv", post(forecast::forecast_csv))
        .route("/model", get(model::get_model))
        .route("/model/retrain", post(model::retrain))
        .with_state(state)
}
