use crate::domain::{ForecastFrame, PredictedLoad, PredictionResult};
use crate::error::{ForecastError, Result};
use crate::ml::{self, LoadModel, ModelMetadata, ModelStore, TrainingOptions};

use super::features::derive_features;
use super::window::{select_window, WindowBound};

/// Raw weather rows in, predicted load out.
///
/// Holds no model state of its own: every call resolves the current model from
/// the store, so a concurrent retrain is picked up on the next call.
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    store: ModelStore,
    bound: WindowBound,
}

impl ForecastPipeline {
    pub fn new(store: ModelStore, bound: WindowBound) -> Self {
        Self { store, bound }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Predict load for the first `horizon_days` of `frame`.
    ///
    /// Derives calendar features, keeps the forward window, loads the current
    /// model and predicts on the feature columns in the order the model was
    /// trained with. Reads the store and nothing else.
    pub fn predict(&self, frame: &ForecastFrame, horizon_days: u32) -> Result<PredictionResult> {
        let derived = prepare_features(frame)?;
        let window = select_window(&derived, horizon_days, self.bound)?;
        let loaded = self.store.load()?;

        let result = infer(&loaded.model, loaded.feature_names(), &window)?;
        tracing::info!(
            generation = %loaded.metadata.generation,
            input_rows = frame.len(),
            predicted_rows = result.len(),
            horizon_days,
            "forecast complete"
        );
        Ok(result)
    }

    /// Fit a new model on `frame` and make it the current one.
    pub fn retrain(&self, frame: &ForecastFrame, options: &TrainingOptions) -> Result<ModelMetadata> {
        let trained = ml::train(frame, options)?;
        self.store.save(&trained)
    }
}

/// Feature frame for inference: the input plus the derived calendar columns.
pub fn prepare_features(frame: &ForecastFrame) -> Result<ForecastFrame> {
    derive_features(frame)
}

/// Run `model` over `frame`, pairing each row's timestamp with its prediction.
///
/// # Errors
///
/// - `MissingFeature` naming the first feature that is not a column
/// - `NonNumericValue` for the first empty feature cell
/// - `MissingTimestamp` if a row has no usable timestamp
pub fn infer(
    model: &dyn LoadModel,
    feature_names: &[String],
    frame: &ForecastFrame,
) -> Result<PredictionResult> {
    if let Some(missing) = feature_names.iter().find(|name| !frame.has_column(name)) {
        return Err(ForecastError::MissingFeature(missing.clone()));
    }
    if frame.is_empty() {
        return Ok(PredictionResult::default());
    }

    let timestamps = frame.timestamps()?;
    let x = frame.feature_matrix(feature_names)?;
    let predictions = model.predict(&x)?;
    if predictions.len() != timestamps.len() {
        return Err(ForecastError::Model(format!(
            "model returned {} predictions for {} rows",
            predictions.len(),
            timestamps.len()
        )));
    }

    Ok(PredictionResult::new(
        timestamps
            .into_iter()
            .zip(predictions)
            .map(|(event_timestamp, predicted_load_mw)| PredictedLoad {
                event_timestamp,
                predicted_load_mw,
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{ForestParams, ModelType};
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// Predicts the first feature of each row.
    struct Echo;

    impl LoadModel for Echo {
        fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
            Ok(x.iter().map(|row| row[0]).collect())
        }

        fn model_type(&self) -> ModelType {
            ModelType::RandomForest
        }
    }

    fn weather(hours: i64) -> ForecastFrame {
        let mut frame = ForecastFrame::new(["forecast_temperature", "forecast_wind"]);
        for h in 0..hours {
            frame.push_row(
                base() + Duration::hours(h),
                vec![Some(5.0 + (h % 24) as f64), Some(3.0)],
            );
        }
        frame
    }

    fn history(hours: i64) -> ForecastFrame {
        let mut frame = ForecastFrame::new(["forecast_temperature", "forecast_wind", "load_MW"]);
        for h in 0..hours {
            let temp = 5.0 + (h % 24) as f64;
            frame.push_row(
                base() + Duration::hours(h),
                vec![Some(temp), Some(3.0), Some(800.0 + temp * 12.0)],
            );
        }
        frame
    }

    fn options() -> TrainingOptions {
        TrainingOptions {
            forest: ForestParams {
                n_trees: 8,
                max_depth: Some(8),
                ..ForestParams::default()
            },
            ..TrainingOptions::default()
        }
    }

    #[test]
    fn test_infer_uses_feature_order() {
        let frame = derive_features(&weather(3)).unwrap();
        let names = vec!["hour".to_string(), "forecast_temperature".to_string()];

        let result = infer(&Echo, &names, &frame).unwrap();
        let hours: Vec<f64> = result.points().iter().map(|p| p.predicted_load_mw).collect();
        assert_eq!(hours, vec![0.0, 1.0, 2.0]);
        assert_eq!(result.points()[2].event_timestamp, base() + Duration::hours(2));
    }

    #[test]
    fn test_infer_names_missing_feature() {
        let frame = weather(2);
        let names = vec!["forecast_temperature".to_string(), "forecast_humidity".to_string()];
        let err = infer(&Echo, &names, &frame).unwrap_err();
        assert!(matches!(err, ForecastError::MissingFeature(name) if name == "forecast_humidity"));
    }

    #[test]
    fn test_infer_rejects_empty_feature_cell() {
        let mut frame = weather(2);
        frame.push_row(base() + Duration::hours(2), vec![None, Some(3.0)]);
        let names = vec!["forecast_temperature".to_string()];

        let err = infer(&Echo, &names, &frame).unwrap_err();
        assert!(matches!(err, ForecastError::NonNumericValue { row: 2, .. }));
    }

    #[test]
    fn test_predict_without_model_is_not_found() {
        let dir = TempDir::new().unwrap();
        let pipeline = ForecastPipeline::new(ModelStore::new(dir.path(), 2), WindowBound::HalfOpen);

        let err = pipeline.predict(&weather(24), 1).unwrap_err();
        assert!(matches!(err, ForecastError::ModelNotFound { .. }));
    }

    #[test]
    fn test_retrain_then_predict_one_day() {
        let dir = TempDir::new().unwrap();
        let pipeline = ForecastPipeline::new(ModelStore::new(dir.path(), 2), WindowBound::HalfOpen);

        let metadata = pipeline.retrain(&history(24 * 7), &options()).unwrap();
        assert_eq!(metadata.training_samples, 142);

        let result = pipeline.predict(&weather(48), 1).unwrap();
        assert_eq!(result.len(), 24);
        assert!(result.points().iter().all(|p| p.predicted_load_mw.is_finite()));
        assert_eq!(result.points()[23].event_timestamp, base() + Duration::hours(23));
    }

    #[test]
    fn test_predict_reports_feature_missing_from_input() {
        let dir = TempDir::new().unwrap();
        let pipeline = ForecastPipeline::new(ModelStore::new(dir.path(), 2), WindowBound::HalfOpen);
        pipeline.retrain(&history(48), &options()).unwrap();

        let mut frame = ForecastFrame::new(["forecast_temperature"]);
        frame.push_row(base(), vec![Some(4.0)]);

        let err = pipeline.predict(&frame, 1).unwrap_err();
        assert!(matches!(err, ForecastError::MissingFeature(name) if name == "forecast_wind"));
    }
}
