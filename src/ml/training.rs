//! ML Model Training Pipeline
//!
//! Fits the load model from historical weather + load rows. The split is
//! positional: the first `floor(train_fraction * n)` rows train, the rest are
//! the holdout used for validation metrics.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ForestParams, LoadModel, SmartcoreRandomForest, ValidationMetrics};
use crate::domain::ForecastFrame;
use crate::error::{ForecastError, Result};
use crate::forecast::features::{derive_features, DERIVED_COLUMNS};

pub const DEFAULT_TARGET_COLUMN: &str = "load_MW";
pub const DEFAULT_FEATURE_MARKER: &str = "forecast";

/// How feature columns are picked from a training frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSelection {
    /// Every column except the target
    #[default]
    ExcludeByName,
    /// Columns whose name contains the marker, then the derived columns
    Marker,
}

/// Training Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TrainingOptions {
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub train_fraction: f64,
    #[validate(length(min = 1))]
    pub target_column: String,
    pub feature_selection: FeatureSelection,
    #[validate(length(min = 1))]
    pub marker: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub forest: ForestParams,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            train_fraction: 0.85,
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            feature_selection: FeatureSelection::default(),
            marker: DEFAULT_FEATURE_MARKER.to_string(),
            forest: ForestParams::default(),
        }
    }
}

/// A freshly fitted model and everything the store records about it.
#[derive(Debug)]
pub struct TrainedModel {
    pub model: SmartcoreRandomForest,
    pub feature_names: Vec<String>,
    pub target: Option<String>,
    pub feature_selection: FeatureSelection,
    pub training_samples: usize,
    pub metrics: Option<ValidationMetrics>,
}

/// Number of leading rows used for training.
pub fn split_index(rows: usize, train_fraction: f64) -> usize {
    ((rows as f64 * train_fraction).floor() as usize).min(rows)
}

/// Feature columns of a derived frame, in frame column order.
pub fn select_features(
    frame: &ForecastFrame,
    selection: FeatureSelection,
    target: &str,
    marker: &str,
) -> Vec<String> {
    let mut names: Vec<String> = match selection {
        FeatureSelection::ExcludeByName => frame
            .columns()
            .iter()
            .filter(|c| c.as_str() != target)
            .cloned()
            .collect(),
        FeatureSelection::Marker => frame
            .columns()
            .iter()
            .filter(|c| c.as_str() != target && c.contains(marker))
            .cloned()
            .collect(),
    };

    if selection == FeatureSelection::Marker {
        for derived in DERIVED_COLUMNS {
            if !names.iter().any(|n| n == derived) {
                names.push(derived.to_string());
            }
        }
    }
    names
}

/// Fit a model from historical rows.
///
/// # Errors
///
/// - `InvalidTrainFraction` unless `0 < train_fraction <= 1`
/// - `MissingTimestamp` from feature derivation
/// - `MissingTarget` if the target column is absent
/// - `InsufficientData` if the training split is empty
/// - `NonNumericValue` for an empty feature or target cell in the training split
pub fn train(frame: &ForecastFrame, options: &TrainingOptions) -> Result<TrainedModel> {
    let fraction = options.train_fraction;
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(ForecastError::InvalidTrainFraction(fraction));
    }

    let derived = derive_features(frame)?;
    let target = options.target_column.as_str();
    if !derived.has_column(target) {
        return Err(ForecastError::MissingTarget(target.to_string()));
    }

    let feature_names = select_features(
        &derived,
        options.feature_selection,
        target,
        &options.marker,
    );

    let split = split_index(derived.len(), fraction);
    if split == 0 {
        return Err(ForecastError::InsufficientData {
            rows: derived.len(),
            train_fraction: fraction,
        });
    }
    let (train_rows, holdout_rows) = derived.split_at(split);

    let x_train = train_rows.feature_matrix(&feature_names)?;
    let y_train = target_values(&train_rows, target)?;

    tracing::info!(
        rows = derived.len(),
        training_rows = split,
        features = feature_names.len(),
        selection = ?options.feature_selection,
        "training random forest"
    );
    let model = SmartcoreRandomForest::fit(&x_train, &y_train, options.forest)?;

    let metrics = evaluate(&model, &holdout_rows, &feature_names, target, true)
        .or_else(|| evaluate(&model, &train_rows, &feature_names, target, false));
    if let Some(m) = &metrics {
        tracing::info!(
            mae = m.mae,
            rmse = m.rmse,
            mape = m.mape,
            r2 = m.r2,
            holdout = m.holdout,
            "model validation metrics"
        );
    }

    Ok(TrainedModel {
        model,
        feature_names,
        target: Some(target.to_string()),
        feature_selection: options.feature_selection,
        training_samples: split,
        metrics,
    })
}

fn target_values(frame: &ForecastFrame, target: &str) -> Result<Vec<f64>> {
    let rows = frame.feature_matrix(&[target.to_string()])?;
    Ok(rows.into_iter().map(|r| r[0]).collect())
}

/// Score `model` on the complete rows of `frame`. Rows with an empty feature
/// or target cell are skipped; `None` when nothing is left to score.
fn evaluate(
    model: &SmartcoreRandomForest,
    frame: &ForecastFrame,
    feature_names: &[String],
    target: &str,
    holdout: bool,
) -> Option<ValidationMetrics> {
    let mut required = feature_names.to_vec();
    required.push(target.to_string());
    let complete = frame.filter(|_, row| frame.row_is_complete(row, &required));
    if complete.is_empty() {
        return None;
    }

    let x = complete.feature_matrix(feature_names).ok()?;
    let y = target_values(&complete, target).ok()?;
    let predictions = match model.predict(&x) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "could not score model");
            return None;
        }
    };

    calculate_metrics(&predictions, &y)
        .ok()
        .map(|m| ValidationMetrics { holdout, ..m })
}

/// Calculate validation metrics
pub fn calculate_metrics(predictions: &[f64], targets: &[f64]) -> Result<ValidationMetrics> {
    if predictions.len() != targets.len() {
        return Err(ForecastError::Model(
            "prediction and target count mismatch".to_string(),
        ));
    }
    if predictions.is_empty() {
        return Err(ForecastError::Model("no predictions to evaluate".to_string()));
    }

    let n = predictions.len() as f64;

    let mae: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / n;

    let mse: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / n;
    let rmse = mse.sqrt();

    // Zero targets are skipped
    let nonzero: Vec<f64> = predictions
        .iter()
        .zip(targets)
        .filter(|(_, t)| t.abs() > 1e-10)
        .map(|(p, t)| ((p - t) / t).abs() * 100.0)
        .collect();
    let mape = if nonzero.is_empty() {
        0.0
    } else {
        nonzero.iter().sum::<f64>() / nonzero.len() as f64
    };

    let mean_target: f64 = targets.iter().sum::<f64>() / n;
    let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();
    let ss_res: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (t - p).powi(2))
        .sum();

    let r2 = if ss_tot.abs() < 1e-10 {
        0.0
    } else {
        1.0 - (ss_res / ss_tot)
    };

    Ok(ValidationMetrics {
        mae,
        rmse,
        mape,
        r2,
        samples: predictions.len(),
        holdout: true,
    })
}
