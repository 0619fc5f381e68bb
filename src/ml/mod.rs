//! Machine Learning Module
//!
//! Load regression models for the forecast pipeline:
//! - Random forest wrapper around smartcore
//! - Training with a positional train/holdout split
//! - Versioned on-disk model store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod smartcore;
pub mod store;
pub mod training;

pub use self::smartcore::{ForestParams, SmartcoreRandomForest};
pub use store::{LoadedModel, ModelStore};
pub use training::{
    calculate_metrics, select_features, split_index, train, FeatureSelection, TrainedModel,
    TrainingOptions,
};

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    RandomForest,
}

/// Validation Metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub mae: f64,  // Mean Absolute Error
    pub rmse: f64, // Root Mean Square Error
    pub mape: f64, // Mean Absolute Percentage Error
    pub r2: f64,   // R-squared
    /// Rows the metrics were computed on
    pub samples: usize,
    /// False when there were no holdout rows and the training rows were scored
    pub holdout: bool,
}

/// Contents of `metadata.json` in a model generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub generation: String,
    pub model_type: ModelType,
    pub trained_at: DateTime<Utc>,
    pub training_samples: usize,
    /// Feature columns in the order the model expects them
    pub features: Vec<String>,
    pub target: Option<String>,
    pub feature_selection: FeatureSelection,
    pub params: ForestParams,
    pub metrics: Option<ValidationMetrics>,
}

/// A fitted regressor mapping feature rows to megawatts.
pub trait LoadModel: Send + Sync {
    /// Predict one value per row of `x`, in row order.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    fn model_type(&self) -> ModelType;
}
