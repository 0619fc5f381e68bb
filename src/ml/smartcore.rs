//! SmartCore ML Model Wrapper
//!
//! Wraps smartcore's `RandomForestRegressor` behind [`LoadModel`] and handles
//! its bincode encoding for the model store.

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use validator::Validate;

use super::{LoadModel, ModelType};
use crate::error::{ForecastError, Result};

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Random forest hyperparameters.
///
/// The seed is fixed so that the same data always yields the same forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ForestParams {
    #[validate(range(min = 1))]
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    #[validate(range(min = 2))]
    pub min_samples_split: usize,
    #[validate(range(min = 1))]
    pub min_samples_leaf: usize,
    /// Features tried at each split; all of them when unset
    #[validate(range(min = 1))]
    pub features_per_split: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            features_per_split: None,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn to_smartcore(self, n_features: usize) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            min_samples_split: self.min_samples_split,
            n_trees: self.n_trees,
            m: Some(self.features_per_split.unwrap_or(n_features).min(n_features)),
            keep_samples: false,
            seed: self.seed,
        }
    }
}

/// SmartCore RandomForest Model Wrapper
pub struct SmartcoreRandomForest {
    model: Forest,
    params: ForestParams,
}

impl std::fmt::Debug for SmartcoreRandomForest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartcoreRandomForest")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl SmartcoreRandomForest {
    /// Fit a forest on row-major `x` against `y`.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: ForestParams) -> Result<Self> {
        if x.is_empty() || y.is_empty() {
            return Err(ForecastError::Model(
                "cannot train on an empty dataset".to_string(),
            ));
        }
        if x.len() != y.len() {
            return Err(ForecastError::Model(format!(
                "feature and target count mismatch: {} rows, {} targets",
                x.len(),
                y.len()
            )));
        }

        let x_matrix = to_matrix(x)?;
        let model = Forest::fit(&x_matrix, &y.to_vec(), params.to_smartcore(x[0].len()))
            .map_err(|e| ForecastError::Model(format!("random forest training failed: {e}")))?;

        Ok(Self { model, params })
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    /// Encode the fitted forest for `model.bin`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(&(&self.params, &self.model))
            .map_err(|e| ForecastError::Serialization(format!("failed to serialize model: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (params, model): (ForestParams, Forest) = bincode::deserialize(bytes)
            .map_err(|e| ForecastError::Serialization(format!("failed to deserialize model: {e}")))?;
        Ok(Self { model, params })
    }
}

impl LoadModel for SmartcoreRandomForest {
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let x_matrix = to_matrix(x)?;
        self.model
            .predict(&x_matrix)
            .map_err(|e| ForecastError::Model(format!("prediction failed: {e}")))
    }

    fn model_type(&self) -> ModelType {
        ModelType::RandomForest
    }
}

fn to_matrix(x: &[Vec<f64>]) -> Result<DenseMatrix<f64>> {
    let n_samples = x.len();
    let n_features = x.first().map(Vec::len).unwrap_or(0);
    if n_features == 0 {
        return Err(ForecastError::Model(
            "feature matrix has no columns".to_string(),
        ));
    }

    let mut flat_data = Vec::with_capacity(n_samples * n_features);
    for row in x {
        if row.len() != n_features {
            return Err(ForecastError::Model(
                "all feature vectors must have the same length".to_string(),
            ));
        }
        flat_data.extend_from_slice(row);
    }

    Ok(DenseMatrix::new(n_samples, n_features, flat_data, false))
}
