use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = ForecastError> = std::result::Result<T, E>;

/// Errors raised by the forecasting core.
///
/// Every variant is terminal for the invocation that produced it: the core
/// never retries and never returns partial results. Row indices are zero-based
/// positions among the data rows (the CSV header is not counted).
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("missing or unparseable event_timestamp{}: {value:?}", row_label(.row))]
    MissingTimestamp { row: Option<usize>, value: String },

    #[error("input contains no rows")]
    EmptyInput,

    #[error("no model has been saved under {}", .root.display())]
    ModelNotFound { root: PathBuf },

    #[error("required feature column `{0}` is missing from the input")]
    MissingFeature(String),

    #[error("training split is empty ({rows} rows at train_fraction {train_fraction})")]
    InsufficientData { rows: usize, train_fraction: f64 },

    #[error("horizon_days must be a positive number of days, got {0}")]
    InvalidHorizon(u32),

    #[error("train_fraction must be in (0, 1], got {0}")]
    InvalidTrainFraction(f64),

    #[error("target column `{0}` is missing from the training data")]
    MissingTarget(String),

    #[error("column `{column}` has an empty or non-numeric value at row {row}")]
    NonNumericValue { column: String, row: usize },

    #[error("model store at {} is corrupt: {reason}", .root.display())]
    CorruptStore { root: PathBuf, reason: String },

    #[error("model error: {0}")]
    Model(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForecastError {
    /// True when the error was caused by the caller's input rather than by the
    /// store or the model runtime.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingTimestamp { .. }
                | Self::EmptyInput
                | Self::MissingFeature(_)
                | Self::InsufficientData { .. }
                | Self::InvalidHorizon(_)
                | Self::InvalidTrainFraction(_)
                | Self::MissingTarget(_)
                | Self::NonNumericValue { .. }
                | Self::Csv(_)
        )
    }
}

fn row_label(row: &Option<usize>) -> String {
    match row {
        Some(row) => format!(" at row {row}"),
        None => String::new(),
    }
}
