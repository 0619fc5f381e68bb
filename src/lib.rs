//! Weather-driven electricity load forecasting.
//!
//! Raw weather rows go through the feature deriver and the window selector,
//! then the current model from the [`ml::ModelStore`] predicts megawatts for
//! every row left in the window.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod io;
pub mod ml;
pub mod telemetry;

pub use error::{ForecastError, Result};
