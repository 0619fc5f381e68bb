//! CSV ingestion and export
//!
//! Weather forecasts and training history arrive as CSV with an
//! `event_timestamp` column; predictions leave as CSV with exactly
//! `event_timestamp,predicted_load_MW`.

pub mod reader;
pub mod writer;

pub use reader::{read_frame, read_frame_path};
pub use writer::{predictions_to_csv, write_predictions, write_predictions_path, OUTPUT_TIMESTAMP_FORMAT};
