use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{PredictionResult, TIMESTAMP_COLUMN};
use crate::error::{ForecastError, Result};

pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const PREDICTION_COLUMN: &str = "predicted_load_MW";

/// Write `event_timestamp,predicted_load_MW` rows, header first.
pub fn write_predictions<W: Write>(writer: W, result: &PredictionResult) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([TIMESTAMP_COLUMN, PREDICTION_COLUMN])?;
    for point in result.points() {
        wtr.write_record([
            point.event_timestamp.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
            point.predicted_load_mw.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_predictions_path(path: impl AsRef<Path>, result: &PredictionResult) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_predictions(file, result)
}

/// Predictions rendered as a CSV string.
pub fn predictions_to_csv(result: &PredictionResult) -> Result<String> {
    let mut buf = Vec::new();
    write_predictions(&mut buf, result)?;
    String::from_utf8(buf).map_err(|e| ForecastError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PredictedLoad;
    use chrono::NaiveDate;

    #[test]
    fn test_output_has_exact_columns() {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap();
        let result = PredictionResult::new(vec![PredictedLoad {
            event_timestamp: ts,
            predicted_load_mw: 1234.5,
        }]);

        let csv = predictions_to_csv(&result).unwrap();
        assert_eq!(csv, "event_timestamp,predicted_load_MW\n2025-01-01T06:30:00,1234.5\n");
    }

    #[test]
    fn test_empty_result_still_has_header() {
        let csv = predictions_to_csv(&PredictionResult::default()).unwrap();
        assert_eq!(csv, "event_timestamp,predicted_load_MW\n");
    }
}
