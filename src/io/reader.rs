use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::domain::{EventTimestamp, ForecastFrame, TIMESTAMP_COLUMN};
use crate::error::{ForecastError, Result};

/// Parse a CSV into a frame.
///
/// Column order follows the header. Cells that are empty or not a finite
/// number become absent values; they only fail later if a feature or the
/// target selects them.
///
/// # Errors
///
/// `MissingTimestamp` if the header has no `event_timestamp` column, `Csv` for
/// malformed input.
pub fn read_frame<R: Read>(reader: R) -> Result<ForecastFrame> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let ts_idx = headers
        .iter()
        .position(|h| h == TIMESTAMP_COLUMN)
        .ok_or_else(|| ForecastError::MissingTimestamp {
            row: None,
            value: headers.iter().collect::<Vec<_>>().join(","),
        })?;

    let value_columns: Vec<usize> = (0..headers.len()).filter(|&i| i != ts_idx).collect();
    let mut frame = ForecastFrame::new(value_columns.iter().map(|&i| &headers[i]));

    for record in rdr.records() {
        let record = record?;
        let timestamp = EventTimestamp::parse(record.get(ts_idx).unwrap_or_default());
        let values = value_columns
            .iter()
            .map(|&i| record.get(i).and_then(parse_number))
            .collect();
        frame.push_row(timestamp, values);
    }

    tracing::debug!(
        rows = frame.len(),
        columns = frame.columns().len(),
        "read CSV frame"
    );
    Ok(frame)
}

pub fn read_frame_path(path: impl AsRef<Path>) -> Result<ForecastFrame> {
    let file = File::open(path.as_ref())?;
    read_frame(BufReader::new(file))
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}
