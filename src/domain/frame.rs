//! Timestamp-indexed weather forecast table
//!
//! A [`ForecastFrame`] holds one [`ForecastRow`] per observation. The
//! `event_timestamp` key is kept apart from the numeric covariate columns,
//! whose names are stored once, in input (header) order.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{ForecastError, Result};

/// Name of the join/ordering key column.
pub const TIMESTAMP_COLUMN: &str = "event_timestamp";

/// Offset-aware layouts; the wall-clock time in the given offset is kept.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Parse the timestamp layouts accepted in forecast files.
///
/// Returns `None` for empty or unrecognised text.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
            return Some(ts.naive_local());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// The `event_timestamp` of a row, as read.
///
/// Unparseable text is carried along instead of being dropped so that the
/// feature deriver can reject the row with the offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTimestamp {
    Parsed(NaiveDateTime),
    Invalid(String),
}

impl EventTimestamp {
    pub fn parse(raw: &str) -> Self {
        match parse_timestamp(raw) {
            Some(ts) => Self::Parsed(ts),
            None => Self::Invalid(raw.to_string()),
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Parsed(ts) => Some(*ts),
            Self::Invalid(_) => None,
        }
    }
}

impl From<NaiveDateTime> for EventTimestamp {
    fn from(ts: NaiveDateTime) -> Self {
        Self::Parsed(ts)
    }
}

/// One timestamped observation.
///
/// `values[i]` belongs to the frame's `columns()[i]`; `None` marks an empty or
/// non-numeric cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub event_timestamp: EventTimestamp,
    pub values: Vec<Option<f64>>,
}

impl ForecastRow {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.event_timestamp.as_datetime()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastFrame {
    columns: Vec<String>,
    rows: Vec<ForecastRow>,
}

impl ForecastFrame {
    /// Create an empty frame with the given covariate columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. `values` is padded with `None` (or truncated) to the
    /// frame's column count.
    pub fn push_row(&mut self, event_timestamp: impl Into<EventTimestamp>, mut values: Vec<Option<f64>>) {
        values.resize(self.columns.len(), None);
        self.rows.push(ForecastRow {
            event_timestamp: event_timestamp.into(),
            values,
        });
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row.values[idx]).collect())
    }

    /// Overwrite `name` with values computed per row, appending the column
    /// when the frame does not have it yet.
    pub fn set_column_with<F>(&mut self, name: &str, mut value: F)
    where
        F: FnMut(&ForecastRow) -> Option<f64>,
    {
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.values.push(None);
                }
                self.columns.len() - 1
            }
        };

        for row in &mut self.rows {
            let v = value(&*row);
            row.values[idx] = v;
        }
    }

    /// Parsed timestamps of every row, in row order.
    ///
    /// # Errors
    ///
    /// `MissingTimestamp` naming the first row whose timestamp is absent or
    /// unparseable.
    pub fn timestamps(&self) -> Result<Vec<NaiveDateTime>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| match &row.event_timestamp {
                EventTimestamp::Parsed(ts) => Ok(*ts),
                EventTimestamp::Invalid(raw) => Err(ForecastError::MissingTimestamp {
                    row: Some(i),
                    value: raw.clone(),
                }),
            })
            .collect()
    }

    /// Keep the rows for which `keep(index, row)` is true, preserving order.
    pub fn filter<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(usize, &ForecastRow) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .enumerate()
                .filter(|(i, row)| keep(*i, row))
                .map(|(_, row)| row.clone())
                .collect(),
        }
    }

    /// Split by position into `[0, idx)` and `[idx, len)`.
    pub fn split_at(&self, idx: usize) -> (Self, Self) {
        let idx = idx.min(self.rows.len());
        let (head, tail) = self.rows.split_at(idx);
        (
            Self {
                columns: self.columns.clone(),
                rows: head.to_vec(),
            },
            Self {
                columns: self.columns.clone(),
                rows: tail.to_vec(),
            },
        )
    }

    /// Row-major feature matrix with columns in exactly `names` order.
    ///
    /// # Errors
    ///
    /// - `MissingFeature` for the first name that is not a column
    /// - `NonNumericValue` for the first empty cell among the selected columns
    pub fn feature_matrix(&self, names: &[String]) -> Result<Vec<Vec<f64>>> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| ForecastError::MissingFeature(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        self.rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                indices
                    .iter()
                    .zip(names)
                    .map(|(&col, name)| {
                        row.values[col].ok_or_else(|| ForecastError::NonNumericValue {
                            column: name.clone(),
                            row: row_idx,
                        })
                    })
                    .collect::<Result<Vec<f64>>>()
            })
            .collect()
    }

    /// True when every one of `names` exists and holds a number in `row`.
    pub fn row_is_complete(&self, row: &ForecastRow, names: &[String]) -> bool {
        names.iter().all(|name| {
            self.column_index(name)
                .and_then(|idx| row.values[idx])
                .is_some()
        })
    }
}
