//! Feature engineering for load forecasting models
//!
//! Calendar features are derived from each row's `event_timestamp` and written
//! into the frame next to the weather covariates.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::domain::ForecastFrame;
use crate::error::Result;

pub const HOUR_COLUMN: &str = "hour";
pub const DAY_OF_WEEK_COLUMN: &str = "day_of_week";
pub const IS_WEEKEND_COLUMN: &str = "is_weekend";

/// Derived columns, in the order they are appended to a frame.
pub const DERIVED_COLUMNS: [&str; 3] = [HOUR_COLUMN, DAY_OF_WEEK_COLUMN, IS_WEEKEND_COLUMN];

/// Calendar features for one timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFeatures {
    /// Hour of day (0-23)
    pub hour: u32,
    /// Day of week (0=Monday, 6=Sunday)
    pub day_of_week: u32,
    /// Saturday or Sunday
    pub is_weekend: bool,
}

impl DerivedFeatures {
    pub fn from_timestamp(timestamp: &NaiveDateTime) -> Self {
        let day_of_week = timestamp.weekday().num_days_from_monday();
        Self {
            hour: timestamp.hour(),
            day_of_week,
            is_weekend: day_of_week >= 5,
        }
    }

    /// Numeric encoding in `DERIVED_COLUMNS` order.
    pub fn to_values(&self) -> [f64; 3] {
        [
            self.hour as f64,
            self.day_of_week as f64,
            if self.is_weekend { 1.0 } else { 0.0 },
        ]
    }
}

/// Add (or overwrite) `hour`, `day_of_week` and `is_weekend` on every row.
///
/// Pure per row and idempotent: running it on its own output changes nothing.
///
/// # Errors
///
/// `MissingTimestamp` if any row's timestamp is absent or unparseable. No
/// partial frame is returned.
pub fn derive_features(frame: &ForecastFrame) -> Result<ForecastFrame> {
    // Validates every row before anything is written.
    frame.timestamps()?;

    let mut derived = frame.clone();
    for (slot, column) in DERIVED_COLUMNS.iter().enumerate() {
        derived.set_column_with(column, |row| {
            row.timestamp()
                .map(|ts| DerivedFeatures::from_timestamp(&ts).to_values()[slot])
        });
    }

    tracing::debug!(rows = derived.len(), "derived calendar features");
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventTimestamp;
    use crate::error::ForecastError;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_from_timestamp() {
        // 2025-01-01 is a Wednesday
        let f = DerivedFeatures::from_timestamp(&at(2025, 1, 1, 13));
        assert_eq!(f.hour, 13);
        assert_eq!(f.day_of_week, 2);
        assert!(!f.is_weekend);

        let sat = DerivedFeatures::from_timestamp(&at(2025, 1, 4, 0));
        assert_eq!(sat.day_of_week, 5);
        assert!(sat.is_weekend);

        let sun = DerivedFeatures::from_timestamp(&at(2025, 1, 5, 23));
        assert_eq!(sun.day_of_week, 6);
        assert!(sun.is_weekend);

        let mon = DerivedFeatures::from_timestamp(&at(2025, 1, 6, 0));
        assert_eq!(mon.day_of_week, 0);
        assert!(!mon.is_weekend);
    }

    #[test]
    fn test_derive_appends_columns_after_covariates() {
        let mut frame = ForecastFrame::new(["forecast_temperature"]);
        frame.push_row(at(2025, 1, 4, 18), vec![Some(3.5)]);

        let derived = derive_features(&frame).unwrap();
        assert_eq!(
            derived.columns(),
            &["forecast_temperature", "hour", "day_of_week", "is_weekend"]
        );
        assert_eq!(
            derived.rows()[0].values,
            vec![Some(3.5), Some(18.0), Some(5.0), Some(1.0)]
        );
    }

    #[test]
    fn test_derive_overwrites_existing_columns() {
        let mut frame = ForecastFrame::new(["hour", "forecast_wind"]);
        frame.push_row(at(2025, 1, 1, 7), vec![Some(99.0), Some(4.0)]);

        let derived = derive_features(&frame).unwrap();
        assert_eq!(
            derived.columns(),
            &["hour", "forecast_wind", "day_of_week", "is_weekend"]
        );
        assert_eq!(derived.column("hour"), Some(vec![Some(7.0)]));
    }

    #[test]
    fn test_derive_rejects_unparseable_timestamp() {
        let mut frame = ForecastFrame::new(["forecast_temperature"]);
        frame.push_row(at(2025, 1, 1, 0), vec![Some(1.0)]);
        frame.push_row(EventTimestamp::parse("2025-02-30 00:00"), vec![Some(1.0)]);

        let err = derive_features(&frame).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::MissingTimestamp { row: Some(1), .. }
        ));
    }

    #[test]
    fn test_derive_on_empty_frame() {
        let frame = ForecastFrame::new(["forecast_temperature"]);
        let derived = derive_features(&frame).unwrap();
        assert!(derived.is_empty());
        assert_eq!(derived.columns().len(), 4);
    }

    proptest! {
        #[test]
        fn prop_derive_is_idempotent(
            offsets in proptest::collection::vec(0i64..(3 * 365 * 24 * 60), 0..40),
            temps in proptest::collection::vec(-30.0f64..45.0, 40),
        ) {
            let base = at(2024, 1, 1, 0);
            let mut frame = ForecastFrame::new(["forecast_temperature"]);
            for (i, minutes) in offsets.iter().enumerate() {
                frame.push_row(base + chrono::Duration::minutes(*minutes), vec![Some(temps[i])]);
            }

            let once = derive_features(&frame).unwrap();
            let twice = derive_features(&once).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
