//! Forward time-horizon selection over a timestamp-indexed frame.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::ForecastFrame;
use crate::error::{ForecastError, Result};

/// Upper-bound policy of the forecast window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowBound {
    /// `start <= ts < end`
    #[default]
    HalfOpen,
    /// `start <= ts <= end`
    Closed,
}

/// A resolved horizon: `[start, start + horizon_days)` or its closed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub bound: WindowBound,
}

impl Window {
    pub fn new(start: NaiveDateTime, horizon_days: u32, bound: WindowBound) -> Result<Self> {
        if horizon_days == 0 {
            return Err(ForecastError::InvalidHorizon(horizon_days));
        }
        let end = start
            .checked_add_signed(Duration::days(i64::from(horizon_days)))
            .unwrap_or(NaiveDateTime::MAX);
        Ok(Self { start, end, bound })
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        if ts < self.start {
            return false;
        }
        match self.bound {
            WindowBound::HalfOpen => ts < self.end,
            WindowBound::Closed => ts <= self.end,
        }
    }
}

/// Keep the rows within `horizon_days` of the earliest timestamp.
///
/// The start is the minimum timestamp over all rows, not the first row, so
/// unsorted input is handled. Surviving rows keep their input order. A window
/// that matches nothing yields an empty frame.
///
/// # Errors
///
/// - `InvalidHorizon` if `horizon_days` is zero
/// - `EmptyInput` if the frame has no rows
/// - `MissingTimestamp` if any row's timestamp is unparseable
pub fn select_window(
    frame: &ForecastFrame,
    horizon_days: u32,
    bound: WindowBound,
) -> Result<ForecastFrame> {
    if horizon_days == 0 {
        return Err(ForecastError::InvalidHorizon(horizon_days));
    }
    if frame.is_empty() {
        return Err(ForecastError::EmptyInput);
    }

    let timestamps = frame.timestamps()?;
    let start = timestamps
        .iter()
        .copied()
        .min()
        .ok_or(ForecastError::EmptyInput)?;
    let window = Window::new(start, horizon_days, bound)?;

    let selected = frame.filter(|i, _| window.contains(timestamps[i]));
    tracing::debug!(
        start = %window.start,
        end = %window.end,
        bound = ?window.bound,
        input_rows = frame.len(),
        kept_rows = selected.len(),
        "selected forecast window"
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn hourly_frame(hours: i64) -> ForecastFrame {
        let mut frame = ForecastFrame::new(["forecast_temperature"]);
        for h in 0..hours {
            frame.push_row(base() + Duration::hours(h), vec![Some(h as f64)]);
        }
        frame
    }

    #[test]
    fn test_half_open_excludes_upper_bound() {
        let selected = select_window(&hourly_frame(48), 1, WindowBound::HalfOpen).unwrap();
        assert_eq!(selected.len(), 24);
        let ts = selected.timestamps().unwrap();
        assert_eq!(ts.first(), Some(&base()));
        assert_eq!(ts.last(), Some(&(base() + Duration::hours(23))));
    }

    #[test]
    fn test_closed_includes_upper_bound() {
        let selected = select_window(&hourly_frame(48), 1, WindowBound::Closed).unwrap();
        assert_eq!(selected.len(), 25);
    }

    #[test]
    fn test_start_is_minimum_timestamp() {
        let mut frame = ForecastFrame::new(["v"]);
        frame.push_row(base() + Duration::hours(30), vec![Some(1.0)]);
        frame.push_row(base(), vec![Some(2.0)]);
        frame.push_row(base() + Duration::hours(5), vec![Some(3.0)]);

        let selected = select_window(&frame, 1, WindowBound::HalfOpen).unwrap();
        assert_eq!(selected.column("v"), Some(vec![Some(2.0), Some(3.0)]));
    }

    #[test]
    fn test_empty_input_is_error() {
        let frame = ForecastFrame::new(["v"]);
        assert!(matches!(
            select_window(&frame, 1, WindowBound::HalfOpen),
            Err(ForecastError::EmptyInput)
        ));
    }

    #[test]
    fn test_zero_horizon_is_error() {
        assert!(matches!(
            select_window(&hourly_frame(2), 0, WindowBound::HalfOpen),
            Err(ForecastError::InvalidHorizon(0))
        ));
    }

    #[test]
    fn test_horizon_longer_than_data_keeps_everything() {
        let selected = select_window(&hourly_frame(10), 30, WindowBound::HalfOpen).unwrap();
        assert_eq!(selected.len(), 10);
    }

    proptest! {
        #[test]
        fn prop_window_rows_are_in_range_and_ordered(
            offsets in proptest::collection::vec(0i64..(10 * 24 * 60), 1..60),
            horizon in 1u32..5,
        ) {
            let mut frame = ForecastFrame::new(["idx"]);
            for (i, minutes) in offsets.iter().enumerate() {
                frame.push_row(base() + Duration::minutes(*minutes), vec![Some(i as f64)]);
            }

            let selected = select_window(&frame, horizon, WindowBound::HalfOpen).unwrap();
            let start = base() + Duration::minutes(*offsets.iter().min().unwrap());
            let end = start + Duration::days(i64::from(horizon));

            for ts in selected.timestamps().unwrap() {
                prop_assert!(start <= ts && ts < end);
            }

            // Order-preserving subsequence: original indices strictly increase.
            let kept: Vec<f64> = selected
                .column("idx")
                .unwrap()
                .into_iter()
                .map(|v| v.unwrap())
                .collect();
            prop_assert!(kept.windows(2).all(|w| w[0] < w[1]));

            let expected = offsets
                .iter()
                .filter(|m| {
                    let ts = base() + Duration::minutes(**m);
                    start <= ts && ts < end
                })
                .count();
            prop_assert_eq!(kept.len(), expected);
        }
    }
}
