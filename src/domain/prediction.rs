use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Predicted load for one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictedLoad {
    pub event_timestamp: NaiveDateTime,
    #[serde(rename = "predicted_load_MW")]
    pub predicted_load_mw: f64,
}

/// Ordered predictions, one per row that survived the window filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionResult {
    points: Vec<PredictedLoad>,
}

/// Headline statistics shown next to the load chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub count: usize,
    pub mean_mw: Option<f64>,
    pub max_mw: Option<f64>,
    pub min_mw: Option<f64>,
}

impl PredictionResult {
    pub fn new(points: Vec<PredictedLoad>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[PredictedLoad] {
        &self.points
    }

    pub fn into_points(self) -> Vec<PredictedLoad> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn summary(&self) -> PredictionSummary {
        let values = self.points.iter().map(|p| p.predicted_load_mw);
        let count = self.points.len();

        if count == 0 {
            return PredictionSummary {
                count,
                mean_mw: None,
                max_mw: None,
                min_mw: None,
            };
        }

        let mean = values.clone().sum::<f64>() / count as f64;
        let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
        let min = values.fold(f64::INFINITY, f64::min);

        PredictionSummary {
            count,
            mean_mw: Some(mean),
            max_mw: Some(max),
            min_mw: Some(min),
        }
    }

    /// Midnights strictly after the earliest prediction and no later than the
    /// latest one, for day-boundary markers on a time-series chart.
    pub fn day_boundaries(&self) -> Vec<NaiveDateTime> {
        let (Some(first), Some(last)) = (
            self.points.iter().map(|p| p.event_timestamp).min(),
            self.points.iter().map(|p| p.event_timestamp).max(),
        ) else {
            return Vec::new();
        };

        let mut boundaries = Vec::new();
        let mut day = first.date();
        while let Some(next) = day.succ_opt() {
            let Some(midnight) = next.and_hms_opt(0, 0, 0) else {
                break;
            };
            if midnight > last {
                break;
            }
            boundaries.push(midnight);
            day = next;
        }
        boundaries
    }

    /// Time covered from the first to the last prediction.
    pub fn span(&self) -> Option<Duration> {
        let first = self.points.first()?.event_timestamp;
        let last = self.points.last()?.event_timestamp;
        Some(last - first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hourly(start_day: u32, hours: i64, value: impl Fn(i64) -> f64) -> PredictionResult {
        let start = NaiveDate::from_ymd_opt(2025, 1, start_day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        PredictionResult::new(
            (0..hours)
                .map(|h| PredictedLoad {
                    event_timestamp: start + Duration::hours(h),
                    predicted_load_mw: value(h),
                })
                .collect(),
        )
    }

    #[test]
    fn test_summary_statistics() {
        let result = hourly(1, 4, |h| 100.0 + h as f64 * 10.0);
        let summary = result.summary();

        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean_mw, Some(115.0));
        assert_eq!(summary.max_mw, Some(130.0));
        assert_eq!(summary.min_mw, Some(100.0));
    }

    #[test]
    fn test_summary_of_empty_result() {
        let summary = PredictionResult::default().summary();
        assert_eq!(summary.count, 0);
        assert!(summary.mean_mw.is_none());
        assert!(summary.max_mw.is_none());
    }

    #[test]
    fn test_day_boundaries() {
        let result = hourly(1, 72, |_| 1.0);
        let boundaries = result.day_boundaries();

        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].to_string(), "2025-01-02 00:00:00");
        assert_eq!(boundaries[1].to_string(), "2025-01-03 00:00:00");

        assert!(hourly(1, 24, |_| 1.0).day_boundaries().is_empty());
        assert!(PredictionResult::default().day_boundaries().is_empty());
    }

    #[test]
    fn test_serializes_with_output_column_names() {
        let result = hourly(1, 1, |_| 42.5);
        let json = serde_json::to_string(&result.points()[0]).unwrap();
        assert!(json.contains("\"event_timestamp\":\"2025-01-01T00:00:00\""));
        assert!(json.contains("\"predicted_load_MW\":42.5"));
    }

    #[test]
    fn test_span() {
        assert_eq!(hourly(1, 24, |_| 1.0).span(), Some(Duration::hours(23)));
        assert!(PredictionResult::default().span().is_none());
    }
}
