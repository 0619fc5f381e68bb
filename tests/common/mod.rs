#![allow(dead_code)]

use std::fmt::Write;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use load_forecast::config::Config;
use load_forecast::ml::ForestParams;
use tempfile::TempDir;

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn temperature(hour: i64) -> f64 {
    4.0 + ((hour % 24) as f64 - 12.0).abs() * -0.5 + 6.0
}

/// Hourly weather forecast CSV starting at 2025-01-01T00:00:00.
pub fn weather_csv(hours: i64) -> String {
    let mut csv = String::from("event_timestamp,forecast_temperature,forecast_wind_speed\n");
    for h in 0..hours {
        let ts = start() + Duration::hours(h);
        writeln!(
            csv,
            "{},{:.2},{:.1}",
            ts.format("%Y-%m-%dT%H:%M:%S"),
            temperature(h),
            3.0 + (h % 5) as f64
        )
        .unwrap();
    }
    csv
}

/// Hourly history with a `load_MW` target that depends on temperature and hour.
pub fn history_csv(hours: i64) -> String {
    let mut csv =
        String::from("event_timestamp,forecast_temperature,forecast_wind_speed,load_MW\n");
    for h in 0..hours {
        let ts = start() - Duration::days(30) + Duration::hours(h);
        let temp = temperature(h);
        let load = 900.0 - temp * 15.0 + ((h % 24) as f64 - 3.0).max(0.0) * 12.0;
        writeln!(
            csv,
            "{},{:.2},{:.1},{:.1}",
            ts.format("%Y-%m-%d %H:%M:%S"),
            temp,
            3.0 + (h % 5) as f64,
            load
        )
        .unwrap();
    }
    csv
}

/// Configuration with an isolated store root and a small forest.
pub fn test_config(dir: &TempDir) -> Config {
    let mut cfg = Config::default();
    cfg.store.root = dir.path().join("models");
    cfg.store.retain_generations = 3;
    cfg.training.forest = ForestParams {
        n_trees: 10,
        max_depth: Some(8),
        ..ForestParams::default()
    };
    cfg
}
