//! Retrain-while-predicting: readers must always see a complete generation.

mod common;

use std::sync::Arc;

use load_forecast::io::read_frame;
use tempfile::TempDir;
use tokio::task::JoinSet;

use common::{history_csv, test_config, weather_csv};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_predictions_survive_concurrent_retrains() {
    let dir = TempDir::new().unwrap();
    let mut cfg = test_config(&dir);
    cfg.store.retain_generations = 2;
    let pipeline = cfg.pipeline();

    let history = Arc::new(read_frame(history_csv(24 * 7).as_bytes()).unwrap());
    let weather = Arc::new(read_frame(weather_csv(48).as_bytes()).unwrap());
    pipeline.retrain(&history, &cfg.training).unwrap();

    let mut tasks = JoinSet::new();
    for i in 0..12 {
        let pipeline = pipeline.clone();
        let history = Arc::clone(&history);
        let weather = Arc::clone(&weather);
        let training = cfg.training.clone();
        tasks.spawn_blocking(move || {
            if i % 4 == 0 {
                pipeline.retrain(&history, &training).map(|_| 0)
            } else {
                pipeline.predict(&weather, 1).map(|r| r.len())
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let rows = joined.unwrap().unwrap();
        assert!(rows == 0 || rows == 24);
    }

    let store = cfg.model_store();
    let current = store.current_generation().unwrap().unwrap();
    assert!(store.generations().unwrap().contains(&current));
    assert!(store.load().is_ok());
}
