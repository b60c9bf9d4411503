//! End-to-end monitoring flows: uploaded dataset windows through a
//! classifier, degradation paths, and window bounds over a long run.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tempfile::TempDir;

use focuspulse::{
    Classifier, ConfigPatch, FocusLabel, FocusMonitor, MonitorConfig, Prediction, SignalWindow,
};

/// Labels a window by the sign of its first sample.
struct FirstCellSign;

#[async_trait]
impl Classifier for FirstCellSign {
    async fn classify(&self, window: &SignalWindow) -> Result<Prediction> {
        let first = window.channels()[0][0];
        let label = if first >= 0.0 {
            FocusLabel::Focused
        } else {
            FocusLabel::Unfocused
        };
        Ok(Prediction {
            label,
            confidence: Some(0.75),
        })
    }
}

struct BrokenClassifier;

#[async_trait]
impl Classifier for BrokenClassifier {
    async fn classify(&self, _window: &SignalWindow) -> Result<Prediction> {
        bail!("model unavailable")
    }
}

fn write_dataset(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("session.csv");
    fs::write(&path, "1,2,3\n4,5,6\n7,8,9\n10,11,12\n").unwrap();
    path
}

#[tokio::test(start_paused = true)]
async fn file_mode_classifies_dataset_windows() {
    let dir = TempDir::new().unwrap();
    let path = write_dataset(&dir);

    let monitor = FocusMonitor::new(MonitorConfig::default());
    let rows = monitor.load_dataset(&path).await.unwrap();
    assert_eq!(rows, 4);
    monitor.set_classifier(Arc::new(FirstCellSign)).await;

    monitor.start().await;

    let snapshot = monitor.snapshot().await;
    assert_eq!(snapshot.samples.len(), 1);
    assert_eq!(snapshot.last_label, Some(FocusLabel::Focused));
    let prediction = snapshot.last_prediction.as_ref().expect("prediction");
    assert_eq!(prediction.confidence, Some(0.75));

    // six rows were cut from a four-row dataset, so the cursor wrapped
    let dataset = snapshot.dataset.expect("dataset attached");
    assert_eq!(dataset.row_count, 4);
    assert_eq!(dataset.cursor, 2);
    assert_eq!(dataset.file_name.as_deref(), Some("session.csv"));

    monitor.pause().await;
}

#[tokio::test(start_paused = true)]
async fn classifier_failure_degrades_to_a_random_label() {
    let dir = TempDir::new().unwrap();
    let path = write_dataset(&dir);

    let monitor = FocusMonitor::new(MonitorConfig::default());
    monitor.load_dataset(&path).await.unwrap();
    monitor.set_classifier(Arc::new(BrokenClassifier)).await;

    monitor.start().await;

    // monitoring never halts: the tick records a fallback label instead
    let snapshot = monitor.snapshot().await;
    assert_eq!(snapshot.samples.len(), 1);
    let prediction = snapshot.last_prediction.as_ref().expect("prediction");
    assert!(prediction.confidence.is_none());

    monitor.pause().await;
}

#[tokio::test(start_paused = true)]
async fn detached_dataset_falls_back_to_random_labels() {
    let dir = TempDir::new().unwrap();
    let path = write_dataset(&dir);

    let monitor = FocusMonitor::new(MonitorConfig::default());
    monitor.load_dataset(&path).await.unwrap();
    monitor.set_classifier(Arc::new(FirstCellSign)).await;
    monitor.detach_dataset().await;

    monitor.start().await;

    let snapshot = monitor.snapshot().await;
    assert_eq!(snapshot.samples.len(), 1);
    assert!(snapshot.dataset.is_none());

    monitor.pause().await;
}

#[tokio::test(start_paused = true)]
async fn window_stays_bounded_over_a_long_run() {
    let dir = TempDir::new().unwrap();
    let path = write_dataset(&dir);

    let config = MonitorConfig::resolve(ConfigPatch {
        update_interval_secs: Some(6),
        max_data_points: Some(5),
        ..ConfigPatch::default()
    });
    let monitor = FocusMonitor::new(config);
    monitor.load_dataset(&path).await.unwrap();
    monitor.set_classifier(Arc::new(FirstCellSign)).await;

    monitor.start().await;
    tokio::time::sleep(Duration::from_secs(63)).await;
    monitor.pause().await;

    let snapshot = monitor.snapshot().await;
    assert_eq!(snapshot.samples.len(), 5);
    assert!(snapshot
        .samples
        .iter()
        .all(|sample| sample.label == FocusLabel::Focused));
    assert_eq!(snapshot.stats.percentage, 100);

    // chronological order is preserved in the retained tail
    let timestamps: Vec<_> = snapshot.samples.iter().map(|s| s.captured_at).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}
