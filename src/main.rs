use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use tokio::sync::watch;

use focuspulse::{
    Classifier, FocusLabel, FocusMonitor, MonitorConfig, MonitorEvent, MonitorPreset, Prediction,
    SignalWindow,
};

/// Stand-in classifier for running the demo without a model server:
/// labels a window focused when its mean absolute amplitude clears a
/// threshold.
struct AmplitudeClassifier {
    threshold: f64,
}

#[async_trait]
impl Classifier for AmplitudeClassifier {
    async fn classify(&self, window: &SignalWindow) -> Result<Prediction> {
        let (sum, count) = window
            .channels()
            .iter()
            .flatten()
            .fold((0.0_f64, 0_usize), |(sum, count), v| (sum + v.abs(), count + 1));
        let mean = if count > 0 { sum / count as f64 } else { 0.0 };

        let label = if mean >= self.threshold {
            FocusLabel::Focused
        } else {
            FocusLabel::Unfocused
        };
        Ok(Prediction {
            label,
            confidence: Some((mean - self.threshold).abs().min(1.0)),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = MonitorConfig::resolve(MonitorPreset::Demo.patch());
    let monitor = FocusMonitor::new(config);

    if let Some(path) = std::env::args().nth(1) {
        let rows = monitor.load_dataset(Path::new(&path)).await?;
        monitor
            .set_classifier(Arc::new(AmplitudeClassifier { threshold: 0.5 }))
            .await;
        info!("Classifying {} uploaded rows from {}", rows, path);
    } else {
        info!("No dataset supplied, running on random labels");
    }

    let mut events = monitor.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let MonitorEvent::SessionSummary {
                session_id,
                focus_percentage,
            } = event
            {
                info!(
                    "Session {} summary: {}% focused",
                    session_id.as_deref().unwrap_or("-"),
                    focus_percentage
                );
            }
        }
    });

    // Simulate one work interval on the external timer signal.
    let (timer_tx, timer_rx) = watch::channel(false);
    monitor.bind_timer_signal(timer_rx).await;

    timer_tx.send(true)?;
    tokio::time::sleep(Duration::from_secs(20)).await;
    timer_tx.send(false)?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stats = monitor.stats().await;
    info!(
        "Work interval done: {}/{} checks focused ({}%)",
        stats.focused, stats.total, stats.percentage
    );
    Ok(())
}
