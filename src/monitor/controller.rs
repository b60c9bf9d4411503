use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::MonitorConfig;
use crate::dataset::{DatasetError, FileDataset};
use crate::remote::RemoteLabelClient;
use crate::signal::Classifier;

use super::acquisition::{
    AcquisitionResolver, DatasetSlot, LabelSource, SharedClassifier, SharedDataset, SharedSource,
    TickOutcome,
};
use super::state::{
    DatasetStatus, FocusSample, FocusStats, MonitorSnapshot, MonitorState, MonitorStatus,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Change notifications published to subscribers. The session summary is
/// the hand-off to the work-timer collaborator: the focus percentage over
/// the window that just ended.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum MonitorEvent {
    StateChanged {
        snapshot: MonitorSnapshot,
    },
    SampleRecorded {
        sample: FocusSample,
        prediction: crate::signal::Prediction,
    },
    SessionSummary {
        session_id: Option<String>,
        focus_percentage: u8,
    },
}

struct TickerHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// The polling scheduler. Owns the observation window and drives one
/// acquisition per interval while monitoring; every mutation of the
/// window happens on the tick path.
#[derive(Clone)]
pub struct FocusMonitor {
    config: MonitorConfig,
    state: Arc<Mutex<MonitorState>>,
    dataset: SharedDataset,
    classifier: SharedClassifier,
    custom_source: SharedSource,
    resolver: Arc<AcquisitionResolver>,
    generation: Arc<AtomicU64>,
    ticker: Arc<Mutex<Option<TickerHandle>>>,
    timer_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    events: broadcast::Sender<MonitorEvent>,
}

impl FocusMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let dataset: SharedDataset = Arc::new(Mutex::new(DatasetSlot {
            dataset: FileDataset::new(),
            active: false,
        }));
        let classifier: SharedClassifier = Arc::new(Mutex::new(None));
        let custom_source: SharedSource = Arc::new(Mutex::new(None));

        let remote = if config.use_remote_api {
            config.remote_endpoint.as_ref().and_then(|endpoint| {
                match RemoteLabelClient::new(endpoint.as_str(), config.remote_headers.clone()) {
                    Ok(client) => Some(client),
                    Err(err) => {
                        warn!("remote endpoint disabled, client build failed: {err:#}");
                        None
                    }
                }
            })
        } else {
            None
        };

        let resolver = Arc::new(AcquisitionResolver::with_default_chain(
            dataset.clone(),
            classifier.clone(),
            custom_source.clone(),
            remote,
        ));

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            state: Arc::new(Mutex::new(MonitorState::new())),
            dataset,
            classifier,
            custom_source,
            resolver,
            generation: Arc::new(AtomicU64::new(0)),
            ticker: Arc::new(Mutex::new(None)),
            timer_task: Arc::new(Mutex::new(None)),
            events,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Install the classifier used for dataset windows. Takes effect on
    /// the next tick.
    pub async fn set_classifier(&self, classifier: Arc<dyn Classifier>) {
        *self.classifier.lock().await = Some(classifier);
    }

    /// Install a caller-supplied acquisition source. It shadows the
    /// remote endpoint until cleared.
    pub async fn set_label_source(&self, source: Arc<dyn LabelSource>) {
        *self.custom_source.lock().await = Some(source);
    }

    pub async fn clear_label_source(&self) {
        *self.custom_source.lock().await = None;
    }

    /// Parse an uploaded file and make it the active acquisition source.
    /// A failed load leaves any previously loaded dataset untouched.
    pub async fn load_dataset(&self, path: impl AsRef<Path>) -> Result<usize, DatasetError> {
        let path = path.as_ref();
        let rows = {
            let mut slot = self.dataset.lock().await;
            slot.dataset.load(path)?;
            slot.active = true;
            slot.dataset.row_count()
        };

        self.state.lock().await.last_prediction = None;
        info!("Loaded {} rows from {}", rows, path.display());
        Ok(rows)
    }

    /// Stop sourcing from the uploaded file. Parsed rows are kept so the
    /// file can be re-attached, but the cursor rewinds and the
    /// classifier readout clears.
    pub async fn detach_dataset(&self) {
        {
            let mut slot = self.dataset.lock().await;
            slot.active = false;
            slot.dataset.reset();
        }
        self.state.lock().await.last_prediction = None;
        info!("Detached uploaded dataset");
    }

    /// Begin monitoring: one acquisition immediately, then one per
    /// interval. A no-op while already monitoring, so repeated starts
    /// never stack tickers.
    pub async fn start(&self) {
        let session_id = {
            let mut state = self.state.lock().await;
            if state.status == MonitorStatus::Monitoring {
                debug!("start ignored, already monitoring");
                return;
            }
            state.status = MonitorStatus::Monitoring;
            let session_id = Uuid::new_v4().to_string();
            state.session_id = Some(session_id.clone());
            session_id
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "Focus monitoring started (session {}, every {}s)",
            session_id, self.config.update_interval_secs
        );
        self.emit_state_changed().await;

        self.run_tick(generation).await;

        // A pause or reset during the first acquisition wins; don't
        // resurrect the session by spawning its ticker.
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        self.spawn_ticker(generation).await;
    }

    /// Stop ticking and report the window's focus percentage to the
    /// timer collaborator. The window itself is preserved. Idempotent
    /// while idle.
    pub async fn pause(&self) {
        let (session_id, stats) = {
            let mut state = self.state.lock().await;
            if state.status == MonitorStatus::Idle {
                return;
            }
            state.status = MonitorStatus::Idle;
            (state.session_id.clone(), state.stats())
        };

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cancel_ticker().await;

        info!(
            "Focus monitoring paused: {}% focused over {} checks",
            stats.percentage, stats.total
        );
        self.emit_state_changed().await;
        let _ = self.events.send(MonitorEvent::SessionSummary {
            session_id,
            focus_percentage: stats.percentage,
        });
    }

    /// The external-timer auto-stop path.
    pub async fn stop(&self) {
        self.pause().await;
    }

    /// Pause, then discard the window and the current readout.
    pub async fn reset(&self) {
        self.pause().await;
        {
            let mut state = self.state.lock().await;
            state.clear_history();
            state.session_id = None;
        }
        info!("Focus history cleared");
        self.emit_state_changed().await;
    }

    pub async fn status(&self) -> MonitorStatus {
        self.state.lock().await.status
    }

    pub async fn stats(&self) -> FocusStats {
        self.state.lock().await.stats()
    }

    pub async fn snapshot(&self) -> MonitorSnapshot {
        let dataset = {
            let slot = self.dataset.lock().await;
            slot.active.then(|| DatasetStatus {
                file_name: slot.dataset.file_name().map(String::from),
                row_count: slot.dataset.row_count(),
                cursor: slot.dataset.cursor_position(),
            })
        };

        let state = self.state.lock().await;
        MonitorSnapshot {
            status: state.status,
            session_id: state.session_id.clone(),
            samples: state.samples.iter().cloned().collect(),
            last_label: state.last_label,
            last_prediction: state.last_prediction.clone(),
            acquiring: state.acquiring,
            stats: state.stats(),
            dataset,
        }
    }

    /// Subscribe to an externally owned activity signal: the monitor
    /// auto-starts when the signal turns true while idle and auto-stops
    /// when it turns false while monitoring. A manual pause is honored
    /// until the signal next changes.
    pub async fn bind_timer_signal(&self, mut signal: watch::Receiver<bool>) {
        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            let mut active = *signal.borrow_and_update();
            loop {
                monitor.sync_with_timer(active).await;
                if signal.changed().await.is_err() {
                    debug!("timer signal sender dropped");
                    break;
                }
                active = *signal.borrow_and_update();
            }
        });

        if let Some(previous) = self.timer_task.lock().await.replace(handle) {
            previous.abort();
        }
    }

    async fn sync_with_timer(&self, active: bool) {
        let status = self.state.lock().await.status;
        if active && status == MonitorStatus::Idle {
            info!("External timer became active, starting focus monitoring");
            self.start().await;
        } else if !active && status == MonitorStatus::Monitoring {
            info!("External timer went inactive, stopping focus monitoring");
            self.stop().await;
        }
    }

    async fn spawn_ticker(&self, generation: u64) {
        let mut guard = self.ticker.lock().await;
        if let Some(previous) = guard.take() {
            previous.token.cancel();
            previous.handle.abort();
        }

        let monitor = self.clone();
        let token = CancellationToken::new();
        let task_token = token.clone();
        let period = self.config.update_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first interval tick completes immediately and the
            // start-time acquisition already covered it
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.run_tick(generation).await;
                    }
                    _ = task_token.cancelled() => {
                        debug!("monitor ticker shutting down");
                        break;
                    }
                }
            }
        });

        *guard = Some(TickerHandle { token, handle });
    }

    async fn cancel_ticker(&self) {
        if let Some(previous) = self.ticker.lock().await.take() {
            previous.token.cancel();
            previous.handle.abort();
        }
    }

    /// One acquisition cycle. Failures never escape: they either degrade
    /// to a fallback label inside the resolver or drop this tick.
    async fn run_tick(&self, generation: u64) {
        {
            let mut state = self.state.lock().await;
            if state.status != MonitorStatus::Monitoring {
                return;
            }
            if state.acquiring {
                warn!("previous acquisition still in flight, skipping tick");
                return;
            }
            state.acquiring = true;
        }

        let outcome = self.resolver.resolve().await;

        let recorded = {
            let mut state = self.state.lock().await;
            state.acquiring = false;

            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("discarding acquisition result from a stale session");
                None
            } else if let TickOutcome::Sampled { strategy, prediction } = outcome {
                let sample = FocusSample {
                    captured_at: Utc::now(),
                    label: prediction.label,
                };
                state.push_sample(sample.clone(), self.config.max_data_points);
                state.last_label = Some(prediction.label);
                state.last_prediction = Some(prediction.clone());
                info!(
                    "Recorded {} sample via {} ({} in window)",
                    prediction.label.as_str(),
                    strategy,
                    state.samples.len()
                );
                Some((sample, prediction))
            } else {
                None
            }
        };

        if let Some((sample, prediction)) = recorded {
            let _ = self
                .events
                .send(MonitorEvent::SampleRecorded { sample, prediction });
        }
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.snapshot().await;
        let _ = self.events.send(MonitorEvent::StateChanged { snapshot });
    }
}
