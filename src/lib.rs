//! Headless focus-monitoring engine.
//!
//! A [`FocusMonitor`] polls for binary focus classifications at a
//! configurable cadence and keeps a bounded rolling window of
//! observations with aggregate statistics. Each check is resolved
//! through a prioritized chain of acquisition sources: windows cut from
//! an uploaded signal dataset and run through a classifier, a
//! caller-supplied source, a remote focus endpoint, and a uniform-random
//! fallback so monitoring never halts.
//!
//! The monitor synchronizes with an external work timer through a watch
//! channel (auto start/stop) and reports the session's focus percentage
//! back when a session ends.

pub mod config;
pub mod dataset;
pub mod monitor;
pub mod presets;
pub mod remote;
pub mod signal;

pub use config::{ConfigPatch, MonitorConfig};
pub use dataset::{DatasetError, FileDataset};
pub use monitor::{
    FocusMonitor, FocusSample, FocusStats, LabelSource, MonitorEvent, MonitorSnapshot,
    MonitorStatus,
};
pub use presets::{custom_preset, MonitorPreset};
pub use remote::RemoteLabelClient;
pub use signal::{Classifier, FocusLabel, HttpClassifier, Prediction, SignalWindow};
