pub mod acquisition;
pub mod controller;
pub mod state;

pub use acquisition::{
    AcquireStrategy, AcquisitionResolver, FailurePolicy, LabelSource, StrategyOutcome, TickOutcome,
};
pub use controller::{FocusMonitor, MonitorEvent};
pub use state::{
    DatasetStatus, FocusSample, FocusStats, MonitorSnapshot, MonitorState, MonitorStatus,
};
