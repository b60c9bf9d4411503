use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for one focus-monitoring session. Immutable once the
/// monitor is built; changing it means building a fresh monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Seconds between focus checks (default: 12 seconds = 5 checks per minute)
    pub update_interval_secs: u64,

    /// Maximum number of observations kept in the rolling window
    pub max_data_points: usize,

    /// Enable the remote focus endpoint as an acquisition source
    pub use_remote_api: bool,

    /// Remote focus endpoint URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_endpoint: Option<String>,

    /// Extra headers sent with remote focus requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_headers: Option<HashMap<String, String>>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 12,
            max_data_points: 15,
            use_remote_api: false,
            remote_endpoint: None,
            remote_headers: None,
        }
    }
}

impl MonitorConfig {
    /// Shallow-merge a partial configuration over the defaults.
    pub fn resolve(patch: ConfigPatch) -> Self {
        let defaults = Self::default();
        Self {
            update_interval_secs: patch
                .update_interval_secs
                .unwrap_or(defaults.update_interval_secs),
            max_data_points: patch.max_data_points.unwrap_or(defaults.max_data_points),
            use_remote_api: patch.use_remote_api.unwrap_or(defaults.use_remote_api),
            remote_endpoint: patch.remote_endpoint.or(defaults.remote_endpoint),
            remote_headers: patch.remote_headers.or(defaults.remote_headers),
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

/// Partial configuration: unset fields fall back to the defaults when
/// resolved. Presets are fixed values of this type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    pub update_interval_secs: Option<u64>,
    pub max_data_points: Option<usize>,
    pub use_remote_api: Option<bool>,
    pub remote_endpoint: Option<String>,
    pub remote_headers: Option<HashMap<String, String>>,
}
