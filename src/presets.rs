//! Named monitoring presets: fixed interval / window-size pairs plus a
//! helper for deriving custom ones from a checks-per-minute budget.

use crate::config::ConfigPatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPreset {
    /// 5 checks per minute, last 3 minutes of data
    Standard,
    /// 10 checks per minute, last 3 minutes of data
    Fast,
    /// 3 checks per minute, last 3 minutes of data
    Slow,
    /// 5 checks per minute, last 5 minutes of data
    LongHistory,
    /// 10 checks per minute, last 1 minute of data
    ShortHistory,
    /// 12 checks per minute, last 2 minutes of data
    HighFrequency,
    /// 20 checks per minute for demonstrations, last 1 minute of data
    Demo,
    /// Standard timing with the remote endpoint enabled; the endpoint URL
    /// is configured separately
    ApiReady,
}

impl MonitorPreset {
    pub fn patch(&self) -> ConfigPatch {
        let (interval, points, use_api) = match self {
            MonitorPreset::Standard => (12, 15, false),
            MonitorPreset::Fast => (6, 30, false),
            MonitorPreset::Slow => (20, 9, false),
            MonitorPreset::LongHistory => (12, 25, false),
            MonitorPreset::ShortHistory => (6, 10, false),
            MonitorPreset::HighFrequency => (5, 24, false),
            MonitorPreset::Demo => (3, 20, false),
            MonitorPreset::ApiReady => (12, 15, true),
        };

        ConfigPatch {
            update_interval_secs: Some(interval),
            max_data_points: Some(points),
            use_remote_api: Some(use_api),
            ..ConfigPatch::default()
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorPreset::Standard => "standard",
            MonitorPreset::Fast => "fast",
            MonitorPreset::Slow => "slow",
            MonitorPreset::LongHistory => "longHistory",
            MonitorPreset::ShortHistory => "shortHistory",
            MonitorPreset::HighFrequency => "highFrequency",
            MonitorPreset::Demo => "demo",
            MonitorPreset::ApiReady => "apiReady",
        }
    }
}

/// Derive a preset from a checks-per-minute budget and a history duration.
///
/// No validation is performed: zero or negative-style inputs (a zero
/// `updates_per_minute` divides into the minute) are a caller error.
pub fn custom_preset(updates_per_minute: u32, duration_minutes: u32, use_api: bool) -> ConfigPatch {
    let update_interval = (60.0 / updates_per_minute as f64).round() as u64;
    let max_data_points = (updates_per_minute * duration_minutes) as usize;

    ConfigPatch {
        update_interval_secs: Some(update_interval),
        max_data_points: Some(max_data_points),
        use_remote_api: Some(use_api),
        ..ConfigPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;

    #[test]
    fn preset_table_values() {
        let cases = [
            (MonitorPreset::Standard, 12, 15, false),
            (MonitorPreset::Fast, 6, 30, false),
            (MonitorPreset::Slow, 20, 9, false),
            (MonitorPreset::LongHistory, 12, 25, false),
            (MonitorPreset::ShortHistory, 6, 10, false),
            (MonitorPreset::HighFrequency, 5, 24, false),
            (MonitorPreset::Demo, 3, 20, false),
            (MonitorPreset::ApiReady, 12, 15, true),
        ];

        for (preset, interval, points, use_api) in cases {
            let config = MonitorConfig::resolve(preset.patch());
            assert_eq!(config.update_interval_secs, interval, "{}", preset.as_str());
            assert_eq!(config.max_data_points, points, "{}", preset.as_str());
            assert_eq!(config.use_remote_api, use_api, "{}", preset.as_str());
            assert!(config.remote_endpoint.is_none());
        }
    }

    #[test]
    fn custom_preset_computes_interval_and_window() {
        let config = MonitorConfig::resolve(custom_preset(5, 3, false));
        assert_eq!(config.update_interval_secs, 12);
        assert_eq!(config.max_data_points, 15);

        // 60 / 8 = 7.5 rounds up
        let config = MonitorConfig::resolve(custom_preset(8, 4, true));
        assert_eq!(config.update_interval_secs, 8);
        assert_eq!(config.max_data_points, 32);
        assert!(config.use_remote_api);
    }
}
