use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signal::{FocusLabel, Prediction};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MonitorStatus {
    Idle,
    Monitoring,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        MonitorStatus::Idle
    }
}

/// One recorded observation. Immutable once created; only ever discarded
/// by window eviction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusSample {
    pub captured_at: DateTime<Utc>,
    pub label: FocusLabel,
}

/// Aggregate statistics over the current window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusStats {
    pub total: usize,
    pub focused: usize,
    pub percentage: u8,
}

#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    pub status: MonitorStatus,
    pub session_id: Option<String>,
    pub samples: VecDeque<FocusSample>,
    pub last_label: Option<FocusLabel>,
    pub last_prediction: Option<Prediction>,
    pub acquiring: bool,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample and evict from the front once the window exceeds
    /// `max_points`. Insertion order is chronological.
    pub fn push_sample(&mut self, sample: FocusSample, max_points: usize) {
        self.samples.push_back(sample);
        while self.samples.len() > max_points {
            self.samples.pop_front();
        }
    }

    pub fn stats(&self) -> FocusStats {
        let total = self.samples.len();
        let focused = self
            .samples
            .iter()
            .filter(|sample| sample.label.is_focused())
            .count();
        let percentage = if total > 0 {
            ((focused as f64 / total as f64) * 100.0).round() as u8
        } else {
            0
        };

        FocusStats {
            total,
            focused,
            percentage,
        }
    }

    /// Discard all recorded observations and the current readout. Used by
    /// reset; pause leaves the window alone.
    pub fn clear_history(&mut self) {
        self.samples.clear();
        self.last_label = None;
        self.last_prediction = None;
    }
}

/// Read-only view handed to subscribers and external readers.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub status: MonitorStatus,
    pub session_id: Option<String>,
    pub samples: Vec<FocusSample>,
    pub last_label: Option<FocusLabel>,
    pub last_prediction: Option<Prediction>,
    pub acquiring: bool,
    pub stats: FocusStats,
    pub dataset: Option<DatasetStatus>,
}

/// Position readout for an attached dataset ("row X of Y").
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatus {
    pub file_name: Option<String>,
    pub row_count: usize,
    pub cursor: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(label: FocusLabel) -> FocusSample {
        FocusSample {
            captured_at: Utc::now(),
            label,
        }
    }

    #[test]
    fn window_is_bounded_with_fifo_eviction() {
        let mut state = MonitorState::new();
        let labels = [
            FocusLabel::Focused,
            FocusLabel::Unfocused,
            FocusLabel::Focused,
            FocusLabel::Focused,
            FocusLabel::Unfocused,
        ];

        for label in labels {
            state.push_sample(sample(label), 3);
            assert!(state.samples.len() <= 3);
        }

        // the two oldest observations were evicted
        let kept: Vec<FocusLabel> = state.samples.iter().map(|s| s.label).collect();
        assert_eq!(
            kept,
            vec![FocusLabel::Focused, FocusLabel::Focused, FocusLabel::Unfocused]
        );
    }

    #[test]
    fn stats_round_to_nearest_integer_percentage() {
        let mut state = MonitorState::new();
        state.push_sample(sample(FocusLabel::Focused), 10);
        state.push_sample(sample(FocusLabel::Focused), 10);
        state.push_sample(sample(FocusLabel::Unfocused), 10);

        let stats = state.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.focused, 2);
        assert_eq!(stats.percentage, 67);
    }

    #[test]
    fn empty_window_reports_zero_percent() {
        let stats = MonitorState::new().stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.percentage, 0);
    }

    #[test]
    fn clear_history_discards_samples_and_readout() {
        let mut state = MonitorState::new();
        state.push_sample(sample(FocusLabel::Focused), 10);
        state.last_label = Some(FocusLabel::Focused);
        state.last_prediction = Some(Prediction::unscored(FocusLabel::Focused));

        state.clear_history();
        assert!(state.samples.is_empty());
        assert!(state.last_label.is_none());
        assert!(state.last_prediction.is_none());
    }
}
