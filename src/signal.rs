//! Classification inputs and the classifier seam.
//!
//! A classification input is a fixed-shape window of multi-channel signal
//! samples. Windows are built per check, handed to a [`Classifier`], and
//! not retained.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rows per classification window.
pub const CHANNEL_COUNT: usize = 6;

/// Samples per channel row. Dataset rows are normalized to this width.
pub const SAMPLES_PER_CHANNEL: usize = 320;

const CLASSIFIER_TIMEOUT_SECS: u64 = 10;

/// Binary focus classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FocusLabel {
    Focused,
    Unfocused,
}

impl FocusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FocusLabel::Focused => "focused",
            FocusLabel::Unfocused => "unfocused",
        }
    }

    /// Parse the canonical wire spelling; anything else is rejected.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "focused" => Some(FocusLabel::Focused),
            "unfocused" => Some(FocusLabel::Unfocused),
            _ => None,
        }
    }

    /// Map the numeric wire encoding: 1 = focused, 0 = unfocused.
    pub fn from_bit(value: i64) -> Option<Self> {
        match value {
            1 => Some(FocusLabel::Focused),
            0 => Some(FocusLabel::Unfocused),
            _ => None,
        }
    }

    pub fn is_focused(&self) -> bool {
        matches!(self, FocusLabel::Focused)
    }
}

/// Uniform 50/50 label, used whenever no acquisition source is available
/// or the available one failed non-fatally.
pub fn random_label() -> FocusLabel {
    if rand::thread_rng().gen_bool(0.5) {
        FocusLabel::Focused
    } else {
        FocusLabel::Unfocused
    }
}

/// A classification result plus whatever metadata the model reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub label: FocusLabel,
    pub confidence: Option<f64>,
}

impl Prediction {
    /// A label with no model metadata attached (random and caller-supplied
    /// sources report these).
    pub fn unscored(label: FocusLabel) -> Self {
        Self {
            label,
            confidence: None,
        }
    }
}

/// One classification input: `CHANNEL_COUNT` rows of
/// `SAMPLES_PER_CHANNEL` real-valued samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalWindow {
    channels: Vec<Vec<f64>>,
}

impl SignalWindow {
    pub fn new(channels: Vec<Vec<f64>>) -> Self {
        Self { channels }
    }

    /// Uniform random window in [-1, 1], the shape a normalized capture
    /// would have. Used for demos and as a stand-in when no dataset row is
    /// available.
    pub fn synthetic() -> Self {
        let mut rng = rand::thread_rng();
        let channels = (0..CHANNEL_COUNT)
            .map(|_| {
                (0..SAMPLES_PER_CHANNEL)
                    .map(|_| rng.gen_range(-1.0..=1.0))
                    .collect()
            })
            .collect();
        Self { channels }
    }

    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// External classifier collaborator: signal window in, labeled prediction
/// out. Any error counts as a classification failure.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, window: &SignalWindow) -> Result<Prediction>;
}

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    success: bool,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// HTTP classifier speaking the documented contract: POST the window,
/// expect `{ "success": true, "label": "focused" | "unfocused",
/// "confidence": ... }`.
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(CLASSIFIER_TIMEOUT_SECS))
            .build()
            .context("failed to build classifier HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, window: &SignalWindow) -> Result<Prediction> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(window)
            .send()
            .await
            .with_context(|| format!("classifier request to {} failed", self.endpoint))?;

        if !response.status().is_success() {
            bail!("classifier returned status {}", response.status());
        }

        let body: ClassifierResponse = response
            .json()
            .await
            .context("malformed classifier payload")?;

        if !body.success {
            bail!("classifier reported failure");
        }

        let label = body
            .label
            .as_deref()
            .and_then(FocusLabel::from_wire)
            .ok_or_else(|| anyhow!("classifier returned an unrecognized label"))?;

        Ok(Prediction {
            label,
            confidence: body.confidence,
        })
    }
}
