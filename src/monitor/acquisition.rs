//! Per-tick label acquisition.
//!
//! Acquisition sources are an ordered chain of strategy providers walked
//! top to bottom on every tick: the uploaded dataset run through the
//! classifier, then a caller-supplied source, then the remote endpoint,
//! then a uniform-random fallback. Exactly one strategy executes per
//! tick, and the chain is re-evaluated each time so a dataset uploaded
//! mid-session takes effect on the next check.

use std::sync::Arc;

use anyhow::{Error, Result};
use async_trait::async_trait;
use log::{error, warn};
use tokio::sync::Mutex;

use crate::dataset::FileDataset;
use crate::remote::RemoteLabelClient;
use crate::signal::{self, Classifier, FocusLabel, Prediction, SignalWindow, CHANNEL_COUNT};

/// Caller-supplied acquisition source. Takes priority over the remote
/// endpoint; its result is used verbatim.
#[async_trait]
pub trait LabelSource: Send + Sync {
    async fn fetch_label(&self) -> Result<FocusLabel>;
}

/// An uploaded dataset plus the flag marking it as the active source.
/// Detaching clears the flag and rewinds the cursor but keeps the rows.
pub(crate) struct DatasetSlot {
    pub dataset: FileDataset,
    pub active: bool,
}

pub(crate) type SharedDataset = Arc<Mutex<DatasetSlot>>;
pub(crate) type SharedClassifier = Arc<Mutex<Option<Arc<dyn Classifier>>>>;
pub(crate) type SharedSource = Arc<Mutex<Option<Arc<dyn LabelSource>>>>;

pub enum StrategyOutcome {
    Sampled(Prediction),
    NotApplicable,
    Failed(Error),
}

/// How the resolver reacts when a strategy fails rather than declining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Degrade to a uniform-random label; monitoring records a sample.
    RandomLabel,
    /// The whole tick fails: nothing is recorded, monitoring continues.
    FailTick,
}

#[async_trait]
pub trait AcquireStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn failure_policy(&self) -> FailurePolicy;
    async fn try_acquire(&self) -> StrategyOutcome;
}

/// What one tick produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Sampled {
        strategy: &'static str,
        prediction: Prediction,
    },
    Failed,
}

pub struct AcquisitionResolver {
    strategies: Vec<Box<dyn AcquireStrategy>>,
}

impl AcquisitionResolver {
    pub fn new(strategies: Vec<Box<dyn AcquireStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard priority chain: file window, caller source, remote
    /// endpoint, random fallback.
    pub(crate) fn with_default_chain(
        dataset: SharedDataset,
        classifier: SharedClassifier,
        source: SharedSource,
        remote: Option<RemoteLabelClient>,
    ) -> Self {
        Self::new(vec![
            Box::new(FileWindowStrategy {
                dataset,
                classifier,
            }),
            Box::new(CustomSourceStrategy { source }),
            Box::new(RemoteApiStrategy { client: remote }),
            Box::new(RandomFallbackStrategy),
        ])
    }

    /// Walk the chain until a strategy produces a label or fails. A
    /// failure is resolved by the owning strategy's policy; it never
    /// propagates out of the resolver.
    pub async fn resolve(&self) -> TickOutcome {
        for strategy in &self.strategies {
            match strategy.try_acquire().await {
                StrategyOutcome::Sampled(prediction) => {
                    return TickOutcome::Sampled {
                        strategy: strategy.name(),
                        prediction,
                    };
                }
                StrategyOutcome::NotApplicable => continue,
                StrategyOutcome::Failed(err) => match strategy.failure_policy() {
                    FailurePolicy::RandomLabel => {
                        warn!(
                            "{} acquisition failed, falling back to random label: {err:#}",
                            strategy.name()
                        );
                        return TickOutcome::Sampled {
                            strategy: RANDOM_STRATEGY,
                            prediction: Prediction::unscored(signal::random_label()),
                        };
                    }
                    FailurePolicy::FailTick => {
                        error!("{} acquisition failed, dropping tick: {err:#}", strategy.name());
                        return TickOutcome::Failed;
                    }
                },
            }
        }

        // unreachable with the random fallback installed
        TickOutcome::Failed
    }
}

const RANDOM_STRATEGY: &str = "random";

/// Priority 1: classify the next window of the uploaded dataset.
struct FileWindowStrategy {
    dataset: SharedDataset,
    classifier: SharedClassifier,
}

#[async_trait]
impl AcquireStrategy for FileWindowStrategy {
    fn name(&self) -> &'static str {
        "file-window"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::RandomLabel
    }

    async fn try_acquire(&self) -> StrategyOutcome {
        // check the classifier before cutting a window so no rows are
        // consumed when classification cannot happen anyway
        let classifier = self.classifier.lock().await.clone();
        let Some(classifier) = classifier else {
            return StrategyOutcome::NotApplicable;
        };

        let window = {
            let mut slot = self.dataset.lock().await;
            if !slot.active {
                return StrategyOutcome::NotApplicable;
            }
            match slot.dataset.next_block(CHANNEL_COUNT) {
                Some(rows) => SignalWindow::new(rows),
                None => return StrategyOutcome::NotApplicable,
            }
        };

        match classifier.classify(&window).await {
            Ok(prediction) => StrategyOutcome::Sampled(prediction),
            Err(err) => StrategyOutcome::Failed(err),
        }
    }
}

/// Priority 2: the caller-supplied source.
struct CustomSourceStrategy {
    source: SharedSource,
}

#[async_trait]
impl AcquireStrategy for CustomSourceStrategy {
    fn name(&self) -> &'static str {
        "custom-source"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::FailTick
    }

    async fn try_acquire(&self) -> StrategyOutcome {
        let source = self.source.lock().await.clone();
        let Some(source) = source else {
            return StrategyOutcome::NotApplicable;
        };

        match source.fetch_label().await {
            Ok(label) => StrategyOutcome::Sampled(Prediction::unscored(label)),
            Err(err) => StrategyOutcome::Failed(err),
        }
    }
}

/// Priority 3: the configured remote endpoint.
struct RemoteApiStrategy {
    client: Option<RemoteLabelClient>,
}

#[async_trait]
impl AcquireStrategy for RemoteApiStrategy {
    fn name(&self) -> &'static str {
        "remote-api"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::RandomLabel
    }

    async fn try_acquire(&self) -> StrategyOutcome {
        let Some(client) = &self.client else {
            return StrategyOutcome::NotApplicable;
        };

        match client.fetch_label().await {
            Ok(label) => StrategyOutcome::Sampled(Prediction::unscored(label)),
            Err(err) => StrategyOutcome::Failed(err),
        }
    }
}

/// Priority 4: uniform 50/50, always available.
struct RandomFallbackStrategy;

#[async_trait]
impl AcquireStrategy for RandomFallbackStrategy {
    fn name(&self) -> &'static str {
        RANDOM_STRATEGY
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::RandomLabel
    }

    async fn try_acquire(&self) -> StrategyOutcome {
        StrategyOutcome::Sampled(Prediction::unscored(signal::random_label()))
    }
}
