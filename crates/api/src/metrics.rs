//! Metrics-sink types.

use std::sync::Arc;

/// The labeled gauge tracking how many objects currently hold each
/// availability state.
pub const COVALUES_LOADED_METRIC: &str = "covalues.loaded";

/// The `state` label attached to [COVALUES_LOADED_METRIC] entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStateLabel {
    /// The object has never been queried.
    Unknown,
    /// Retrieval is in progress.
    Loading,
    /// Content is present.
    Available,
    /// Retries were exhausted without obtaining content.
    Unavailable,
}

impl LoadStateLabel {
    /// The label value as emitted to the metrics backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Loading => "loading",
            Self::Available => "available",
            Self::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for LoadStateLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives availability state-transition counts.
///
/// The contract: an object contributes exactly one live gauge entry at any
/// time. Constructing a state machine increments the initial label once;
/// every transition emits a paired decrement of the old label and
/// increment of the new one.
pub trait MetricsSink: 'static + Send + Sync + std::fmt::Debug {
    /// Record one object entering the given state.
    fn increment(&self, state: LoadStateLabel);

    /// Record one object leaving the given state.
    fn decrement(&self, state: LoadStateLabel);
}

/// Trait-object [MetricsSink].
pub type DynMetricsSink = Arc<dyn MetricsSink>;
