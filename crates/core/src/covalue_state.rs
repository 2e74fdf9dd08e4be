//! Per-object availability state machine.
//!
//! A [CoValueState] owns the availability state of exactly one replicated
//! object and is its sole writer. Everything else interacts with it
//! through [CoValueState::dispatch] and the [CoValueState::co_value]
//! accessor. The retrieval orchestrator lives in the loader module and
//! drives the `Unknown -> Loading` and `Loading -> Unavailable` edges;
//! content arrival drives `Loading -> Available` and can resurrect an
//! `Unavailable` object at any later point.

use cosync_api::{
    CoValueId, DynCoValue, DynMetricsSink, LoadResult, LoadStateLabel,
    PeerId,
};
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Boxed future type, re-exported for accessor callers.
pub use cosync_api::BoxFut;

/// The availability state of one object. Exactly one variant is active at
/// a time; every consumer matches exhaustively.
#[derive(Debug)]
enum LoadState {
    /// Never queried.
    Unknown,
    /// Retrieval in progress.
    Loading {
        /// The peers that were eligible when retrieval started.
        queried_peers: HashSet<PeerId>,
    },
    /// Content present.
    Available { co_value: DynCoValue },
    /// Retries exhausted without content. Resurrectable.
    Unavailable,
}

impl LoadState {
    fn label(&self) -> LoadStateLabel {
        match self {
            Self::Unknown => LoadStateLabel::Unknown,
            Self::Loading { .. } => LoadStateLabel::Loading,
            Self::Available { .. } => LoadStateLabel::Available,
            Self::Unavailable => LoadStateLabel::Unavailable,
        }
    }
}

/// A signal fed back into the state machine by the orchestrator or an
/// out-of-band content arrival.
#[derive(Debug)]
pub enum LoadAction {
    /// Content for the object has arrived.
    Available {
        /// The content handle.
        co_value: DynCoValue,
    },
    /// A peer answered that it does not have the object. Pure bookkeeping;
    /// never changes the state.
    NotFoundInPeer {
        /// The peer that answered.
        peer_id: PeerId,
    },
}

#[derive(Debug)]
struct Inner {
    state: LoadState,
    waiters: Vec<oneshot::Sender<LoadResult>>,
}

/// The availability state machine for one object, plus a
/// single-resolution accessor for waiters.
#[derive(Debug)]
pub struct CoValueState {
    id: CoValueId,
    inner: Mutex<Inner>,
    metrics: DynMetricsSink,
}

impl CoValueState {
    fn with_state(
        id: CoValueId,
        state: LoadState,
        metrics: DynMetricsSink,
    ) -> Self {
        metrics.increment(state.label());
        Self {
            id,
            inner: Mutex::new(Inner {
                state,
                waiters: Vec::new(),
            }),
            metrics,
        }
    }

    /// Construct a state machine for an object that has never been
    /// queried.
    pub fn unknown(id: CoValueId, metrics: DynMetricsSink) -> Self {
        Self::with_state(id, LoadState::Unknown, metrics)
    }

    /// Construct a state machine for an object whose retrieval is already
    /// in progress against the given peers.
    pub fn loading(
        id: CoValueId,
        queried_peers: impl IntoIterator<Item = PeerId>,
        metrics: DynMetricsSink,
    ) -> Self {
        Self::with_state(
            id,
            LoadState::Loading {
                queried_peers: queried_peers.into_iter().collect(),
            },
            metrics,
        )
    }

    /// Construct a state machine for an object whose content is already
    /// present.
    pub fn available(co_value: DynCoValue, metrics: DynMetricsSink) -> Self {
        let id = co_value.id();
        Self::with_state(id, LoadState::Available { co_value }, metrics)
    }

    /// The object this state machine tracks.
    pub fn id(&self) -> &CoValueId {
        &self.id
    }

    /// The label of the currently held state.
    pub fn label(&self) -> LoadStateLabel {
        self.inner.lock().unwrap().state.label()
    }

    /// Whether content is currently present.
    pub fn is_available(&self) -> bool {
        matches!(
            self.inner.lock().unwrap().state,
            LoadState::Available { .. }
        )
    }

    /// The peers recorded when the current retrieval cycle started, if a
    /// retrieval is in progress.
    pub fn queried_peers(&self) -> Option<HashSet<PeerId>> {
        match &self.inner.lock().unwrap().state {
            LoadState::Loading { queried_peers } => {
                Some(queried_peers.clone())
            }
            _ => None,
        }
    }

    /// The content handle, if currently present.
    pub fn available_co_value(&self) -> Option<DynCoValue> {
        match &self.inner.lock().unwrap().state {
            LoadState::Available { co_value } => Some(co_value.clone()),
            _ => None,
        }
    }

    /// Feed a signal into the state machine.
    ///
    /// No signal ever surfaces an error to callers. Signals that are
    /// invalid for the current state are logged and ignored, and
    /// `Available` never downgrades.
    pub fn dispatch(&self, action: LoadAction) {
        match action {
            LoadAction::Available { co_value } => self.on_available(co_value),
            LoadAction::NotFoundInPeer { peer_id } => {
                self.on_not_found(peer_id)
            }
        }
    }

    fn on_available(&self, co_value: DynCoValue) {
        let mut inner = self.inner.lock().unwrap();
        match &inner.state {
            LoadState::Unknown => {
                tracing::warn!(
                    id = %self.id,
                    "content signal for an object that was never queried, ignoring"
                );
            }
            LoadState::Available { .. } => {
                tracing::debug!(id = %self.id, "object already available");
            }
            LoadState::Loading { .. } | LoadState::Unavailable => {
                let old = inner.state.label();
                inner.state = LoadState::Available {
                    co_value: co_value.clone(),
                };
                self.metrics.decrement(old);
                self.metrics.increment(LoadStateLabel::Available);
                for waiter in inner.waiters.drain(..) {
                    // A dropped receiver just means the caller went away.
                    let _ = waiter
                        .send(LoadResult::Available(co_value.clone()));
                }
            }
        }
    }

    fn on_not_found(&self, peer_id: PeerId) {
        let inner = self.inner.lock().unwrap();
        match &inner.state {
            LoadState::Unknown => {
                tracing::warn!(
                    id = %self.id,
                    peer = %peer_id,
                    "not-found signal for an object that was never queried, ignoring"
                );
            }
            LoadState::Loading { .. } => {
                tracing::debug!(
                    id = %self.id,
                    peer = %peer_id,
                    "peer does not have object"
                );
            }
            LoadState::Available { .. } | LoadState::Unavailable => {
                tracing::debug!(
                    id = %self.id,
                    peer = %peer_id,
                    "late not-found signal, ignoring"
                );
            }
        }
    }

    /// Record the start of a retrieval cycle. Only an `Unknown` object
    /// moves to `Loading`; any other state is left untouched.
    pub(crate) fn start_loading(&self, queried_peers: HashSet<PeerId>) {
        let mut inner = self.inner.lock().unwrap();
        match &inner.state {
            LoadState::Unknown => {
                inner.state = LoadState::Loading { queried_peers };
                self.metrics.decrement(LoadStateLabel::Unknown);
                self.metrics.increment(LoadStateLabel::Loading);
            }
            _ => {
                tracing::debug!(
                    id = %self.id,
                    state = %inner.state.label(),
                    "retrieval start on a non-unknown object, ignoring"
                );
            }
        }
    }

    /// Record retry exhaustion. Only a `Loading` object moves to
    /// `Unavailable`; pending accessors resolve with the sentinel rather
    /// than an error.
    pub(crate) fn mark_unavailable(&self) {
        let mut inner = self.inner.lock().unwrap();
        match &inner.state {
            LoadState::Loading { .. } => {
                inner.state = LoadState::Unavailable;
                self.metrics.decrement(LoadStateLabel::Loading);
                self.metrics.increment(LoadStateLabel::Unavailable);
                for waiter in inner.waiters.drain(..) {
                    let _ = waiter.send(LoadResult::Unavailable);
                }
            }
            _ => {
                tracing::debug!(
                    id = %self.id,
                    state = %inner.state.label(),
                    "exhaustion signal on a non-loading object, ignoring"
                );
            }
        }
    }

    /// Wait for the object to reach a terminal state.
    ///
    /// Resolves immediately when the object is already `Available` or
    /// `Unavailable`, otherwise the first time it becomes one of the two.
    /// The decision is keyed off the state at call time, so a call made
    /// after an `Unavailable` object was resurrected observes the new
    /// content. All calls pending at a transition are satisfied by that
    /// one event.
    pub fn co_value(&self) -> BoxFut<'static, LoadResult> {
        let mut inner = self.inner.lock().unwrap();
        match &inner.state {
            LoadState::Available { co_value } => {
                let out = LoadResult::Available(co_value.clone());
                Box::pin(async move { out })
            }
            LoadState::Unavailable => {
                Box::pin(async move { LoadResult::Unavailable })
            }
            LoadState::Unknown | LoadState::Loading { .. } => {
                let (tx, rx) = oneshot::channel();
                inner.waiters.push(tx);
                Box::pin(async move {
                    // The sender half only disappears if the state machine
                    // itself is dropped while callers wait.
                    rx.await.unwrap_or(LoadResult::Unavailable)
                })
            }
        }
    }
}
