//! Content-holder types.

use crate::{CoValueId, KnownState};
use std::sync::Arc;

/// The contract required from the content holder of a replicated object.
///
/// Reconciling session logs once content exists is the job of a different
/// subsystem; the availability core only needs identity and the known-state
/// snapshot used for announce messages.
pub trait CoValue: 'static + Send + Sync + std::fmt::Debug {
    /// The object's identifier.
    fn id(&self) -> CoValueId;

    /// A snapshot of the content currently known for this object.
    fn known_state(&self) -> KnownState;
}

/// Trait-object [CoValue].
pub type DynCoValue = Arc<dyn CoValue>;

/// The resolved value of an availability accessor call.
///
/// "Not found" is an expected outcome of the retrieval protocol, so it is
/// represented as a value rather than an error.
#[derive(Debug, Clone)]
pub enum LoadResult {
    /// Content is present.
    Available(DynCoValue),
    /// All retries were exhausted without obtaining content. A later
    /// retrieval or push may still resurrect the object.
    Unavailable,
}

impl LoadResult {
    /// Whether content is present.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// The content handle, if present.
    pub fn co_value(&self) -> Option<&DynCoValue> {
        match self {
            Self::Available(co_value) => Some(co_value),
            Self::Unavailable => None,
        }
    }
}
