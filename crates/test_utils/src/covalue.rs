//! A trivial content holder for tests.

use cosync_api::{CoValue, CoValueId, DynCoValue, KnownState};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A content holder with a fixed id and a canned known state
/// (header present, no sessions).
#[derive(Debug)]
pub struct TestCoValue {
    id: CoValueId,
}

impl TestCoValue {
    /// Construct a [TestCoValue] for the given object id.
    pub fn create(id: CoValueId) -> DynCoValue {
        Arc::new(Self { id })
    }
}

impl CoValue for TestCoValue {
    fn id(&self) -> CoValueId {
        self.id.clone()
    }

    fn known_state(&self) -> KnownState {
        KnownState {
            id: self.id.clone(),
            header: true,
            sessions: BTreeMap::new(),
        }
    }
}
