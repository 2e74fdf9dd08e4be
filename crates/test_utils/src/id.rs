//! Test utilities associated with ids.

use bytes::Bytes;
use cosync_api::{id::Id, CoValueId, PeerId, SessionId};

use crate::random_bytes;

/// Create a random id.
pub fn random_id() -> Id {
    Id(Bytes::from(random_bytes(32)))
}

/// Create a random object id.
pub fn random_co_value_id() -> CoValueId {
    CoValueId(random_id())
}

/// Create a random peer id.
pub fn random_peer_id() -> PeerId {
    PeerId(random_id())
}

/// Create a random session id.
pub fn random_session_id() -> SessionId {
    SessionId(random_id())
}
