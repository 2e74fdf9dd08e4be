//! Cosync wire protocol types.
//!
//! Everything a peer is told about an object goes through a single message
//! shape: `{ action: "load", id, header, sessions }`. With `header: false`
//! and no sessions it is a retrieval request ("send me whatever you have"),
//! with the local [KnownState] filled in it is an announce that lets the
//! receiving peer compute and push back whatever the local node is missing.

use crate::{CoSyncError, CoSyncResult, CoValueId, SessionId};
use bytes::Bytes;
use std::collections::BTreeMap;

/// A snapshot of what content is known for an object: whether the header
/// is present, and how many ops have been applied per session log.
#[derive(
    Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct KnownState {
    /// The object this snapshot describes.
    pub id: CoValueId,
    /// Whether the object's header is known.
    pub header: bool,
    /// Applied op count per session log.
    pub sessions: BTreeMap<SessionId, u64>,
}

impl KnownState {
    /// A snapshot for an object nothing is known about.
    pub fn empty(id: CoValueId) -> Self {
        Self {
            id,
            header: false,
            sessions: BTreeMap::new(),
        }
    }
}

/// A message sent to a peer.
#[derive(
    Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PeerMessage {
    /// Request or announce content for an object. The payload is the
    /// sender's current [KnownState] for the object.
    Load(KnownState),
}

impl PeerMessage {
    /// Build the empty retrieval request for an object.
    pub fn load_request(id: CoValueId) -> Self {
        Self::Load(KnownState::empty(id))
    }

    /// Build the post-availability announce carrying the local known state.
    pub fn announce(known_state: KnownState) -> Self {
        Self::Load(known_state)
    }

    /// The object this message concerns.
    pub fn co_value_id(&self) -> &CoValueId {
        match self {
            Self::Load(known_state) => &known_state.id,
        }
    }
}

/// Serialize a peer message for the transport.
pub fn serialize_message(message: &PeerMessage) -> CoSyncResult<Bytes> {
    serde_json::to_vec(message)
        .map(Bytes::from)
        .map_err(|e| CoSyncError::other_src("encode peer message", e))
}

/// Deserialize a peer message received from the transport.
pub fn deserialize_message(data: &Bytes) -> CoSyncResult<PeerMessage> {
    serde_json::from_slice(data)
        .map_err(|e| CoSyncError::decode_src("peer message", e))
}
