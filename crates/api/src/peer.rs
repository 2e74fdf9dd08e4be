//! Peer-related types.

use crate::{BoxFut, CoSyncResult, CoValueId, PeerId, PeerMessage};
use std::sync::Arc;

/// Trust / capability classification of a peer connection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PeerRole {
    /// A consumer of content. Clients are never queried during retrieval.
    Client,
    /// An authoritative sync peer. Servers are retried up to the configured
    /// retry count, because content may reach them asynchronously.
    Server,
    /// A pull-once source. Storage either has the content or it does not,
    /// so it is queried exactly once per retrieval cycle.
    Storage,
}

/// A handle to one peer connection, owned by the transport layer.
///
/// The availability core only reads this handle. `is_closed` and
/// `is_errored` may be flipped by the transport at any time, so callers
/// must re-read them at every decision point instead of caching a
/// snapshot.
pub trait Peer: 'static + Send + Sync + std::fmt::Debug {
    /// The identity of this peer connection.
    fn id(&self) -> PeerId;

    /// The trust role of this peer.
    fn role(&self) -> PeerRole;

    /// Whether the connection has been closed by the transport.
    fn is_closed(&self) -> bool;

    /// Whether this peer has produced a content error for the given
    /// object. An errored entry is a permanent per-object exclusion for
    /// the lifetime of the process; it is never cleared by this subsystem.
    fn is_errored(&self, id: &CoValueId) -> bool;

    /// Queue a message on the outgoing side of this connection.
    ///
    /// A transport failure here is treated by the retrieval core as an
    /// absent response for the attempt, never as a fatal error.
    fn send(&self, message: PeerMessage) -> BoxFut<'_, CoSyncResult<()>>;
}

/// Trait-object [Peer].
pub type DynPeer = Arc<dyn Peer>;
