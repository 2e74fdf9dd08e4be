//! Multi-peer retrieval orchestration.
//!
//! Given an object in the `Unknown` state and the currently known peer
//! set, [CoValueLoader::load_from_peers] drives the retrieval protocol:
//!
//! - Storage peers are a pull source that either has the content or does
//!   not, so each receives exactly one request per cycle.
//! - Server peers may receive content asynchronously, so each is retried
//!   up to `max_retries` times with a delay between attempts.
//! - Client peers are consumers, not sources of truth, and are never
//!   queried.
//! - Peer eligibility (`is_closed` / `is_errored`) is re-read on every
//!   attempt rather than snapshotted, because the transport may flip
//!   those flags at any time.
//! - Once the object is available, one announce carrying the local known
//!   state goes to every still-eligible peer that was never contacted
//!   during the cycle, so it can compute and push back a diff.
//! - If all retries exhaust without content, the object is marked
//!   unavailable; waiters get the sentinel value, never an error.

use crate::CoValueState;
use cosync_api::{
    CoSyncResult, CoValueId, DynPeer, KnownState, PeerId, PeerMessage,
    PeerRole,
};
use std::collections::HashSet;

const MOD_NAME: &str = "coValueLoad";

/// CoValueLoader configuration types.
pub mod config {
    use std::time::Duration;

    /// Configuration parameters for [CoValueLoader](super::CoValueLoader).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CoValueLoadConfig {
        /// How many times each server peer is queried before the object
        /// is declared unavailable. Default: 5.
        pub max_retries: u32,
        /// Delay between retry attempts. Default: 300 ms.
        pub retry_interval: Duration,
    }

    impl Default for CoValueLoadConfig {
        fn default() -> Self {
            Self {
                max_retries: 5,
                retry_interval: Duration::from_millis(300),
            }
        }
    }

    /// Module-level configuration for [CoValueLoader](super::CoValueLoader).
    #[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CoValueLoadModConfig {
        /// CoValueLoader configuration.
        pub co_value_load: CoValueLoadConfig,
    }

    impl cosync_api::config::ModConfig for CoValueLoadModConfig {}
}

pub use config::*;

/// The retrieval orchestrator.
#[derive(Debug)]
pub struct CoValueLoader {
    config: CoValueLoadConfig,
}

impl CoValueLoader {
    /// Construct a loader with explicit configuration.
    pub fn new(config: CoValueLoadConfig) -> Self {
        Self { config }
    }

    /// Construct a loader from the `coValueLoad` section of a
    /// [Config](cosync_api::config::Config).
    pub fn from_config(
        config: &cosync_api::config::Config,
    ) -> CoSyncResult<Self> {
        let mod_config: CoValueLoadModConfig =
            config.get_module_config(MOD_NAME)?;
        Ok(Self::new(mod_config.co_value_load))
    }

    /// Run one retrieval cycle for the given object against the given
    /// peers.
    ///
    /// Returns once the object has reached `Available` or `Unavailable`
    /// for this cycle. Content arriving after an unavailable verdict is
    /// handled entirely by [CoValueState]; the loader is not re-entered.
    pub async fn load_from_peers(
        &self,
        state: &CoValueState,
        peers: &[DynPeer],
    ) {
        let id = state.id().clone();

        if state.is_available() {
            tracing::debug!(%id, "object already available, nothing to load");
            return;
        }

        state.start_loading(
            peers
                .iter()
                .filter(|peer| {
                    peer.role() != PeerRole::Client && eligible(peer, &id)
                })
                .map(|peer| peer.id())
                .collect(),
        );

        // Peers that were sent at least one message this cycle. Used to
        // target the final announce.
        let mut contacted: HashSet<PeerId> = HashSet::new();

        // Storage peers get their single request up front.
        let storage_peers = select_peers(peers, &id, PeerRole::Storage);
        for peer in &storage_peers {
            contacted.insert(peer.id());
        }
        futures::future::join_all(
            storage_peers.iter().map(|peer| send_request(peer, &id)),
        )
        .await;

        for attempt in 1..=self.config.max_retries {
            // The availability check sits between attempts; it is never
            // raced against the sends of the current attempt.
            if state.is_available() {
                break;
            }

            let server_peers = select_peers(peers, &id, PeerRole::Server);
            if server_peers.is_empty() {
                tracing::debug!(
                    %id,
                    attempt,
                    "no eligible server peers remain, giving up early"
                );
                break;
            }

            for peer in &server_peers {
                contacted.insert(peer.id());
            }
            futures::future::join_all(
                server_peers.iter().map(|peer| send_request(peer, &id)),
            )
            .await;

            if state.is_available() {
                break;
            }
            if attempt < self.config.max_retries {
                tokio::time::sleep(self.config.retry_interval).await;
            }
        }

        match state.available_co_value() {
            Some(co_value) => {
                let known_state = co_value.known_state();
                let targets: Vec<&DynPeer> = peers
                    .iter()
                    .filter(|peer| {
                        peer.role() != PeerRole::Client
                            && eligible(peer, &id)
                            && !contacted.contains(&peer.id())
                    })
                    .collect();
                futures::future::join_all(targets.iter().map(|peer| {
                    send_announce(peer, &id, known_state.clone())
                }))
                .await;
            }
            None => state.mark_unavailable(),
        }
    }
}

/// Eligibility is evaluated fresh at every call site. A closed peer never
/// receives a message; an errored entry excludes a peer for this object
/// only.
fn eligible(peer: &DynPeer, id: &CoValueId) -> bool {
    !peer.is_closed() && !peer.is_errored(id)
}

fn select_peers<'p>(
    peers: &'p [DynPeer],
    id: &CoValueId,
    role: PeerRole,
) -> Vec<&'p DynPeer> {
    peers
        .iter()
        .filter(|peer| peer.role() == role && eligible(peer, id))
        .collect()
}

/// A transport failure counts as an absent response for this attempt; it
/// never aborts the cycle.
async fn send_request(peer: &DynPeer, id: &CoValueId) {
    if let Err(err) = peer.send(PeerMessage::load_request(id.clone())).await
    {
        tracing::warn!(
            %id,
            peer = %peer.id(),
            ?err,
            "failed to send load request, treating as no response"
        );
    }
}

async fn send_announce(
    peer: &DynPeer,
    id: &CoValueId,
    known_state: KnownState,
) {
    if let Err(err) = peer.send(PeerMessage::announce(known_state)).await {
        tracing::warn!(
            %id,
            peer = %peer.id(),
            ?err,
            "failed to send announce"
        );
    }
}

#[cfg(test)]
mod test;
