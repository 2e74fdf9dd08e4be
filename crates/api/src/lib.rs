#![deny(missing_docs)]
//! Cosync API contains the module traits and basic types that make up the
//! availability / retrieval core of a peer-replicated object store.
//!
//! If you want the production implementations, see the cosync_core crate.

/// Boxed future type.
pub type BoxFut<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub(crate) mod serde_bytes_base64 {
    pub fn serialize<S>(
        b: &bytes::Bytes,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use base64::prelude::*;
        serializer.serialize_str(&BASE64_URL_SAFE_NO_PAD.encode(b))
    }

    pub fn deserialize<'de, D, T: From<bytes::Bytes>>(
        deserializer: D,
    ) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use base64::prelude::*;
        // Decoding through an owned String keeps this usable for map keys,
        // which serde_json hands out transiently.
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        BASE64_URL_SAFE_NO_PAD
            .decode(s)
            .map(|v| bytes::Bytes::copy_from_slice(&v).into())
            .map_err(serde::de::Error::custom)
    }
}

pub mod config;

mod error;
pub use error::*;

pub mod id;
pub use id::{CoValueId, PeerId, SessionId};

pub mod protocol;
pub use protocol::{KnownState, PeerMessage};

pub mod peer;
pub use peer::{DynPeer, Peer, PeerRole};

pub mod covalue;
pub use covalue::{CoValue, DynCoValue, LoadResult};

pub mod metrics;
pub use metrics::{DynMetricsSink, LoadStateLabel, MetricsSink};
