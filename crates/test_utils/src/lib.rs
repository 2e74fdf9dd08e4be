#![deny(missing_docs)]
//! Utilities for testing the cosync availability core.

pub mod covalue;
pub mod id;
pub mod peer;

/// Enable tracing with the RUST_LOG environment variable.
///
/// This is intended to be used in tests, so it defaults to DEBUG level.
pub fn enable_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::DEBUG.into())
                .from_env_lossy(),
        )
        .try_init();
}

/// Create a vec of the given length, filled with random bytes.
pub fn random_bytes(length: usize) -> Vec<u8> {
    use rand::Rng;
    let mut out = vec![0; length];
    rand::thread_rng().fill(&mut out[..]);
    out
}
