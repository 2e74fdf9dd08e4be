use crate::{
    CoValueLoadConfig, CoValueLoader, CoValueState, LoadAction,
    MemMetricsSink,
};
use cosync_api::{
    config::Config, CoSyncError, CoValueId, DynCoValue, DynMetricsSink,
    DynPeer, LoadStateLabel, Peer, PeerMessage, PeerRole,
};
use cosync_test_utils::{
    covalue::TestCoValue,
    enable_tracing,
    id::{random_co_value_id, random_peer_id},
    peer::{MockPeer, SendHook},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn test_loader(max_retries: u32, retry_interval_ms: u64) -> CoValueLoader {
    CoValueLoader::new(CoValueLoadConfig {
        max_retries,
        retry_interval: Duration::from_millis(retry_interval_ms),
    })
}

fn unknown_state(id: CoValueId) -> (Arc<CoValueState>, Arc<MemMetricsSink>) {
    let sink = MemMetricsSink::create();
    let dyn_sink: DynMetricsSink = sink.clone();
    (Arc::new(CoValueState::unknown(id, dyn_sink)), sink)
}

/// A peer reaction that reports the object as not found.
fn not_found_hook(state: Arc<CoValueState>, peer_id: cosync_api::PeerId) -> SendHook {
    Arc::new(move |_message| {
        let state = state.clone();
        let peer_id = peer_id.clone();
        Box::pin(async move {
            state.dispatch(LoadAction::NotFoundInPeer { peer_id });
            Ok(())
        })
    })
}

/// A peer reaction that supplies the object's content.
fn found_hook(state: Arc<CoValueState>, co_value: DynCoValue) -> SendHook {
    Arc::new(move |_message| {
        let state = state.clone();
        let co_value = co_value.clone();
        Box::pin(async move {
            state.dispatch(LoadAction::Available { co_value });
            Ok(())
        })
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn retries_each_server_peer_up_to_max() {
    enable_tracing();
    let id = random_co_value_id();
    let (state, sink) = unknown_state(id.clone());

    let peer_1 = MockPeer::create(random_peer_id(), PeerRole::Server);
    peer_1.set_send_hook(not_found_hook(state.clone(), peer_1.id()));
    let peer_2 = MockPeer::create(random_peer_id(), PeerRole::Server);
    peer_2.set_send_hook(not_found_hook(state.clone(), peer_2.id()));
    let peers: Vec<DynPeer> = vec![peer_1.clone(), peer_2.clone()];

    test_loader(5, 5).load_from_peers(&state, &peers).await;

    assert_eq!(5, peer_1.sent_count());
    assert_eq!(5, peer_2.sent_count());
    assert_eq!(
        PeerMessage::load_request(id),
        peer_1.sent().first().unwrap().clone(),
    );
    assert_eq!(LoadStateLabel::Unavailable, state.label());
    assert!(!state.co_value().await.is_available());
    assert_eq!(0, sink.value(LoadStateLabel::Loading));
    assert_eq!(1, sink.value(LoadStateLabel::Unavailable));
}

#[tokio::test(flavor = "multi_thread")]
async fn errored_peer_is_skipped_for_this_object() {
    let id = random_co_value_id();
    let (state, _sink) = unknown_state(id.clone());

    // Peer 1 records a content error for this object on its first
    // response, as the transport would after a bad reply.
    let peer_1 = MockPeer::create(random_peer_id(), PeerRole::Server);
    {
        let state = state.clone();
        let peer_1_inner = peer_1.clone();
        let id = id.clone();
        peer_1.set_send_hook(Arc::new(move |_message| {
            let state = state.clone();
            let peer = peer_1_inner.clone();
            let id = id.clone();
            Box::pin(async move {
                peer.set_errored(id);
                state.dispatch(LoadAction::NotFoundInPeer {
                    peer_id: peer.id(),
                });
                Ok(())
            })
        }));
    }
    let peer_2 = MockPeer::create(random_peer_id(), PeerRole::Server);
    peer_2.set_send_hook(not_found_hook(state.clone(), peer_2.id()));
    let peers: Vec<DynPeer> = vec![peer_1.clone(), peer_2.clone()];

    test_loader(5, 5).load_from_peers(&state, &peers).await;

    assert_eq!(1, peer_1.sent_count());
    assert_eq!(5, peer_2.sent_count());
    assert_eq!(LoadStateLabel::Unavailable, state.label());
    assert!(!state.co_value().await.is_available());
}

#[tokio::test(flavor = "multi_thread")]
async fn storage_peer_is_queried_exactly_once() {
    let id = random_co_value_id();
    let (state, _sink) = unknown_state(id.clone());

    let storage = MockPeer::create(random_peer_id(), PeerRole::Storage);
    storage.set_send_hook(not_found_hook(state.clone(), storage.id()));
    let server = MockPeer::create(random_peer_id(), PeerRole::Server);
    server.set_send_hook(not_found_hook(state.clone(), server.id()));
    let peers: Vec<DynPeer> = vec![storage.clone(), server.clone()];

    test_loader(5, 5).load_from_peers(&state, &peers).await;

    assert_eq!(1, storage.sent_count());
    assert_eq!(5, server.sent_count());
    assert_eq!(LoadStateLabel::Unavailable, state.label());
}

#[tokio::test(flavor = "multi_thread")]
async fn content_arriving_between_attempts_stops_retries() {
    let id = random_co_value_id();
    let (state, _sink) = unknown_state(id.clone());
    let co_value = TestCoValue::create(id.clone());

    // The peer answers not-found twice; shortly after the second answer
    // the content arrives out of band, during the inter-attempt delay.
    let peer = MockPeer::create(random_peer_id(), PeerRole::Server);
    {
        let state = state.clone();
        let peer_id = peer.id();
        let co_value = co_value.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        peer.set_send_hook(Arc::new(move |_message| {
            let state = state.clone();
            let peer_id = peer_id.clone();
            let co_value = co_value.clone();
            let calls = calls.clone();
            Box::pin(async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                state.dispatch(LoadAction::NotFoundInPeer { peer_id });
                if call == 2 {
                    tokio::task::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        state.dispatch(LoadAction::Available { co_value });
                    });
                }
                Ok(())
            })
        }));
    }
    let peers: Vec<DynPeer> = vec![peer.clone()];

    test_loader(5, 50).load_from_peers(&state, &peers).await;

    assert_eq!(2, peer.sent_count());
    assert_eq!(LoadStateLabel::Available, state.label());
    let result = state.co_value().await;
    assert_eq!(id, result.co_value().unwrap().id());
}

#[tokio::test(flavor = "multi_thread")]
async fn content_arriving_during_an_attempt_stops_retries() {
    let id = random_co_value_id();
    let (state, _sink) = unknown_state(id.clone());
    let co_value = TestCoValue::create(id.clone());

    // Found on the third visit, while the attempt's send is in flight.
    let peer = MockPeer::create(random_peer_id(), PeerRole::Server);
    {
        let state = state.clone();
        let peer_id = peer.id();
        let co_value = co_value.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        peer.set_send_hook(Arc::new(move |_message| {
            let state = state.clone();
            let peer_id = peer_id.clone();
            let co_value = co_value.clone();
            let calls = calls.clone();
            Box::pin(async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call == 3 {
                    state.dispatch(LoadAction::Available { co_value });
                }
                state.dispatch(LoadAction::NotFoundInPeer { peer_id });
                Ok(())
            })
        }));
    }
    let peers: Vec<DynPeer> = vec![peer.clone()];

    test_loader(5, 5).load_from_peers(&state, &peers).await;

    assert_eq!(3, peer.sent_count());
    assert_eq!(LoadStateLabel::Available, state.label());
    assert!(state.co_value().await.is_available());
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausted_object_can_be_resurrected() {
    let id = random_co_value_id();
    let (state, sink) = unknown_state(id.clone());

    let peer = MockPeer::create(random_peer_id(), PeerRole::Server);
    peer.set_send_hook(not_found_hook(state.clone(), peer.id()));
    let peers: Vec<DynPeer> = vec![peer.clone()];

    test_loader(5, 5).load_from_peers(&state, &peers).await;

    assert_eq!(5, peer.sent_count());
    assert_eq!(LoadStateLabel::Unavailable, state.label());
    assert!(!state.co_value().await.is_available());

    // Late arrival promotes the object without re-entering the loader.
    let co_value = TestCoValue::create(id.clone());
    state.dispatch(LoadAction::Available { co_value });

    assert_eq!(LoadStateLabel::Available, state.label());
    assert_eq!(
        id,
        state.co_value().await.co_value().unwrap().id(),
    );
    assert_eq!(0, sink.value(LoadStateLabel::Unavailable));
    assert_eq!(1, sink.value(LoadStateLabel::Available));
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_peer_never_receives_a_send() {
    let id = random_co_value_id();
    let (state, _sink) = unknown_state(id.clone());
    let co_value = TestCoValue::create(id.clone());

    let closed = MockPeer::create(random_peer_id(), PeerRole::Storage);
    closed.set_closed(true);
    let server = MockPeer::create(random_peer_id(), PeerRole::Server);
    server.set_send_hook(found_hook(state.clone(), co_value));
    let peers: Vec<DynPeer> = vec![closed.clone(), server.clone()];

    test_loader(5, 5).load_from_peers(&state, &peers).await;

    assert_eq!(0, closed.sent_count());
    assert_eq!(1, server.sent_count());
    assert_eq!(LoadStateLabel::Available, state.label());
}

#[tokio::test(flavor = "multi_thread")]
async fn announce_goes_to_uncontacted_peers_once_available() {
    let id = random_co_value_id();
    let (state, _sink) = unknown_state(id.clone());
    let co_value = TestCoValue::create(id.clone());

    // Storage answers found immediately; the server peer has not been
    // contacted yet at that point and gets the known state instead of a
    // request, exactly once.
    let storage = MockPeer::create(random_peer_id(), PeerRole::Storage);
    storage.set_send_hook(found_hook(state.clone(), co_value.clone()));
    let server = MockPeer::create(random_peer_id(), PeerRole::Server);
    let peers: Vec<DynPeer> = vec![storage.clone(), server.clone()];

    test_loader(5, 5).load_from_peers(&state, &peers).await;

    assert_eq!(1, storage.sent_count());
    assert_eq!(
        vec![PeerMessage::announce(co_value.known_state())],
        server.sent(),
    );
    assert_eq!(LoadStateLabel::Available, state.label());
    assert!(state.co_value().await.is_available());
}

#[tokio::test(flavor = "multi_thread")]
async fn unresponsive_server_does_not_wedge_the_loader() {
    let id = random_co_value_id();
    let (state, _sink) = unknown_state(id.clone());

    // No hook: sends succeed but no response ever comes back.
    let peer = MockPeer::create(random_peer_id(), PeerRole::Server);
    let peers: Vec<DynPeer> = vec![peer.clone()];

    test_loader(5, 5).load_from_peers(&state, &peers).await;

    assert_eq!(5, peer.sent_count());
    assert_eq!(LoadStateLabel::Unavailable, state.label());
    assert!(!state.co_value().await.is_available());
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_send_counts_as_no_response() {
    enable_tracing();
    let id = random_co_value_id();
    let (state, sink) = unknown_state(id.clone());

    // The transport rejects every send. Each rejection is an absent
    // response for that attempt, so the full retry schedule runs and the
    // object ends up unavailable rather than erroring out.
    let peer = MockPeer::create(random_peer_id(), PeerRole::Server);
    peer.set_send_hook(Arc::new(move |_message| {
        Box::pin(async move {
            Err(CoSyncError::other("connection reset"))
        })
    }));
    let peers: Vec<DynPeer> = vec![peer.clone()];

    test_loader(5, 5).load_from_peers(&state, &peers).await;

    assert_eq!(5, peer.sent_count());
    assert_eq!(LoadStateLabel::Unavailable, state.label());
    assert!(!state.co_value().await.is_available());
    assert_eq!(1, sink.value(LoadStateLabel::Unavailable));
}

#[tokio::test(flavor = "multi_thread")]
async fn client_peers_are_never_queried() {
    let id = random_co_value_id();
    let (state, _sink) = unknown_state(id.clone());

    let client = MockPeer::create(random_peer_id(), PeerRole::Client);
    let server = MockPeer::create(random_peer_id(), PeerRole::Server);
    server.set_send_hook(not_found_hook(state.clone(), server.id()));
    let peers: Vec<DynPeer> = vec![client.clone(), server.clone()];

    test_loader(5, 5).load_from_peers(&state, &peers).await;

    assert_eq!(0, client.sent_count());
    assert_eq!(5, server.sent_count());
}

#[tokio::test(flavor = "multi_thread")]
async fn client_peers_are_not_recorded_as_queried() {
    let id = random_co_value_id();
    let (state, _sink) = unknown_state(id.clone());

    // Capture the recorded peer set mid-cycle, while the object is still
    // loading; it is gone once the cycle reaches a terminal state.
    let observed = Arc::new(std::sync::Mutex::new(None));
    let client = MockPeer::create(random_peer_id(), PeerRole::Client);
    let server = MockPeer::create(random_peer_id(), PeerRole::Server);
    {
        let state = state.clone();
        let observed = observed.clone();
        server.set_send_hook(Arc::new(move |_message| {
            let state = state.clone();
            let observed = observed.clone();
            Box::pin(async move {
                *observed.lock().unwrap() = state.queried_peers();
                Ok(())
            })
        }));
    }
    let peers: Vec<DynPeer> = vec![client.clone(), server.clone()];

    test_loader(1, 5).load_from_peers(&state, &peers).await;

    let queried = observed.lock().unwrap().take().unwrap();
    assert!(queried.contains(&server.id()));
    assert!(!queried.contains(&client.id()));
}

#[tokio::test(flavor = "multi_thread")]
async fn loader_can_be_built_from_file_config() {
    let id = random_co_value_id();
    let (state, _sink) = unknown_state(id.clone());

    let config: Config = serde_json::from_str(
        r#"{
          "coValueLoad": {
            "coValueLoad": {
              "maxRetries": 2,
              "retryInterval": { "secs": 0, "nanos": 5000000 }
            }
          }
        }"#,
    )
    .unwrap();
    let loader = CoValueLoader::from_config(&config).unwrap();

    let peer = MockPeer::create(random_peer_id(), PeerRole::Server);
    let peers: Vec<DynPeer> = vec![peer.clone()];

    loader.load_from_peers(&state, &peers).await;

    assert_eq!(2, peer.sent_count());
    assert_eq!(LoadStateLabel::Unavailable, state.label());
}
