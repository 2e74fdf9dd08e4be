//! A scriptable peer for tests.

use cosync_api::{
    BoxFut, CoSyncResult, CoValueId, Peer, PeerId, PeerMessage, PeerRole,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Reaction to a message arriving at a [MockPeer].
pub type SendHook = Arc<
    dyn Fn(PeerMessage) -> BoxFut<'static, CoSyncResult<()>> + Send + Sync,
>;

/// A peer that records every message sent to it and optionally runs an
/// async hook in response, so tests can script not-found / found replies.
pub struct MockPeer {
    id: PeerId,
    role: PeerRole,
    closed: AtomicBool,
    errored: Mutex<HashSet<CoValueId>>,
    sent: Mutex<Vec<PeerMessage>>,
    hook: Mutex<Option<SendHook>>,
}

impl std::fmt::Debug for MockPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPeer")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("closed", &self.closed)
            .finish()
    }
}

impl MockPeer {
    /// Construct a [MockPeer] with the given identity and role.
    pub fn create(id: PeerId, role: PeerRole) -> Arc<Self> {
        Arc::new(Self {
            id,
            role,
            closed: AtomicBool::new(false),
            errored: Mutex::new(HashSet::new()),
            sent: Mutex::new(Vec::new()),
            hook: Mutex::new(None),
        })
    }

    /// Script the reaction to incoming messages.
    pub fn set_send_hook(&self, hook: SendHook) {
        *self.hook.lock().unwrap() = Some(hook);
    }

    /// Flip the transport-owned closed flag.
    pub fn set_closed(&self, closed: bool) {
        self.closed.store(closed, Ordering::SeqCst);
    }

    /// Record a per-object content error, as the transport would.
    pub fn set_errored(&self, id: CoValueId) {
        self.errored.lock().unwrap().insert(id);
    }

    /// Every message sent to this peer so far, in order.
    pub fn sent(&self) -> Vec<PeerMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// How many messages have been sent to this peer.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Peer for MockPeer {
    fn id(&self) -> PeerId {
        self.id.clone()
    }

    fn role(&self) -> PeerRole {
        self.role
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn is_errored(&self, id: &CoValueId) -> bool {
        self.errored.lock().unwrap().contains(id)
    }

    fn send(&self, message: PeerMessage) -> BoxFut<'_, CoSyncResult<()>> {
        self.sent.lock().unwrap().push(message.clone());
        let hook = self.hook.lock().unwrap().clone();
        Box::pin(async move {
            match hook {
                Some(hook) => hook(message).await,
                None => Ok(()),
            }
        })
    }
}
