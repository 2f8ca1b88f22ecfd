use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use log::debug;

use weft_shared::{
    CellAddress, DeclineReason, Envelope, Identity, PushConfig, PushQueue, PushRequest, Scope,
    Uri,
};

use crate::uplink::Uplink;

/// One remote peer connected to the host: its outbox, its identity, and
/// the uplinks it subscribed through
pub struct Connection {
    remote_uri: Uri,
    outbox: Mutex<PushQueue>,
    identity: ArcSwap<Identity>,
    uplinks: Scope<Uplink>,
}

impl Connection {
    pub(crate) fn new(remote_uri: Uri, config: &PushConfig) -> Self {
        let address = CellAddress::Host(remote_uri.clone());
        Self {
            remote_uri,
            outbox: Mutex::new(PushQueue::new(config)),
            identity: ArcSwap::from_pointee(Identity::Anonymous),
            uplinks: Scope::new(address, None),
        }
    }

    pub fn remote_uri(&self) -> &Uri {
        &self.remote_uri
    }

    pub fn identity(&self) -> Arc<Identity> {
        self.identity.load_full()
    }

    /// Replaces the identity of the connection and of every link on it
    pub(crate) fn set_identity(&self, identity: Identity) {
        for uplink in self.uplinks.snapshot().iter() {
            uplink.set_identity(identity.clone());
        }
        self.identity.store(Arc::new(identity));
    }

    pub(crate) fn uplinks(&self) -> &Scope<Uplink> {
        &self.uplinks
    }

    /// The open uplink subscribed to `node_uri`/`lane_uri`, if any
    pub(crate) fn find_uplink(&self, node_uri: &Uri, lane_uri: &Uri) -> Option<Arc<Uplink>> {
        self.uplinks
            .find(|uplink| !uplink.is_closed() && uplink.is_addressed_to(node_uri, lane_uri))
    }

    pub(crate) fn offer(&self, request: PushRequest) -> Result<(), DeclineReason> {
        self.outbox().offer(request)
    }

    /// Queues the final `unlinked` of a link, even if the outbox is full
    pub(crate) fn offer_terminal(&self, request: PushRequest) -> Result<(), DeclineReason> {
        self.outbox().offer_terminal(request)
    }

    /// Takes every envelope waiting to be sent, in transmission order
    pub(crate) fn take_outgoing(&self) -> Vec<Envelope> {
        self.outbox().drain()
    }

    pub(crate) fn pending(&self) -> usize {
        self.outbox().len()
    }

    /// Closes the outbox and reaps every uplink without notifying the
    /// peer, which is gone
    pub(crate) fn close(&self) {
        let discarded = self.outbox().close();
        for uplink in self.uplinks.snapshot().iter() {
            uplink.disconnect();
        }
        let remaining = self.uplinks.close();
        debug!(
            "{}: connection closed, {} envelopes discarded, {} links force-closed",
            self.remote_uri, discarded, remaining
        );
    }

    fn outbox(&self) -> MutexGuard<'_, PushQueue> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
