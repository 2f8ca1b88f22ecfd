use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    time::Instant,
};

use log::{debug, trace};

use weft_shared::{
    Body, CloseCause, DeclineReason, Envelope, EnvelopeTag, Identity, Link, LinkAddress,
    LinkBinding, LinkDeclined, LinkError, LinkKey, LinkState, LinkTransition, PushReceipt,
    PushRequest, Scope, Uri,
};

/// What a subscriber observes on one of its links
#[derive(Clone, Debug, PartialEq)]
pub enum DownlinkEvent {
    /// The lane accepted the link
    Linked,
    /// A lane event, either replayed state during sync or a change
    Event(Body),
    /// The replay requested by a sync is complete
    Synced,
    /// The link closed; terminal
    Unlinked {
        cause: CloseCause,
        reason: Option<String>,
    },
    /// The link was declined or timed out; terminal
    Failed(LinkError),
}

impl DownlinkEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownlinkEvent::Unlinked { .. } | DownlinkEvent::Failed(_))
    }
}

/// The subscriber side of a link
pub struct Downlink {
    binding: LinkBinding,
    sync: bool,
    scope: Weak<Scope<Downlink>>,
    events: Mutex<VecDeque<DownlinkEvent>>,
    terminated: AtomicBool,
}

impl Downlink {
    pub(crate) fn new(binding: LinkBinding, sync: bool, scope: Weak<Scope<Downlink>>) -> Self {
        Self {
            binding,
            sync,
            scope,
            events: Mutex::new(VecDeque::new()),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> LinkKey {
        self.binding.key()
    }

    pub fn address(&self) -> &LinkAddress {
        self.binding.address()
    }

    pub fn state(&self) -> LinkState {
        self.binding.state()
    }

    pub fn identity(&self) -> Arc<Identity> {
        self.binding.identity()
    }

    /// Envelopes discarded because they were invalid in the link's state
    pub fn violations(&self) -> u64 {
        self.binding.violations()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.binding.is_closed()
    }

    pub(crate) fn is_addressed_to(&self, node_uri: &Uri, lane_uri: &Uri) -> bool {
        let address = self.binding.address();
        &address.node_uri == node_uri && &address.lane_uri == lane_uri
    }

    pub(crate) fn take_events(&self) -> Vec<DownlinkEvent> {
        self.events().drain(..).collect()
    }

    /// Starts the unlink handshake. Returns false if the link was already
    /// closing or closed.
    pub(crate) fn close(&self, now: Instant) -> bool {
        match self.binding.send(EnvelopeTag::Unlink, now) {
            Ok(LinkTransition::Changed { .. }) => {
                let address = self.binding.address();
                self.emit(Envelope::unlink(&address.node_uri, &address.lane_uri, Body::Absent));
                true
            }
            _ => false,
        }
    }

    pub(crate) fn command(&self, body: Body, now: Instant) -> Result<PushReceipt, LinkError> {
        self.binding.send(EnvelopeTag::Command, now)?;
        let address = self.binding.address();
        Ok(self.emit(Envelope::command(&address.node_uri, &address.lane_uri, body)))
    }

    pub(crate) fn on_envelope(&self, envelope: &Envelope, now: Instant) {
        let tag = envelope.tag();
        if tag == EnvelopeTag::Event && self.binding.state() == LinkState::Unlinking {
            // sent before the lane saw our unlink
            let err = self.binding.discard(tag);
            trace!("{}: dropping event while unlinking: {}", self.key(), err);
            return;
        }

        match (tag, self.binding.receive(tag, now)) {
            (EnvelopeTag::Linked, Ok(LinkTransition::Changed { .. })) => {
                self.push_event(DownlinkEvent::Linked)
            }
            (EnvelopeTag::Synced, Ok(LinkTransition::Changed { .. })) => {
                self.push_event(DownlinkEvent::Synced)
            }
            (EnvelopeTag::Event, Ok(LinkTransition::Pass)) => {
                self.push_event(DownlinkEvent::Event(envelope.body().clone()))
            }
            (EnvelopeTag::Unlink, Ok(LinkTransition::Closed { cause, .. })) => {
                if cause == CloseCause::RemoteUnlinked {
                    let address = self.binding.address();
                    self.emit(Envelope::unlinked(&address.node_uri, &address.lane_uri, Body::Absent));
                }
                self.closed(cause, envelope.body());
            }
            (EnvelopeTag::Unlinked, Ok(LinkTransition::Closed { cause, .. })) => {
                self.closed(cause, envelope.body());
            }
            (_, Ok(transition)) => trace!("{}: `{}` {:?}", self.key(), tag, transition),
            // logged by the binding
            (_, Err(_)) => {}
        }
    }

    pub(crate) fn poll_timeout(&self, now: Instant) {
        if let Some(err) = self.binding.poll_timeout(now) {
            debug!("{} {}: {}", self.key(), self.address(), err);
            self.terminate(DownlinkEvent::Failed(err));
            self.reap();
        }
    }

    /// The connection went away: closes at once, as if the lane had
    /// answered `unlinked`
    pub(crate) fn disconnect(&self) {
        if let LinkTransition::Closed { cause, .. } = self.binding.disconnect() {
            self.terminate(DownlinkEvent::Unlinked {
                cause,
                reason: None,
            });
            self.reap();
        }
    }

    fn closed(&self, cause: CloseCause, body: &Body) {
        let reason = body.reason_str().map(str::to_string);
        let event = match cause {
            CloseCause::Declined => DownlinkEvent::Failed(LinkError::Declined(LinkDeclined {
                address: self.address().to_string(),
                reason: reason.unwrap_or_else(|| "declined".to_string()),
            })),
            cause => DownlinkEvent::Unlinked { cause, reason },
        };
        self.terminate(event);
        self.reap();
    }

    /// Queues the terminal event; a link has exactly one
    fn terminate(&self, event: DownlinkEvent) {
        if !self.terminated.swap(true, Ordering::SeqCst) {
            self.events().push_back(event);
        }
    }

    fn push_event(&self, event: DownlinkEvent) {
        if !self.terminated.load(Ordering::SeqCst) {
            self.events().push_back(event);
        }
    }

    fn reap(&self) {
        if let Some(scope) = self.scope.upgrade() {
            scope.close_downlink(&self.key());
            scope.report_down(self.binding.report());
        }
    }

    fn emit(&self, envelope: Envelope) -> PushReceipt {
        let (request, receipt) = PushRequest::new(
            Uri::empty(),
            self.binding.address().host_uri.clone(),
            envelope,
            self.binding.prio(),
            Some((*self.binding.identity()).clone()),
        );
        match self.scope.upgrade() {
            Some(scope) => scope.push_down(request),
            None => request.decline(DeclineReason::Closed),
        }
        receipt
    }

    fn events(&self) -> MutexGuard<'_, VecDeque<DownlinkEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Link for Downlink {
    fn key(&self) -> LinkKey {
        self.binding.key()
    }

    /// Sends the `link` or `sync` request
    fn open(&self) {
        let tag = if self.sync {
            EnvelopeTag::Sync
        } else {
            EnvelopeTag::Link
        };
        if let Ok(LinkTransition::Changed { .. }) = self.binding.send(tag, Instant::now()) {
            let address = self.binding.address();
            let (prio, rate) = (self.binding.prio(), self.binding.rate());
            let request = if self.sync {
                Envelope::sync(&address.node_uri, &address.lane_uri, prio, rate, Body::Absent)
            } else {
                Envelope::link(&address.node_uri, &address.lane_uri, prio, rate, Body::Absent)
            };
            self.emit(request);
        }
    }

    fn force_close(&self) {
        if let LinkTransition::Closed { cause, .. } = self.binding.force_close() {
            self.terminate(DownlinkEvent::Unlinked {
                cause,
                reason: None,
            });
            self.reap();
        }
    }
}

impl fmt::Debug for Downlink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downlink")
            .field("binding", &self.binding)
            .field("sync", &self.sync)
            .finish()
    }
}

/// A subscriber's handle on one of its links
#[derive(Clone, Debug)]
pub struct LinkHandle {
    downlink: Arc<Downlink>,
}

impl LinkHandle {
    pub(crate) fn new(downlink: Arc<Downlink>) -> Self {
        Self { downlink }
    }

    pub(crate) fn downlink(&self) -> &Arc<Downlink> {
        &self.downlink
    }

    pub fn key(&self) -> LinkKey {
        self.downlink.key()
    }

    pub fn address(&self) -> &LinkAddress {
        self.downlink.address()
    }

    pub fn state(&self) -> LinkState {
        self.downlink.state()
    }

    pub fn is_linked(&self) -> bool {
        self.downlink.state().is_linked()
    }

    pub fn is_synced(&self) -> bool {
        self.downlink.state() == LinkState::Synced
    }

    pub fn is_closed(&self) -> bool {
        self.downlink.is_closed()
    }

    /// The identity the link was opened with
    pub fn identity(&self) -> Arc<Identity> {
        self.downlink.identity()
    }

    /// Envelopes discarded because they were invalid in the link's state
    pub fn violations(&self) -> u64 {
        self.downlink.violations()
    }

    /// Sends a command to the lane. Fails unless the link is linked; the
    /// receipt resolves once the command is queued toward the host.
    pub fn command(&self, body: Body) -> Result<PushReceipt, LinkError> {
        self.downlink.command(body, Instant::now())
    }

    /// Takes every event observed since the last call
    pub fn take_events(&self) -> Vec<DownlinkEvent> {
        self.downlink.take_events()
    }
}
