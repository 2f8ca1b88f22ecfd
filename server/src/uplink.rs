use std::{
    fmt,
    sync::{Arc, Weak},
    time::Instant,
};

use log::{debug, warn};

use weft_shared::{
    Body, DeclineReason, DeliveryOutcome, Envelope, EnvelopeTag, Identity, Link, LinkAddress,
    LinkBinding, LinkKey, LinkState, LinkTransition, PushRequest, Uri,
};

use crate::{connection::Connection, lane::LaneCell, stats::HostStats};

/// The lane side of a link: emits `linked`, `event`, `synced` and the
/// unlink handshake toward one remote subscriber
pub struct Uplink {
    binding: LinkBinding,
    mesh_uri: Uri,
    remote_uri: Uri,
    lane: Weak<LaneCell>,
    connection: Weak<Connection>,
    stats: Arc<HostStats>,
}

impl Uplink {
    pub(crate) fn new(
        binding: LinkBinding,
        mesh_uri: Uri,
        lane: &Arc<LaneCell>,
        connection: &Arc<Connection>,
        stats: Arc<HostStats>,
    ) -> Self {
        Self {
            binding,
            mesh_uri,
            remote_uri: connection.remote_uri().clone(),
            lane: Arc::downgrade(lane),
            connection: Arc::downgrade(connection),
            stats,
        }
    }

    pub fn key(&self) -> LinkKey {
        self.binding.key()
    }

    pub fn address(&self) -> &LinkAddress {
        self.binding.address()
    }

    /// The host the subscriber of this link connects from
    pub fn remote_uri(&self) -> &Uri {
        &self.remote_uri
    }

    pub fn state(&self) -> LinkState {
        self.binding.state()
    }

    pub fn is_linked(&self) -> bool {
        self.binding.is_linked()
    }

    pub fn is_closed(&self) -> bool {
        self.binding.is_closed()
    }

    pub fn sync_requested(&self) -> bool {
        self.binding.sync_requested()
    }

    pub fn identity(&self) -> Arc<Identity> {
        self.binding.identity()
    }

    pub(crate) fn set_identity(&self, identity: Identity) {
        self.binding.set_identity(identity);
    }

    pub(crate) fn is_addressed_to(&self, node_uri: &Uri, lane_uri: &Uri) -> bool {
        let address = self.binding.address();
        &address.node_uri == node_uri && &address.lane_uri == lane_uri
    }

    // Outbound

    /// Feeds the subscriber's `link` / `sync` request into the machine
    pub(crate) fn request(&self, tag: EnvelopeTag, now: Instant) {
        if let Err(err) = self.binding.receive(tag, now) {
            self.stats.protocol_violation();
            debug!("{}: {}", self.key(), err);
        }
    }

    /// Sends `linked`. Returns false if the link did not stay open.
    pub(crate) fn accept(&self, now: Instant) -> bool {
        let Ok(LinkTransition::Changed { .. }) = self.binding.send(EnvelopeTag::Linked, now) else {
            return false;
        };
        let address = self.binding.address();
        self.emit(Envelope::linked(
            &address.node_uri,
            &address.lane_uri,
            self.binding.prio(),
            self.binding.rate(),
            Body::Absent,
        ))
    }

    /// Sends an `event`. Returns false if the link is not linked, or failed
    /// because the event could not be delivered.
    pub(crate) fn emit_event(&self, body: Body, now: Instant) -> bool {
        if self.binding.send(EnvelopeTag::Event, now).is_err() {
            return false;
        }
        let address = self.binding.address();
        self.emit(Envelope::event(&address.node_uri, &address.lane_uri, body))
    }

    pub(crate) fn complete_sync(&self, now: Instant) {
        if let Ok(LinkTransition::Changed { .. }) = self.binding.send(EnvelopeTag::Synced, now) {
            let address = self.binding.address();
            self.emit(Envelope::synced(&address.node_uri, &address.lane_uri, Body::Absent));
        }
    }

    /// Rejects a pending link request with a terminal `unlinked`
    pub(crate) fn decline(&self, reason: &str, now: Instant) {
        if let Ok(LinkTransition::Closed { .. }) = self.binding.send(EnvelopeTag::Unlinked, now) {
            self.stats.link_declined();
            self.emit_unlinked(Body::reason(reason));
            self.detach();
        }
    }

    /// Starts the unlink handshake from the lane side
    pub(crate) fn unlink(&self, now: Instant) {
        if let Ok(LinkTransition::Changed { .. }) = self.binding.send(EnvelopeTag::Unlink, now) {
            let address = self.binding.address();
            self.emit(Envelope::unlink(&address.node_uri, &address.lane_uri, Body::Absent));
        }
    }

    // Inbound

    pub(crate) fn on_command(&self, body: &Body, now: Instant) {
        match self.binding.receive(EnvelopeTag::Command, now) {
            Ok(LinkTransition::Pass) => {}
            Ok(_) => return,
            Err(_) => {
                self.stats.protocol_violation();
                return;
            }
        }
        let Some(lane) = self.lane.upgrade() else {
            return;
        };
        if let Err(err) = lane.apply(body) {
            warn!("{}: command rejected by {}: {}", self.key(), self.address(), err);
        }
    }

    pub(crate) fn on_unlink(&self, now: Instant) {
        match self.binding.receive(EnvelopeTag::Unlink, now) {
            Ok(LinkTransition::Closed { .. }) => {
                self.emit_unlinked(Body::Absent);
                self.detach();
            }
            Ok(_) => {}
            Err(_) => self.stats.protocol_violation(),
        }
    }

    pub(crate) fn on_unlinked(&self, now: Instant) {
        match self.binding.receive(EnvelopeTag::Unlinked, now) {
            Ok(LinkTransition::Closed { .. }) => self.detach(),
            Ok(_) => {}
            Err(_) => self.stats.protocol_violation(),
        }
    }

    /// Counts an envelope only a lane may originate, arriving from the
    /// subscriber
    pub(crate) fn on_misdirected(&self, tag: EnvelopeTag, now: Instant) {
        if self.binding.receive(tag, now).is_err() {
            self.stats.protocol_violation();
        }
    }

    // Reaping

    pub(crate) fn poll_timeout(&self, now: Instant) {
        if let Some(err) = self.binding.poll_timeout(now) {
            warn!("{} {}: {}", self.key(), self.address(), err);
            self.stats.timeout();
            self.detach();
        }
    }

    /// The subscriber's connection went away; nobody is left to notify
    pub(crate) fn disconnect(&self) {
        if let LinkTransition::Closed { .. } = self.binding.disconnect() {
            self.detach();
        }
    }

    /// Queues the final `unlinked` of this link directly on its connection,
    /// where it is admitted even if the outbox is full
    fn emit_unlinked(&self, body: Body) {
        let address = self.binding.address();
        let (request, _receipt) = PushRequest::new(
            self.mesh_uri.clone(),
            self.remote_uri.clone(),
            Envelope::unlinked(&address.node_uri, &address.lane_uri, body),
            self.binding.prio(),
            Some((*self.binding.identity()).clone()),
        );
        match self.connection.upgrade() {
            Some(connection) => match connection.offer_terminal(request) {
                Ok(()) => self.stats.push_delivered(),
                Err(_) => self.stats.push_declined(),
            },
            None => request.decline(DeclineReason::Closed),
        }
    }

    /// Hands an envelope to the lane's scope, which routes it down to the
    /// subscriber's connection. A declined envelope fails the link, and
    /// false is returned.
    fn emit(&self, envelope: Envelope) -> bool {
        let (request, mut receipt) = PushRequest::new(
            self.mesh_uri.clone(),
            self.remote_uri.clone(),
            envelope,
            self.binding.prio(),
            Some((*self.binding.identity()).clone()),
        );
        match self.lane.upgrade() {
            Some(lane) => lane.scope().push_down(request),
            None => request.decline(DeclineReason::Closed),
        }
        match receipt.try_outcome() {
            Some(DeliveryOutcome::Declined(reason)) => {
                self.fail(reason);
                false
            }
            Some(DeliveryOutcome::Delivered) | None => true,
        }
    }

    /// The subscriber missed an envelope, so its view can no longer be
    /// trusted: closes the link and tells the subscriber why
    fn fail(&self, reason: DeclineReason) {
        match reason {
            DeclineReason::Backpressure { capacity } => {
                let Ok(LinkTransition::Closed { .. }) =
                    self.binding.send(EnvelopeTag::Unlinked, Instant::now())
                else {
                    return;
                };
                warn!(
                    "{} {}: outbox of {} full ({} envelopes), closing link",
                    self.key(),
                    self.address(),
                    self.remote_uri,
                    capacity
                );
                self.stats.link_failed();
                self.emit_unlinked(Body::reason("backpressure"));
                self.detach();
            }
            // the connection is closed or gone, nobody is left to tell
            reason => {
                debug!("{} {}: envelope declined: {:?}", self.key(), self.address(), reason);
                self.disconnect();
            }
        }
    }

    /// Removes a closed link from every registry it was published in
    fn detach(&self) {
        let key = self.key();
        let report = self.binding.report();
        if let Some(connection) = self.connection.upgrade() {
            connection.uplinks().close_downlink(&key);
        }
        match self.lane.upgrade() {
            Some(lane) => {
                lane.scope().close_downlink(&key);
                lane.scope().report_down(report);
            }
            None => self.stats.record(&report),
        }
    }
}

impl Link for Uplink {
    fn key(&self) -> LinkKey {
        self.binding.key()
    }

    fn force_close(&self) {
        if let LinkTransition::Closed { .. } = self.binding.force_close() {
            self.emit_unlinked(Body::reason("closed"));
            self.detach();
        }
    }
}

impl fmt::Debug for Uplink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uplink")
            .field("binding", &self.binding)
            .field("remote_uri", &self.remote_uri)
            .finish()
    }
}
