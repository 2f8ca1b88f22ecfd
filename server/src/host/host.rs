use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use log::{debug, info, warn};

use weft_shared::{
    transport::{PacketReceiver, PacketSender},
    Body, CellContext, Envelope, EnvelopeCodec, EnvelopeTag, Identity, JsonCodec, LinkAddress,
    LinkBinding, LinkKeyGenerator, LinkRole, PushRequest, ScopeError, Uri,
};

use crate::{
    connection::Connection,
    host::HostConfig,
    lane::LaneCell,
    node::NodeCell,
    policy::{LinkPolicy, OpenPolicy},
    router::Router,
    stats::HostStats,
    uplink::Uplink,
    HostError,
};

/// Hosts nodes & their lanes, and serves links to them from connected
/// remote peers
pub struct Host {
    config: HostConfig,
    router: Arc<Router>,
    policy: Box<dyn LinkPolicy>,
    codec: Box<dyn EnvelopeCodec>,
    keys: LinkKeyGenerator,
    stats: Arc<HostStats>,
    closed: AtomicBool,
}

impl Host {
    /// Create a new Host serving the given nodes
    pub fn new<U: Into<Uri>>(
        config: HostConfig,
        host_uri: U,
        nodes: Vec<NodeCell>,
    ) -> Result<Self, HostError> {
        config.push.validate()?;
        let stats = Arc::new(HostStats::default());
        let router = Router::new(host_uri.into(), nodes, Arc::clone(&stats))?;
        info!("host {} started", router.host_uri());

        Ok(Self {
            config,
            router,
            policy: Box::new(OpenPolicy),
            codec: Box::new(JsonCodec),
            keys: LinkKeyGenerator::new(),
            stats,
            closed: AtomicBool::new(false),
        })
    }

    /// Replaces the policy deciding who may authenticate & link
    pub fn with_policy<P: LinkPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replaces the codec payloads are encoded with
    pub fn with_codec<C: EnvelopeCodec + 'static>(mut self, codec: C) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn host_uri(&self) -> &Uri {
        self.router.host_uri()
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn stats(&self) -> &HostStats {
        &self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns the lane mounted at `node_uri`/`lane_uri`
    pub fn lane<N: Into<Uri>, L: Into<Uri>>(&self, node_uri: N, lane_uri: L) -> Option<Arc<LaneCell>> {
        self.router
            .lane(&node_uri.into(), &lane_uri.into())
            .cloned()
    }

    // Connections

    /// Accepts a connection from a remote peer
    pub fn connect<U: Into<Uri>>(&self, remote_uri: U) -> Result<(), HostError> {
        self.check_open()?;
        let remote_uri = remote_uri.into();
        let connection = Arc::new(Connection::new(remote_uri.clone(), &self.config.push));
        self.router.add_connection(connection)?;
        info!("{}: {} connected", self.host_uri(), remote_uri);
        Ok(())
    }

    /// Drops a connection. Every link of the connection closes at once,
    /// without waiting for the peer.
    pub fn disconnect<U: Into<Uri>>(&self, remote_uri: U) -> Result<(), HostError> {
        let remote_uri = remote_uri.into();
        let connection = self
            .router
            .remove_connection(&remote_uri)
            .ok_or_else(|| HostError::UnknownConnection {
                remote: remote_uri.to_string(),
            })?;
        connection.close();
        info!("{}: {} disconnected", self.host_uri(), remote_uri);
        Ok(())
    }

    pub fn is_connected<U: Into<Uri>>(&self, remote_uri: U) -> bool {
        self.router.connection(&remote_uri.into()).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.router.connections().len()
    }

    /// The identity a remote peer authenticated as
    pub fn identity<U: Into<Uri>>(&self, remote_uri: U) -> Option<Arc<Identity>> {
        self.router
            .connection(&remote_uri.into())
            .map(|connection| connection.identity())
    }

    // Incoming

    /// Decodes & dispatches one payload received from a remote peer. A
    /// payload that fails to decode is counted and dropped; the connection
    /// stays open.
    pub fn receive<U: Into<Uri>>(&self, remote_uri: U, payload: &[u8]) -> Result<(), HostError> {
        let remote_uri = remote_uri.into();
        let envelope = match self.codec.decode(payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.stats.decode_error();
                warn!("{}: dropping payload from {}: {}", self.host_uri(), remote_uri, err);
                return Err(err.into());
            }
        };
        self.receive_envelope(remote_uri, envelope)
    }

    /// Receives every payload waiting on `receiver`. Returns how many were
    /// received; payloads that fail to decode are skipped.
    pub fn receive_packets<U: Into<Uri>>(
        &self,
        remote_uri: U,
        receiver: &mut dyn PacketReceiver,
    ) -> Result<usize, HostError> {
        let remote_uri = remote_uri.into();
        let mut count = 0;
        loop {
            match receiver.receive() {
                Ok(Some(payload)) => {
                    count += 1;
                    match self.receive(&remote_uri, payload) {
                        Ok(()) | Err(HostError::Decode(_)) => {}
                        Err(err) => return Err(err),
                    }
                }
                Ok(None) => return Ok(count),
                Err(err) => {
                    warn!("{}: transport from {} closed: {}", self.host_uri(), remote_uri, err);
                    return Ok(count);
                }
            }
        }
    }

    /// Dispatches one envelope received from a remote peer
    pub fn receive_envelope<U: Into<Uri>>(
        &self,
        remote_uri: U,
        envelope: Envelope,
    ) -> Result<(), HostError> {
        self.check_open()?;
        let remote_uri = remote_uri.into();
        let connection = self
            .router
            .connection(&remote_uri)
            .ok_or_else(|| HostError::UnknownConnection {
                remote: remote_uri.to_string(),
            })?;
        let now = Instant::now();

        match envelope.tag() {
            EnvelopeTag::Auth => self.authenticate(&connection, envelope.body()),
            EnvelopeTag::Deauth => self.deauthenticate(&connection),
            EnvelopeTag::Link | EnvelopeTag::Sync => self.open_uplink(&connection, &envelope, now),
            EnvelopeTag::Command => match connection.find_uplink(envelope.node_uri(), envelope.lane_uri()) {
                Some(uplink) => uplink.on_command(envelope.body(), now),
                None => self.misdirected(&connection, &envelope),
            },
            EnvelopeTag::Unlink => {
                if let Some(uplink) = connection.find_uplink(envelope.node_uri(), envelope.lane_uri()) {
                    uplink.on_unlink(now);
                }
            }
            EnvelopeTag::Unlinked => {
                if let Some(uplink) = connection.find_uplink(envelope.node_uri(), envelope.lane_uri()) {
                    uplink.on_unlinked(now);
                }
            }
            EnvelopeTag::Event | EnvelopeTag::Linked | EnvelopeTag::Synced => {
                match connection.find_uplink(envelope.node_uri(), envelope.lane_uri()) {
                    Some(uplink) => uplink.on_misdirected(envelope.tag(), now),
                    None => self.misdirected(&connection, &envelope),
                }
            }
            EnvelopeTag::Authed | EnvelopeTag::Deauthed => self.misdirected(&connection, &envelope),
        }
        Ok(())
    }

    // Outgoing

    /// Takes every envelope waiting to be sent to a remote peer
    pub fn take_outgoing<U: Into<Uri>>(&self, remote_uri: U) -> Vec<Envelope> {
        self.router
            .connection(&remote_uri.into())
            .map(|connection| connection.take_outgoing())
            .unwrap_or_default()
    }

    /// Number of envelopes waiting to be sent to a remote peer
    pub fn pending<U: Into<Uri>>(&self, remote_uri: U) -> usize {
        self.router
            .connection(&remote_uri.into())
            .map(|connection| connection.pending())
            .unwrap_or(0)
    }

    /// Encodes & sends every envelope waiting for a remote peer. Returns
    /// how many were sent.
    pub fn send_packets<U: Into<Uri>>(
        &self,
        remote_uri: U,
        sender: &dyn PacketSender,
    ) -> Result<usize, HostError> {
        let outgoing = self.take_outgoing(remote_uri);
        for envelope in &outgoing {
            sender.send(&self.codec.encode(envelope))?;
        }
        Ok(outgoing.len())
    }

    /// Routes a push originating on this host: into a local lane when
    /// addressed to this host, otherwise to a connected peer
    pub fn push(&self, request: PushRequest) {
        self.router.push_down(request);
    }

    // Maintenance

    /// Must be called regularly, closes links whose unlink handshake is
    /// overdue
    pub fn update(&self, now: Instant) {
        for connection in self.router.connections() {
            for uplink in connection.uplinks().snapshot().iter() {
                uplink.poll_timeout(now);
            }
        }
    }

    /// Asks every subscriber of a lane to unlink. Links close once their
    /// subscribers answer, or time out.
    pub fn unlink<N: Into<Uri>, L: Into<Uri>>(&self, node_uri: N, lane_uri: L) -> Result<usize, HostError> {
        let node_uri = node_uri.into();
        let lane_uri = lane_uri.into();
        let lane = self
            .router
            .lane(&node_uri, &lane_uri)
            .ok_or_else(|| HostError::UnknownLane {
                node: node_uri.to_string(),
                lane: lane_uri.to_string(),
            })?;
        Ok(lane.unlink_all(Instant::now()))
    }

    /// Closes every lane, force-closing their links with a final `unlinked`.
    /// Connections stay open so those can still be sent. Returns how many
    /// links were closed.
    pub fn close(&self) -> usize {
        if self.closed.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let closed = self.router.lanes().map(|lane| lane.close()).sum();
        info!("host {} closed, {} links force-closed", self.host_uri(), closed);
        closed
    }

    // Dispatch

    fn authenticate(&self, connection: &Arc<Connection>, credentials: &Body) {
        match self.policy.authenticate(credentials) {
            Ok(identity) => {
                debug!(
                    "{} authenticated as {:?}",
                    connection.remote_uri(),
                    identity.subject()
                );
                let mut authed = serde_json::Map::new();
                if let Some(subject) = identity.subject() {
                    authed.insert("subject".to_string(), subject.into());
                }
                connection.set_identity(identity);
                self.reply(connection, Envelope::authed(Body::from(serde_json::Value::Object(authed))));
            }
            Err(reason) => {
                warn!("{} failed to authenticate: {}", connection.remote_uri(), reason);
                connection.set_identity(Identity::Anonymous);
                self.reply(connection, Envelope::deauthed(Body::reason(&reason)));
            }
        }
    }

    fn deauthenticate(&self, connection: &Arc<Connection>) {
        debug!("{} deauthenticated", connection.remote_uri());
        connection.set_identity(Identity::Anonymous);
        self.reply(connection, Envelope::deauthed(Body::Absent));
    }

    fn open_uplink(&self, connection: &Arc<Connection>, envelope: &Envelope, now: Instant) {
        let node_uri = envelope.node_uri();
        let lane_uri = envelope.lane_uri();
        let address = LinkAddress::new(self.host_uri(), node_uri, lane_uri);

        if connection.find_uplink(node_uri, lane_uri).is_some() {
            return self.decline_link(connection, envelope, "already linked");
        }
        let Some(lane) = self.router.lane(node_uri, lane_uri).cloned() else {
            let reason = if self.router.has_node(node_uri) {
                "lane not found"
            } else {
                "node not found"
            };
            return self.decline_link(connection, envelope, reason);
        };
        let identity = connection.identity();
        if self.config.require_auth && identity.is_anonymous() {
            return self.decline_link(connection, envelope, "authentication required");
        }
        if let Err(reason) = self.policy.authorize(&address, &identity) {
            return self.decline_link(connection, envelope, &reason);
        }

        let binding = LinkBinding::new(
            self.keys.generate(),
            address,
            LinkRole::Uplink,
            envelope.prio(),
            envelope.rate(),
            (*identity).clone(),
            &self.config.link,
        );
        let uplink = Arc::new(Uplink::new(
            binding,
            self.config.mesh_uri.clone(),
            &lane,
            connection,
            Arc::clone(&self.stats),
        ));
        uplink.request(envelope.tag(), now);
        self.stats.link_opened();

        if let Err(err) = connection.uplinks().bind_downlink(Arc::clone(&uplink)) {
            debug!("{}: {}", uplink.key(), err);
            uplink.disconnect();
            return;
        }
        match lane.open_uplink(&uplink, now) {
            Ok(()) => debug!("{} {} opened by {}", uplink.key(), uplink.address(), connection.remote_uri()),
            Err(ScopeError::Closed { .. }) => uplink.decline("lane closed", now),
            Err(err) => {
                warn!("{}: {}", uplink.key(), err);
                uplink.decline("internal error", now);
            }
        }
    }

    /// Answers a link request that never got a binding with a terminal
    /// `unlinked`
    fn decline_link(&self, connection: &Arc<Connection>, envelope: &Envelope, reason: &str) {
        debug!(
            "declining link from {} to {}#{}: {}",
            connection.remote_uri(),
            envelope.node_uri(),
            envelope.lane_uri(),
            reason
        );
        self.stats.link_declined();
        let unlinked = Envelope::unlinked(envelope.node_uri(), envelope.lane_uri(), Body::reason(reason));
        self.reply_with_prio(connection, unlinked, envelope.prio());
    }

    fn misdirected(&self, connection: &Arc<Connection>, envelope: &Envelope) {
        self.stats.protocol_violation();
        warn!(
            "{}: discarding `{}` for {}#{} from {}",
            self.host_uri(),
            envelope.tag(),
            envelope.node_uri(),
            envelope.lane_uri(),
            connection.remote_uri()
        );
    }

    fn reply(&self, connection: &Arc<Connection>, envelope: Envelope) {
        self.reply_with_prio(connection, envelope, 0.0);
    }

    fn reply_with_prio(&self, connection: &Arc<Connection>, envelope: Envelope, prio: f32) {
        let (request, _receipt) = PushRequest::new(
            self.config.mesh_uri.clone(),
            connection.remote_uri().clone(),
            envelope,
            prio,
            None,
        );
        self.router.push_down(request);
    }

    fn check_open(&self) -> Result<(), HostError> {
        if self.is_closed() {
            return Err(HostError::Closed {
                host: self.host_uri().to_string(),
            });
        }
        Ok(())
    }
}
