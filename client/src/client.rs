use std::{sync::Arc, time::Instant};

use arc_swap::ArcSwap;
use log::{debug, info, warn};

use weft_shared::{
    transport::{PacketReceiver, PacketSender},
    Body, CellAddress, CellContext, Envelope, EnvelopeCodec, EnvelopeTag, Identity, JsonCodec,
    LinkAddress, LinkBinding, LinkKeyGenerator, LinkRole, PushRequest, Scope,
    ScopeError, Uri,
};

use crate::{
    downlink::{Downlink, LinkHandle},
    outbox::Outbox,
    ClientConfig, ClientError, LinkOptions,
};

/// Opens links to the lanes of one remote host, over one connection
pub struct Client {
    config: ClientConfig,
    host_uri: Uri,
    keys: LinkKeyGenerator,
    outbox: Arc<Outbox>,
    downlinks: Arc<Scope<Downlink>>,
    identity: ArcSwap<Identity>,
    codec: Box<dyn EnvelopeCodec>,
}

impl Client {
    /// Create a new Client talking to `host_uri`
    pub fn new<U: Into<Uri>>(config: ClientConfig, host_uri: U) -> Result<Self, ClientError> {
        config.push.validate()?;
        let host_uri = host_uri.into();
        let outbox = Arc::new(Outbox::new(&config.push));
        let context: Arc<dyn CellContext> = outbox.clone();
        let downlinks = Arc::new(Scope::new(CellAddress::Host(host_uri.clone()), Some(context)));

        Ok(Self {
            config,
            host_uri,
            keys: LinkKeyGenerator::new(),
            outbox,
            downlinks,
            identity: ArcSwap::from_pointee(Identity::Anonymous),
            codec: Box::new(JsonCodec),
        })
    }

    /// Replaces the codec payloads are encoded with
    pub fn with_codec<C: EnvelopeCodec + 'static>(mut self, codec: C) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn host_uri(&self) -> &Uri {
        &self.host_uri
    }

    /// The identity last presented to the host
    pub fn identity(&self) -> Arc<Identity> {
        self.identity.load_full()
    }

    /// Number of links that have not closed yet
    pub fn link_count(&self) -> usize {
        self.downlinks.len()
    }

    pub fn is_closed(&self) -> bool {
        self.downlinks.is_closed()
    }

    // Links

    /// Opens a link to a lane of the host. An address with an empty host
    /// URI refers to this client's host. If `identity` differs from the one
    /// last presented, the connection re-authenticates first.
    pub fn open_link(
        &self,
        address: LinkAddress,
        options: LinkOptions,
        identity: Identity,
    ) -> Result<LinkHandle, ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        let address = if address.host_uri.is_empty() {
            address.with_host_uri(&self.host_uri)
        } else {
            address
        };
        if address.host_uri != self.host_uri {
            return Err(ClientError::UnknownHost {
                host: address.host_uri.to_string(),
                expected: self.host_uri.to_string(),
            });
        }

        if self
            .find_downlink(&address.node_uri, &address.lane_uri)
            .is_some()
        {
            return Err(ClientError::AlreadyLinked {
                address: address.to_string(),
            });
        }
        self.present(&identity, options.prio);

        let binding = LinkBinding::new(
            self.keys.generate(),
            address,
            LinkRole::Downlink,
            options.prio,
            options.rate,
            identity,
            &self.config.link,
        );
        let downlink = Arc::new(Downlink::new(
            binding,
            options.sync,
            Arc::downgrade(&self.downlinks),
        ));
        // re-checked against the snapshot the link is published over, so
        // racing opens of one address cannot both succeed
        let address = downlink.address();
        let conflicts = |other: &Downlink| {
            !other.is_closed() && other.is_addressed_to(&address.node_uri, &address.lane_uri)
        };
        match self.downlinks.open_downlink_unless(Arc::clone(&downlink), conflicts) {
            Ok(()) => {}
            Err(ScopeError::Closed { .. }) => return Err(ClientError::Closed),
            Err(ScopeError::Conflict { .. }) => {
                return Err(ClientError::AlreadyLinked {
                    address: address.to_string(),
                });
            }
            Err(err @ ScopeError::Duplicate { .. }) => {
                warn!("{}", err);
                return Err(ClientError::AlreadyLinked {
                    address: address.to_string(),
                });
            }
        }
        debug!("{} opened to {}", downlink.key(), downlink.address());
        Ok(LinkHandle::new(downlink))
    }

    /// Starts closing a link. Closing a link that is already closing or
    /// closed is a no-op, and returns false.
    pub fn close_link(&self, handle: &LinkHandle) -> bool {
        handle.downlink().close(Instant::now())
    }

    // Incoming

    /// Decodes & dispatches one payload received from the host
    pub fn receive(&self, payload: &[u8]) -> Result<(), ClientError> {
        let envelope = self.codec.decode(payload).map_err(|err| {
            warn!("dropping payload from {}: {}", self.host_uri, err);
            err
        })?;
        self.receive_envelope(envelope);
        Ok(())
    }

    /// Receives every payload waiting on `receiver`. Returns how many were
    /// received; payloads that fail to decode are skipped.
    pub fn receive_packets(&self, receiver: &mut dyn PacketReceiver) -> usize {
        let mut count = 0;
        loop {
            match receiver.receive() {
                Ok(Some(payload)) => {
                    count += 1;
                    let _ = self.receive(payload);
                }
                Ok(None) => return count,
                Err(err) => {
                    warn!("transport from {} closed: {}", self.host_uri, err);
                    return count;
                }
            }
        }
    }

    /// Dispatches one envelope received from the host
    pub fn receive_envelope(&self, envelope: Envelope) {
        let now = Instant::now();
        match envelope.tag() {
            EnvelopeTag::Authed => debug!("authenticated with {}", self.host_uri),
            EnvelopeTag::Deauthed => {
                match envelope.body().reason_str() {
                    Some(reason) => warn!("deauthenticated by {}: {}", self.host_uri, reason),
                    None => debug!("deauthenticated by {}", self.host_uri),
                }
                self.identity.store(Arc::new(Identity::Anonymous));
            }
            EnvelopeTag::Auth | EnvelopeTag::Deauth => {
                warn!("discarding `{}` from {}", envelope.tag(), self.host_uri)
            }
            _ => match self.find_downlink(envelope.node_uri(), envelope.lane_uri()) {
                Some(downlink) => downlink.on_envelope(&envelope, now),
                None => debug!(
                    "no link to {}#{}, discarding `{}`",
                    envelope.node_uri(),
                    envelope.lane_uri(),
                    envelope.tag()
                ),
            },
        }
    }

    // Outgoing

    /// Takes every envelope waiting to be sent to the host
    pub fn take_outgoing(&self) -> Vec<Envelope> {
        self.outbox.take_outgoing()
    }

    pub fn pending(&self) -> usize {
        self.outbox.pending()
    }

    /// Encodes & sends every envelope waiting for the host. Returns how
    /// many were sent.
    pub fn send_packets(&self, sender: &dyn PacketSender) -> Result<usize, ClientError> {
        let outgoing = self.take_outgoing();
        for envelope in &outgoing {
            sender.send(&self.codec.encode(envelope))?;
        }
        Ok(outgoing.len())
    }

    /// Queues an arbitrary push toward the host
    pub fn push(&self, request: PushRequest) {
        self.outbox.push_down(request);
    }

    // Maintenance

    /// Must be called regularly, fails links whose handshake is overdue
    pub fn update(&self, now: Instant) {
        for downlink in self.downlinks.snapshot().iter() {
            downlink.poll_timeout(now);
        }
    }

    /// The connection to the host was lost: every link closes at once with
    /// a synthetic `unlinked`, and whatever was waiting to be sent is
    /// discarded
    pub fn disconnect(&self) {
        let downlinks = self.downlinks.snapshot();
        for downlink in downlinks.iter() {
            downlink.disconnect();
        }
        let discarded = self.outbox.take_outgoing().len();
        self.identity.store(Arc::new(Identity::Anonymous));
        info!(
            "disconnected from {}: {} links closed, {} envelopes discarded",
            self.host_uri,
            downlinks.len(),
            discarded
        );
    }

    /// Force-closes every link; the client cannot be used afterwards
    pub fn close(&self) -> usize {
        let closed = self.downlinks.close();
        self.outbox.close();
        closed
    }

    /// Presents `identity` to the host if it is not the current one
    fn present(&self, identity: &Identity, prio: f32) {
        if **self.identity.load() == *identity {
            return;
        }
        self.identity.store(Arc::new(identity.clone()));
        let envelope = match identity {
            Identity::Anonymous => Envelope::deauth(Body::Absent),
            Identity::Authenticated(_) => Envelope::auth(identity.auth_body()),
        };
        // same priority as the link it precedes, so it is sent first
        let (request, _receipt) =
            PushRequest::new(Uri::empty(), self.host_uri.clone(), envelope, prio, None);
        self.outbox.push_down(request);
    }

    fn find_downlink(&self, node_uri: &Uri, lane_uri: &Uri) -> Option<Arc<Downlink>> {
        self.downlinks
            .find(|downlink| !downlink.is_closed() && downlink.is_addressed_to(node_uri, lane_uri))
    }
}
