//! # Envelopes
//!
//! Every message exchanged over a link, or between hosts, is an [`Envelope`].
//! Envelopes are immutable values: the `with_*` methods return a modified
//! copy of the same variant and leave the original untouched.
//!
//! The tag of an envelope determines which fields it carries:
//!
//! | tags | fields |
//! |------|--------|
//! | `event`, `command`, `synced`, `unlink`, `unlinked` | node, lane, body |
//! | `link`, `sync`, `linked` | node, lane, prio, rate, body |
//! | `auth`, `authed`, `deauth`, `deauthed` | body |

mod error;
mod tag;
mod wire;

pub use error::DecodeError;
pub use tag::EnvelopeTag;

use crate::{uri::EMPTY_URI, Body, Uri};

/// Fields of the lane-addressed variants
#[derive(Clone, Debug, PartialEq)]
pub struct LaneEnvelope {
    pub node_uri: Uri,
    pub lane_uri: Uri,
    pub body: Body,
}

/// Fields of the link-lifecycle variants, which also carry delivery hints
#[derive(Clone, Debug, PartialEq)]
pub struct LinkEnvelope {
    pub node_uri: Uri,
    pub lane_uri: Uri,
    prio: f32,
    rate: f32,
    pub body: Body,
}

impl LinkEnvelope {
    pub fn new(node_uri: Uri, lane_uri: Uri, prio: f32, rate: f32, body: Body) -> Self {
        Self {
            node_uri,
            lane_uri,
            prio: finite_or_zero(prio),
            rate: finite_or_zero(rate),
            body,
        }
    }

    pub fn prio(&self) -> f32 {
        self.prio
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }
}

/// Fields of the host-addressed variants
#[derive(Clone, Debug, PartialEq)]
pub struct HostEnvelope {
    pub body: Body,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    Event(LaneEnvelope),
    Command(LaneEnvelope),
    Link(LinkEnvelope),
    Linked(LinkEnvelope),
    Sync(LinkEnvelope),
    Synced(LaneEnvelope),
    Unlink(LaneEnvelope),
    Unlinked(LaneEnvelope),
    Auth(HostEnvelope),
    Authed(HostEnvelope),
    Deauth(HostEnvelope),
    Deauthed(HostEnvelope),
}

// Constructors

impl Envelope {
    pub fn event<N: Into<Uri>, L: Into<Uri>>(node_uri: N, lane_uri: L, body: Body) -> Self {
        Envelope::Event(lane(node_uri, lane_uri, body))
    }

    pub fn command<N: Into<Uri>, L: Into<Uri>>(node_uri: N, lane_uri: L, body: Body) -> Self {
        Envelope::Command(lane(node_uri, lane_uri, body))
    }

    pub fn link<N: Into<Uri>, L: Into<Uri>>(
        node_uri: N,
        lane_uri: L,
        prio: f32,
        rate: f32,
        body: Body,
    ) -> Self {
        Envelope::Link(LinkEnvelope::new(node_uri.into(), lane_uri.into(), prio, rate, body))
    }

    pub fn linked<N: Into<Uri>, L: Into<Uri>>(
        node_uri: N,
        lane_uri: L,
        prio: f32,
        rate: f32,
        body: Body,
    ) -> Self {
        Envelope::Linked(LinkEnvelope::new(node_uri.into(), lane_uri.into(), prio, rate, body))
    }

    pub fn sync<N: Into<Uri>, L: Into<Uri>>(
        node_uri: N,
        lane_uri: L,
        prio: f32,
        rate: f32,
        body: Body,
    ) -> Self {
        Envelope::Sync(LinkEnvelope::new(node_uri.into(), lane_uri.into(), prio, rate, body))
    }

    pub fn synced<N: Into<Uri>, L: Into<Uri>>(node_uri: N, lane_uri: L, body: Body) -> Self {
        Envelope::Synced(lane(node_uri, lane_uri, body))
    }

    pub fn unlink<N: Into<Uri>, L: Into<Uri>>(node_uri: N, lane_uri: L, body: Body) -> Self {
        Envelope::Unlink(lane(node_uri, lane_uri, body))
    }

    pub fn unlinked<N: Into<Uri>, L: Into<Uri>>(node_uri: N, lane_uri: L, body: Body) -> Self {
        Envelope::Unlinked(lane(node_uri, lane_uri, body))
    }

    pub fn auth(body: Body) -> Self {
        Envelope::Auth(HostEnvelope { body })
    }

    pub fn authed(body: Body) -> Self {
        Envelope::Authed(HostEnvelope { body })
    }

    pub fn deauth(body: Body) -> Self {
        Envelope::Deauth(HostEnvelope { body })
    }

    pub fn deauthed(body: Body) -> Self {
        Envelope::Deauthed(HostEnvelope { body })
    }

    /// Builds the envelope identified by `tag` from its parts. Fields the tag
    /// does not carry are dropped.
    pub fn from_parts(
        tag: EnvelopeTag,
        node_uri: Uri,
        lane_uri: Uri,
        prio: f32,
        rate: f32,
        body: Body,
    ) -> Self {
        match tag {
            EnvelopeTag::Event => Envelope::Event(LaneEnvelope { node_uri, lane_uri, body }),
            EnvelopeTag::Command => Envelope::Command(LaneEnvelope { node_uri, lane_uri, body }),
            EnvelopeTag::Link => Envelope::Link(LinkEnvelope::new(node_uri, lane_uri, prio, rate, body)),
            EnvelopeTag::Linked => Envelope::Linked(LinkEnvelope::new(node_uri, lane_uri, prio, rate, body)),
            EnvelopeTag::Sync => Envelope::Sync(LinkEnvelope::new(node_uri, lane_uri, prio, rate, body)),
            EnvelopeTag::Synced => Envelope::Synced(LaneEnvelope { node_uri, lane_uri, body }),
            EnvelopeTag::Unlink => Envelope::Unlink(LaneEnvelope { node_uri, lane_uri, body }),
            EnvelopeTag::Unlinked => Envelope::Unlinked(LaneEnvelope { node_uri, lane_uri, body }),
            EnvelopeTag::Auth => Envelope::Auth(HostEnvelope { body }),
            EnvelopeTag::Authed => Envelope::Authed(HostEnvelope { body }),
            EnvelopeTag::Deauth => Envelope::Deauth(HostEnvelope { body }),
            EnvelopeTag::Deauthed => Envelope::Deauthed(HostEnvelope { body }),
        }
    }
}

// Accessors

impl Envelope {
    /// The protocol verb of this envelope
    pub fn tag(&self) -> EnvelopeTag {
        match self {
            Envelope::Event(_) => EnvelopeTag::Event,
            Envelope::Command(_) => EnvelopeTag::Command,
            Envelope::Link(_) => EnvelopeTag::Link,
            Envelope::Linked(_) => EnvelopeTag::Linked,
            Envelope::Sync(_) => EnvelopeTag::Sync,
            Envelope::Synced(_) => EnvelopeTag::Synced,
            Envelope::Unlink(_) => EnvelopeTag::Unlink,
            Envelope::Unlinked(_) => EnvelopeTag::Unlinked,
            Envelope::Auth(_) => EnvelopeTag::Auth,
            Envelope::Authed(_) => EnvelopeTag::Authed,
            Envelope::Deauth(_) => EnvelopeTag::Deauth,
            Envelope::Deauthed(_) => EnvelopeTag::Deauthed,
        }
    }

    /// The node this envelope is addressed to; empty for host-addressed envelopes
    pub fn node_uri(&self) -> &Uri {
        match self {
            Envelope::Event(e) | Envelope::Command(e) | Envelope::Synced(e)
            | Envelope::Unlink(e) | Envelope::Unlinked(e) => &e.node_uri,
            Envelope::Link(e) | Envelope::Linked(e) | Envelope::Sync(e) => &e.node_uri,
            Envelope::Auth(_) | Envelope::Authed(_) | Envelope::Deauth(_)
            | Envelope::Deauthed(_) => &EMPTY_URI,
        }
    }

    /// The lane this envelope is addressed to; empty for host-addressed envelopes
    pub fn lane_uri(&self) -> &Uri {
        match self {
            Envelope::Event(e) | Envelope::Command(e) | Envelope::Synced(e)
            | Envelope::Unlink(e) | Envelope::Unlinked(e) => &e.lane_uri,
            Envelope::Link(e) | Envelope::Linked(e) | Envelope::Sync(e) => &e.lane_uri,
            Envelope::Auth(_) | Envelope::Authed(_) | Envelope::Deauth(_)
            | Envelope::Deauthed(_) => &EMPTY_URI,
        }
    }

    pub fn body(&self) -> &Body {
        match self {
            Envelope::Event(e) | Envelope::Command(e) | Envelope::Synced(e)
            | Envelope::Unlink(e) | Envelope::Unlinked(e) => &e.body,
            Envelope::Link(e) | Envelope::Linked(e) | Envelope::Sync(e) => &e.body,
            Envelope::Auth(e) | Envelope::Authed(e) | Envelope::Deauth(e)
            | Envelope::Deauthed(e) => &e.body,
        }
    }

    /// Delivery priority hint; `0.0` for variants that carry none
    pub fn prio(&self) -> f32 {
        match self {
            Envelope::Link(e) | Envelope::Linked(e) | Envelope::Sync(e) => e.prio(),
            _ => 0.0,
        }
    }

    /// Throttle hint; `0.0` for variants that carry none
    pub fn rate(&self) -> f32 {
        match self {
            Envelope::Link(e) | Envelope::Linked(e) | Envelope::Sync(e) => e.rate(),
            _ => 0.0,
        }
    }

    pub fn is_host_addressed(&self) -> bool {
        self.tag().is_host_addressed()
    }

    pub fn with_node_uri<U: Into<Uri>>(&self, node_uri: U) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            Envelope::Event(e) | Envelope::Command(e) | Envelope::Synced(e)
            | Envelope::Unlink(e) | Envelope::Unlinked(e) => e.node_uri = node_uri.into(),
            Envelope::Link(e) | Envelope::Linked(e) | Envelope::Sync(e) => e.node_uri = node_uri.into(),
            Envelope::Auth(_) | Envelope::Authed(_) | Envelope::Deauth(_)
            | Envelope::Deauthed(_) => {}
        }
        copy
    }

    pub fn with_lane_uri<U: Into<Uri>>(&self, lane_uri: U) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            Envelope::Event(e) | Envelope::Command(e) | Envelope::Synced(e)
            | Envelope::Unlink(e) | Envelope::Unlinked(e) => e.lane_uri = lane_uri.into(),
            Envelope::Link(e) | Envelope::Linked(e) | Envelope::Sync(e) => e.lane_uri = lane_uri.into(),
            Envelope::Auth(_) | Envelope::Authed(_) | Envelope::Deauth(_)
            | Envelope::Deauthed(_) => {}
        }
        copy
    }

    pub fn with_body(&self, body: Body) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            Envelope::Event(e) | Envelope::Command(e) | Envelope::Synced(e)
            | Envelope::Unlink(e) | Envelope::Unlinked(e) => e.body = body,
            Envelope::Link(e) | Envelope::Linked(e) | Envelope::Sync(e) => e.body = body,
            Envelope::Auth(e) | Envelope::Authed(e) | Envelope::Deauth(e)
            | Envelope::Deauthed(e) => e.body = body,
        }
        copy
    }
}

fn lane<N: Into<Uri>, L: Into<Uri>>(node_uri: N, lane_uri: L, body: Body) -> LaneEnvelope {
    LaneEnvelope {
        node_uri: node_uri.into(),
        lane_uri: lane_uri.into(),
        body,
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
