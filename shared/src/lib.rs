//! # Weft Shared
//! Common functionality shared between weft-server & weft-client crates:
//! envelopes and their codec, the per-link state machine, prioritized push
//! delivery, and the scope registry that tracks the links of a cell.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod body;
mod cell;
mod codec;
mod config;
mod envelope;
mod identity;
mod link;
mod push;
mod scope;
mod uri;

pub mod transport;

pub use body::{Body, Value};
pub use cell::{CellAddress, CellContext, LinkReport};
pub use codec::{EnvelopeCodec, JsonCodec};
pub use config::{ConfigError, LinkConfig, PushConfig};
pub use envelope::{DecodeError, Envelope, EnvelopeTag, HostEnvelope, LaneEnvelope, LinkEnvelope};
pub use identity::{Credentials, Identity};
pub use link::{
    CloseCause, Direction, LinkBinding, LinkDeclined, LinkError, LinkKey, LinkKeyGenerator,
    LinkMachine, LinkRole, LinkState, LinkTransition, ProtocolViolation,
};
pub use push::{
    DeclineReason, DeliveryDeclined, DeliveryOutcome, PushQueue, PushReceipt, PushRequest,
};
pub use scope::{Link, LinkSet, Scope, ScopeError};
pub use uri::{LinkAddress, Uri};
