//! # Weft Server
//! The lane side of a weft mesh. A [`Host`] mounts nodes and their lanes,
//! accepts links to them from connected peers, replays lane state to
//! syncing links and fans every change out to the linked subscribers.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use weft_shared::{
        transport, Body, Credentials, DeclineReason, DeliveryOutcome, Envelope, EnvelopeTag,
        Identity, LinkAddress, LinkConfig, LinkState, PushConfig, PushReceipt, PushRequest, Uri,
        Value,
    };
}

mod connection;
mod error;
mod host;
mod lane;
mod node;
mod policy;
mod router;
mod stats;
mod uplink;

pub use error::HostError;
pub use host::{Host, HostConfig};
pub use lane::{LaneCell, LaneEntry, LaneError, LaneModel, MapLane, ValueLane};
pub use node::NodeCell;
pub use policy::{LinkPolicy, OpenPolicy};
pub use stats::HostStats;
pub use uplink::Uplink;
