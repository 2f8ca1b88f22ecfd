//! # Weft Client
//! The subscriber side of a weft mesh. A [`Client`] opens links to the
//! lanes of one host, tracks every link through its lifecycle, and queues
//! the lane events each link observes.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use weft_shared::{
        transport, Body, CloseCause, Credentials, DeclineReason, DeliveryOutcome, Envelope,
        EnvelopeTag, Identity, LinkAddress, LinkConfig, LinkDeclined, LinkError, LinkState,
        PushConfig, PushReceipt, PushRequest, Uri, Value,
    };
}

mod client;
mod client_config;
mod downlink;
mod error;
mod outbox;

pub use client::Client;
pub use client_config::{ClientConfig, LinkOptions};
pub use downlink::{Downlink, DownlinkEvent, LinkHandle};
pub use error::ClientError;
