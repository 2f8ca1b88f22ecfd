use thiserror::Error;

use crate::{
    link::state::{Direction, LinkRole, LinkState},
    DeliveryDeclined, EnvelopeTag,
};

/// An envelope that is not legal in the current link state.
/// Violations are discarded & counted, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{direction:?} `{tag}` is not allowed on a {role:?} in state {state}")]
pub struct ProtocolViolation {
    pub role: LinkRole,
    pub state: LinkState,
    pub direction: Direction,
    pub tag: EnvelopeTag,
}

/// A `link` or `sync` request refused by the lane
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Link to {address} declined: {reason}")]
pub struct LinkDeclined {
    pub address: String,
    pub reason: String,
}

/// Errors that can occur while driving a link
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    /// Envelope not allowed in the current state
    #[error("Protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolViolation),

    /// The lane refused to link
    #[error("{0}")]
    Declined(#[from] LinkDeclined),

    /// An acknowledgement did not arrive in time; the link was forced closed
    #[error("Link timed out while {state}")]
    Timeout { state: LinkState },

    /// An envelope could not be pushed toward the peer
    #[error("{0}")]
    Delivery(#[from] DeliveryDeclined),
}
