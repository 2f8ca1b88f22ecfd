use thiserror::Error;

/// Why a push was not accepted by its destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclineReason {
    /// The destination cell, connection or outbox is closed
    Closed,
    /// No connection, node or lane matches the request's address
    UnknownDestination,
    /// The destination queue is full
    Backpressure { capacity: usize },
    /// The link the envelope belongs to is not linked
    Unlinked,
    /// A policy refused the envelope
    Policy(String),
    /// The request was dropped before anyone resolved it
    Dropped,
}

/// A push that was declined; retrying is up to the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Push declined: {reason:?}")]
pub struct DeliveryDeclined {
    pub reason: DeclineReason,
}
