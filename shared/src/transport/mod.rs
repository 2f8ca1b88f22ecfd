mod local;

pub use local::{LocalPacketReceiver, LocalPacketSender, LocalTransport};

use thiserror::Error;

/// Error returned when a payload could not be handed to the transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transport closed, payload could not be sent")]
pub struct SendError;

/// Error returned when the transport can no longer produce payloads
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transport closed, no further payloads can be received")]
pub struct RecvError;

/// Used to send payloads over one connection
pub trait PacketSender: Send + Sync {
    fn send(&self, payload: &[u8]) -> Result<(), SendError>;
}

/// Used to receive payloads from one connection
pub trait PacketReceiver: Send {
    /// Returns the next payload, or `None` if none is waiting
    fn receive(&mut self) -> Result<Option<&[u8]>, RecvError>;
}
