use thiserror::Error;

use weft_shared::{transport::SendError, ConfigError, DecodeError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("Client is closed")]
    Closed,

    #[error("A link to {address} is already open")]
    AlreadyLinked { address: String },

    #[error("Client is connected to {expected}, not {host}")]
    UnknownHost { host: String, expected: String },

    #[error("Failed to decode envelope: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid client configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Send(#[from] SendError),
}
