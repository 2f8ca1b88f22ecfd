use thiserror::Error;

use weft_shared::{transport::SendError, ConfigError, DecodeError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("Host {host} is closed")]
    Closed { host: String },

    #[error("{remote} is already connected")]
    AlreadyConnected { remote: String },

    #[error("{remote} is not connected")]
    UnknownConnection { remote: String },

    #[error("Node {node} is mounted twice")]
    DuplicateNode { node: String },

    #[error("No lane {lane} on node {node}")]
    UnknownLane { node: String, lane: String },

    #[error("Failed to decode envelope: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid host configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Send(#[from] SendError),
}
